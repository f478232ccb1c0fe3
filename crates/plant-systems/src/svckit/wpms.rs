//! WPMS Tools
//!
//! Workforce skills and shift planning.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use ops_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

use super::{parse_arg, rejected, respond};
use crate::dataset::PlantDataset;
use crate::model::Shift;

pub struct EmployeesTool {
    plant: Arc<PlantDataset>,
}

impl EmployeesTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for EmployeesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_employees".into(),
            description: "List employees with their roles, skills and regular shift.".into(),
            parameters: vec![ParameterSchema::string(
                "skill",
                "Only employees holding this skill, e.g. welding",
            )],
            category: Some("workforce".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let employees = self.plant.employees(call.str_arg("skill"));

        let mut output = String::new();
        for e in &employees {
            let _ = writeln!(
                output,
                "- {} {} ({}, {} shift): {}",
                e.id,
                e.name,
                e.role,
                e.shift,
                e.skills.join(", ")
            );
        }
        if output.is_empty() {
            output.push_str("No employees with that skill.");
        }

        Ok(respond("get_employees", output, &employees))
    }
}

pub struct ShiftAssignmentsTool {
    plant: Arc<PlantDataset>,
}

impl ShiftAssignmentsTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for ShiftAssignmentsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_shift_assignments".into(),
            description: "Show who is assigned to which line and task, optionally for one shift.".into(),
            parameters: vec![
                ParameterSchema::string("shift", "Shift to show").one_of(&["DAY", "SWING", "NIGHT"]),
            ],
            category: Some("workforce".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_shift_assignments";

        let shift: Option<Shift> = match parse_arg(call, "shift") {
            Ok(shift) => shift,
            Err(e) => return Ok(rejected(NAME, &e)),
        };

        let assignments = self.plant.shift_assignments(shift);
        let mut output = String::new();
        for a in &assignments {
            let who = self.plant.employee_name(&a.employee_id).unwrap_or(&a.employee_id);
            let _ = writeln!(
                output,
                "- {} {} shift {}: {} on {}",
                a.date, a.shift, who, a.task, a.line_id
            );
        }
        if output.is_empty() {
            output.push_str("No assignments for that shift.");
        }

        Ok(respond(NAME, output, &assignments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_employees_by_skill() {
        let tool = EmployeesTool::new(Arc::new(PlantDataset::sample()));
        let call = ToolCall::new("get_employees").with_argument("skill", json!("hydraulics"));
        let result = tool.execute(&call).await.unwrap();

        assert!(result.output.contains("Marco Reyes"));
        assert_eq!(result.output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_shift_assignments() {
        let tool = ShiftAssignmentsTool::new(Arc::new(PlantDataset::sample()));
        let call = ToolCall::new("get_shift_assignments").with_argument("shift", json!("swing"));
        let result = tool.execute(&call).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("Aiko Tanaka"));

        let bad = ToolCall::new("get_shift_assignments").with_argument("shift", json!("weekend"));
        assert!(!tool.execute(&bad).await.unwrap().success);
    }
}
