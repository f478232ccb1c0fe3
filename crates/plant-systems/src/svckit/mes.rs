//! MES Tools
//!
//! Live production line state. `get_production_orders` here reports what
//! the lines are executing and shares its name with the ERP tool.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use ops_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use super::{rejected, respond};
use crate::dataset::PlantDataset;
use crate::model::ProductionLine;

fn describe_line(line: &ProductionLine) -> String {
    format!(
        "{} {} is {}: {}/{} units today, OEE {}%{}",
        line.id,
        line.name,
        line.status,
        line.units_today,
        line.target_today,
        line.oee,
        line.current_order
            .as_deref()
            .map(|po| format!(", running {po}"))
            .unwrap_or_default()
    )
}

pub struct ProductionLinesTool {
    plant: Arc<PlantDataset>,
}

impl ProductionLinesTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for ProductionLinesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_production_lines".into(),
            description: "List every production line with its current status and output.".into(),
            parameters: vec![],
            category: Some("production".into()),
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolResult> {
        let lines = self.plant.lines();
        let mut output = String::new();
        for line in lines {
            let _ = writeln!(output, "- {}", describe_line(line));
        }
        Ok(respond("get_production_lines", output, lines))
    }
}

pub struct LineStatusTool {
    plant: Arc<PlantDataset>,
}

impl LineStatusTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for LineStatusTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_line_status".into(),
            description: "Get the status of one production line, including the equipment on it.".into(),
            parameters: vec![
                ParameterSchema::string("line_id", "Line identifier, e.g. LINE-1").required(),
            ],
            category: Some("production".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_line_status";

        let Some(id) = call.str_arg("line_id") else {
            return Ok(ToolResult::failure(NAME, "line_id must not be empty"));
        };
        let line = match self.plant.line(id) {
            Ok(line) => line,
            Err(e) => return Ok(rejected(NAME, &e)),
        };

        let equipment: Vec<_> = self
            .plant
            .equipment
            .iter()
            .filter(|e| e.line_id == line.id)
            .collect();

        let mut output = describe_line(line);
        for eq in &equipment {
            let _ = write!(output, "\n- {} {}: {}", eq.id, eq.name, eq.status);
        }

        Ok(respond(
            NAME,
            output,
            &serde_json::json!({ "line": line, "equipment": equipment }),
        ))
    }
}

/// Orders as executed on the shop floor
pub struct LineOrdersTool {
    plant: Arc<PlantDataset>,
}

impl LineOrdersTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for LineOrdersTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_production_orders".into(),
            description: "Shop-floor progress of production orders, optionally for one line.".into(),
            parameters: vec![ParameterSchema::string("line_id", "Line identifier")],
            category: Some("production".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_production_orders";

        let orders = self.plant.production_orders(None, call.str_arg("line_id"));
        let mut output = String::new();
        for po in &orders {
            let pct = if po.quantity == 0 {
                0
            } else {
                po.completed * 100 / po.quantity
            };
            let _ = writeln!(
                output,
                "- {} on {}: {}/{} {} ({pct}% complete)",
                po.id, po.line_id, po.completed, po.quantity, po.product
            );
        }
        if output.is_empty() {
            output.push_str("No production orders on that line.");
        }

        Ok(respond(NAME, output, &orders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plant() -> Arc<PlantDataset> {
        Arc::new(PlantDataset::sample())
    }

    #[tokio::test]
    async fn test_lines_listed() {
        let tool = ProductionLinesTool::new(plant());
        let result = tool.execute(&ToolCall::new("get_production_lines")).await.unwrap();

        assert_eq!(result.output.lines().count(), 3);
        assert!(result.output.contains("CHANGEOVER"));
    }

    #[tokio::test]
    async fn test_line_status_includes_equipment() {
        let tool = LineStatusTool::new(plant());
        let call = ToolCall::new("get_line_status").with_argument("line_id", json!("LINE-1"));
        let result = tool.execute(&call).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("EQ-102"));
    }

    #[tokio::test]
    async fn test_line_orders_progress() {
        let tool = LineOrdersTool::new(plant());
        let call = ToolCall::new("get_production_orders").with_argument("line_id", json!("LINE-2"));
        let result = tool.execute(&call).await.unwrap();

        assert!(result.output.contains("40% complete"));
    }
}
