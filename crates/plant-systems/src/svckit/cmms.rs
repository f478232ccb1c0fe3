//! CMMS Tools
//!
//! Maintenance work orders and equipment health.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use ops_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

use super::{parse_arg, rejected, respond};
use crate::dataset::PlantDataset;
use crate::model::WorkOrderStatus;

/// Lists maintenance work orders, most urgent first
pub struct WorkOrdersTool {
    plant: Arc<PlantDataset>,
}

impl WorkOrdersTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for WorkOrdersTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_work_orders".into(),
            description: "List maintenance work orders from the CMMS, ordered by priority then due date.".into(),
            parameters: vec![
                ParameterSchema::string("status", "Filter by work order status")
                    .one_of(&["OPEN", "IN_PROGRESS", "ON_HOLD", "CLOSED"]),
            ],
            category: Some("maintenance".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_work_orders";

        let status: Option<WorkOrderStatus> = match parse_arg(call, "status") {
            Ok(status) => status,
            Err(e) => return Ok(rejected(NAME, &e)),
        };

        let orders = self.plant.work_orders(status);
        if orders.is_empty() {
            return Ok(respond(NAME, "No matching work orders.".into(), &orders));
        }

        let mut output = format!("{} work order(s):\n", orders.len());
        for wo in &orders {
            let assignee = wo
                .assigned_to
                .as_deref()
                .and_then(|id| self.plant.employee_name(id))
                .unwrap_or("unassigned");
            let _ = writeln!(
                output,
                "- {} [{:?}/{}] {} on {} (due {}, {})",
                wo.id, wo.priority, wo.status, wo.title, wo.equipment_id, wo.due, assignee
            );
        }

        Ok(respond(NAME, output, &orders))
    }
}

/// Current state of one piece of equipment plus its open work
pub struct EquipmentStatusTool {
    plant: Arc<PlantDataset>,
}

impl EquipmentStatusTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for EquipmentStatusTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_equipment_status".into(),
            description: "Get the operating status and maintenance schedule of a piece of equipment.".into(),
            parameters: vec![
                ParameterSchema::string("equipment_id", "Equipment identifier, e.g. EQ-101").required(),
            ],
            category: Some("maintenance".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_equipment_status";

        let Some(id) = call.str_arg("equipment_id") else {
            return Ok(ToolResult::failure(NAME, "equipment_id must not be empty"));
        };

        let equipment = match self.plant.equipment(id) {
            Ok(equipment) => equipment,
            Err(e) => return Ok(rejected(NAME, &e)),
        };
        let open = self.plant.open_work_orders_for(&equipment.id);

        let mut output = format!(
            "{} ({}) on {} is {}. Last maintained {}, next due {}.",
            equipment.name,
            equipment.id,
            equipment.line_id,
            equipment.status,
            equipment.last_maintenance,
            equipment.next_maintenance
        );
        if !open.is_empty() {
            let ids: Vec<&str> = open.iter().map(|wo| wo.id.as_str()).collect();
            let _ = write!(output, " Open work orders: {}.", ids.join(", "));
        }

        Ok(respond(
            NAME,
            output,
            &serde_json::json!({ "equipment": equipment, "open_work_orders": open }),
        ))
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
    async fn test_work_orders_filter() {
        let tool = WorkOrdersTool::new(plant());
        let call = ToolCall::new("get_work_orders").with_argument("status", json!("open"));
        let result = tool.execute(&call).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("WO-1001"));
        assert!(result.output.contains("Marco Reyes"));
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_work_orders_bad_status() {
        let tool = WorkOrdersTool::new(plant());
        let call = ToolCall::new("get_work_orders").with_argument("status", json!("lost"));
        let result = tool.execute(&call).await.unwrap();

        assert!(!result.success);
        assert!(result.output.contains("OPEN"));
    }

    #[tokio::test]
    async fn test_equipment_status() {
        let tool = EquipmentStatusTool::new(plant());
        let call =
            ToolCall::new("get_equipment_status").with_argument("equipment_id", json!("EQ-301"));
        let result = tool.execute(&call).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("DOWN"));
        assert!(result.output.contains("WO-1002"));

        let missing = ToolCall::new("get_equipment_status").with_argument("equipment_id", json!("EQ-999"));
        let result = tool.execute(&missing).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("not found"));
    }
}
