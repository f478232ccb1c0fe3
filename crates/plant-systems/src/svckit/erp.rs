//! ERP Tools
//!
//! Inventory, production orders and customer orders.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use ops_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

use super::{parse_arg, rejected, respond};
use crate::dataset::PlantDataset;
use crate::model::OrderStatus;

const ORDER_STATUSES: &[&str] = &["PLANNED", "RELEASED", "IN_PROGRESS", "COMPLETED", "SHIPPED"];

/// Stock levels, flagging parts at or below their reorder point
pub struct InventoryTool {
    plant: Arc<PlantDataset>,
}

impl InventoryTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for InventoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_inventory".into(),
            description: "Look up inventory levels. Matches a part number exactly or a description by substring.".into(),
            parameters: vec![ParameterSchema::string(
                "part_number",
                "Part number or description fragment; omit for all stock",
            )],
            category: Some("inventory".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_inventory";

        let items = self.plant.inventory(call.str_arg("part_number"));
        if items.is_empty() {
            return Ok(respond(NAME, "No matching inventory.".into(), &items));
        }

        let mut output = String::new();
        for item in &items {
            let flag = if item.below_reorder_point() { " REORDER" } else { "" };
            let _ = writeln!(
                output,
                "- {} {}: {} on hand (reorder at {}) in {}, value ${}{}",
                item.part_number,
                item.description,
                item.on_hand,
                item.reorder_point,
                item.location,
                item.stock_value().round_dp(2),
                flag
            );
        }

        Ok(respond(NAME, output, &items))
    }
}

/// Production orders as planned in the ERP
pub struct ProductionOrdersTool {
    plant: Arc<PlantDataset>,
}

impl ProductionOrdersTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for ProductionOrdersTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_production_orders".into(),
            description: "List production orders from the ERP with quantities and due dates.".into(),
            parameters: vec![
                ParameterSchema::string("status", "Filter by order status").one_of(ORDER_STATUSES),
            ],
            category: Some("planning".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_production_orders";

        let status: Option<OrderStatus> = match parse_arg(call, "status") {
            Ok(status) => status,
            Err(e) => return Ok(rejected(NAME, &e)),
        };

        let orders = self.plant.production_orders(status, None);
        let mut output = format!("{} production order(s):\n", orders.len());
        for po in &orders {
            let _ = writeln!(
                output,
                "- {} {} x{} ({} done) {} on {}, due {}{}",
                po.id,
                po.product,
                po.quantity,
                po.completed,
                po.status,
                po.line_id,
                po.due,
                po.customer_order
                    .as_deref()
                    .map(|co| format!(" for {co}"))
                    .unwrap_or_default()
            );
        }

        Ok(respond(NAME, output, &orders))
    }
}

/// Customer orders with totals and ship dates
pub struct CustomerOrdersTool {
    plant: Arc<PlantDataset>,
}

impl CustomerOrdersTool {
    pub const fn new(plant: Arc<PlantDataset>) -> Self {
        Self { plant }
    }
}

#[async_trait]
impl Tool for CustomerOrdersTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_customer_orders".into(),
            description: "List customer orders, optionally for one customer.".into(),
            parameters: vec![ParameterSchema::string(
                "customer",
                "Customer name or fragment",
            )],
            category: Some("sales".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        const NAME: &str = "get_customer_orders";

        let orders = self.plant.customer_orders(call.str_arg("customer"));
        if orders.is_empty() {
            return Ok(respond(NAME, "No matching customer orders.".into(), &orders));
        }

        let mut output = String::new();
        for co in &orders {
            let _ = writeln!(
                output,
                "- {} {}: {} x{} = ${} ({}, ships {})",
                co.id,
                co.customer,
                co.product,
                co.quantity,
                co.total(),
                co.status,
                co.ship_date
            );
        }

        Ok(respond(NAME, output, &orders))
    }
}
