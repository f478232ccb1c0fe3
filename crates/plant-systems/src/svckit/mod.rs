//! Service Kit - Plant System Tools
//!
//! Tools that implement `ops_core::Tool` over the shared [`PlantDataset`],
//! grouped by the system that owns them.
//!
//! [`PlantDataset`]: crate::dataset::PlantDataset

mod cmms;
mod erp;
mod mes;
mod wpms;

pub use cmms::{EquipmentStatusTool, WorkOrdersTool};
pub use erp::{CustomerOrdersTool, InventoryTool, ProductionOrdersTool};
pub use mes::{LineOrdersTool, LineStatusTool, ProductionLinesTool};
pub use wpms::{EmployeesTool, ShiftAssignmentsTool};

use ops_core::{ToolCall, ToolResult};
use serde::Serialize;
use std::str::FromStr;

use crate::error::PlantError;

/// Parse an optional enum-like argument
fn parse_arg<T>(call: &ToolCall, key: &str) -> Result<Option<T>, PlantError>
where
    T: FromStr<Err = PlantError>,
{
    call.str_arg(key).map(str::parse).transpose()
}

/// Successful result carrying both the rendered text and the records
fn respond<T: Serialize + ?Sized>(tool: &str, output: String, records: &T) -> ToolResult {
    match serde_json::to_value(records) {
        Ok(data) => ToolResult::success(tool, output).with_data(data),
        Err(e) => ToolResult::failure(tool, PlantError::from(e).to_string()),
    }
}

fn rejected(tool: &str, err: &PlantError) -> ToolResult {
    ToolResult::failure(tool, err.to_string())
}
