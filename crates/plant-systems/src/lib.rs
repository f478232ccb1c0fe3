//! # plant-systems
//!
//! Mock back-office systems for the Octanksson Turbines plant, each served
//! as its own MCP tool source.
//!
//! ```text
//! ┌──────────┬──────┬───────────────────────────────────────────────┐
//! │ System   │ Port │ Tools                                         │
//! ├──────────┼──────┼───────────────────────────────────────────────┤
//! │ CMMS     │ 8001 │ get_work_orders, get_equipment_status         │
//! │ ERP      │ 8002 │ get_inventory, get_production_orders,         │
//! │          │      │ get_customer_orders                           │
//! │ MES      │ 8003 │ get_production_lines, get_line_status,        │
//! │          │      │ get_production_orders                         │
//! │ WPMS     │ 8004 │ get_employees, get_shift_assignments          │
//! └──────────┴──────┴───────────────────────────────────────────────┘
//! ```
//!
//! ERP and MES both publish `get_production_orders`; an aggregating client
//! keeps whichever it discovers first.

pub mod dataset;
pub mod error;
pub mod mcp;
pub mod model;
pub mod svckit;

use std::sync::Arc;

use ops_core::ToolSet;

pub use dataset::PlantDataset;
pub use error::{PlantError, Result};
pub use mcp::{McpServer, router};

/// The four plant systems, in port order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum System {
    Cmms,
    Erp,
    Mes,
    Wpms,
}

impl System {
    pub const ALL: [Self; 4] = [Self::Cmms, Self::Erp, Self::Mes, Self::Wpms];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Cmms => "cmms",
            Self::Erp => "erp",
            Self::Mes => "mes",
            Self::Wpms => "wpms",
        }
    }

    /// Offset from the base port
    pub const fn port_offset(self) -> u16 {
        match self {
            Self::Cmms => 0,
            Self::Erp => 1,
            Self::Mes => 2,
            Self::Wpms => 3,
        }
    }

    pub fn tools(self, plant: &Arc<PlantDataset>) -> ToolSet {
        use svckit::{
            CustomerOrdersTool, EmployeesTool, EquipmentStatusTool, InventoryTool,
            LineOrdersTool, LineStatusTool, ProductionLinesTool, ProductionOrdersTool,
            ShiftAssignmentsTool, WorkOrdersTool,
        };

        let mut tools = ToolSet::new();
        match self {
            Self::Cmms => {
                tools.register(WorkOrdersTool::new(plant.clone()));
                tools.register(EquipmentStatusTool::new(plant.clone()));
            }
            Self::Erp => {
                tools.register(InventoryTool::new(plant.clone()));
                tools.register(ProductionOrdersTool::new(plant.clone()));
                tools.register(CustomerOrdersTool::new(plant.clone()));
            }
            Self::Mes => {
                tools.register(ProductionLinesTool::new(plant.clone()));
                tools.register(LineStatusTool::new(plant.clone()));
                tools.register(LineOrdersTool::new(plant.clone()));
            }
            Self::Wpms => {
                tools.register(EmployeesTool::new(plant.clone()));
                tools.register(ShiftAssignmentsTool::new(plant.clone()));
            }
        }
        tools
    }
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// System prompt for the manufacturing operations assistant
pub const MANUFACTURING_AGENT_PROMPT: &str = r"You are a Manufacturing Operations Assistant for Octanksson Turbines, a wind turbine manufacturing facility.

You have access to multiple manufacturing systems:
- CMMS: Maintenance work orders and equipment data
- ERP: Inventory, production orders, and business data
- MES: Production line operations and real-time status
- WPMS: Workforce planning and employee management

Help users with:
- Equipment maintenance status and work orders
- Production line operations and schedules
- Inventory levels and parts availability
- Customer orders and production planning
- Workforce assignments and skills

Provide clear, actionable responses based on the manufacturing data.";
