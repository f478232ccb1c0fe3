//! Domain Models
//!
//! Records held by the four plant systems. Monetary values use
//! `rust_decimal`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PlantError;

/// Implements `FromStr` (case-insensitive, `-` and `_` interchangeable)
/// and `Display` for a unit-only status enum.
macro_rules! status_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = PlantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_uppercase().replace('-', "_");
                match normalized.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(PlantError::InvalidArgument {
                        field: $field,
                        value: s.to_string(),
                        expected: concat!($($text, " "),+),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ============================================================================
// CMMS - maintenance
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentStatus {
    Operational,
    Degraded,
    Down,
    Maintenance,
}

status_enum!(EquipmentStatus, "equipment status", {
    Operational => "OPERATIONAL",
    Degraded => "DEGRADED",
    Down => "DOWN",
    Maintenance => "MAINTENANCE",
});

/// A maintained asset on the shop floor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub line_id: String,
    pub status: EquipmentStatus,
    pub last_maintenance: NaiveDate,
    pub next_maintenance: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Open,
    InProgress,
    OnHold,
    Closed,
}

status_enum!(WorkOrderStatus, "work order status", {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    OnHold => "ON_HOLD",
    Closed => "CLOSED",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

/// Maintenance work order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: String,
    pub equipment_id: String,
    pub title: String,
    pub priority: Priority,
    pub status: WorkOrderStatus,
    pub assigned_to: Option<String>,
    pub due: NaiveDate,
}

// ============================================================================
// ERP - inventory, production and customer orders
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryItem {
    pub part_number: String,
    pub description: String,
    pub on_hand: u32,
    pub reorder_point: u32,
    pub unit_cost: Decimal,
    pub location: String,
}

impl InventoryItem {
    pub const fn below_reorder_point(&self) -> bool {
        self.on_hand <= self.reorder_point
    }

    pub fn stock_value(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.on_hand)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Planned,
    Released,
    InProgress,
    Completed,
    Shipped,
}

status_enum!(OrderStatus, "order status", {
    Planned => "PLANNED",
    Released => "RELEASED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Shipped => "SHIPPED",
});

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: String,
    pub product: String,
    pub quantity: u32,
    pub completed: u32,
    pub status: OrderStatus,
    pub line_id: String,
    pub due: NaiveDate,
    pub customer_order: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerOrder {
    pub id: String,
    pub customer: String,
    pub product: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub status: OrderStatus,
    pub ship_date: NaiveDate,
}

impl CustomerOrder {
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

// ============================================================================
// MES - production lines
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Running,
    Idle,
    Changeover,
    Stopped,
}

status_enum!(LineStatus, "line status", {
    Running => "RUNNING",
    Idle => "IDLE",
    Changeover => "CHANGEOVER",
    Stopped => "STOPPED",
});

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionLine {
    pub id: String,
    pub name: String,
    pub status: LineStatus,
    pub current_order: Option<String>,
    pub units_today: u32,
    pub target_today: u32,
    /// Overall equipment effectiveness, percent
    pub oee: Decimal,
}

// ============================================================================
// WPMS - workforce
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    Day,
    Swing,
    Night,
}

status_enum!(Shift, "shift", {
    Day => "DAY",
    Swing => "SWING",
    Night => "NIGHT",
});

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub role: String,
    pub skills: Vec<String>,
    pub shift: Shift,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub employee_id: String,
    pub shift: Shift,
    pub date: NaiveDate,
    pub line_id: String,
    pub task: String,
}
