//! Mock Plant Dataset
//!
//! Static records for a wind turbine plant, shared by the four systems.
//! Good enough for demos and tests; nothing here is persisted.

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use crate::error::{PlantError, Result};
use crate::model::{
    CustomerOrder, Employee, Equipment, EquipmentStatus, InventoryItem, LineStatus, OrderStatus,
    Priority, ProductionLine, ProductionOrder, Shift, ShiftAssignment, WorkOrder, WorkOrderStatus,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Everything the mock systems know about the plant
#[derive(Clone, Debug)]
pub struct PlantDataset {
    pub equipment: Vec<Equipment>,
    pub work_orders: Vec<WorkOrder>,
    pub inventory: Vec<InventoryItem>,
    pub production_orders: Vec<ProductionOrder>,
    pub customer_orders: Vec<CustomerOrder>,
    pub lines: Vec<ProductionLine>,
    pub employees: Vec<Employee>,
    pub assignments: Vec<ShiftAssignment>,
}

impl Default for PlantDataset {
    fn default() -> Self {
        Self::sample()
    }
}

impl PlantDataset {
    /// The Octanksson Turbines demo plant
    #[allow(clippy::too_many_lines)]
    pub fn sample() -> Self {
        let equipment = vec![
            Equipment {
                id: "EQ-101".into(),
                name: "Blade mould press #1".into(),
                line_id: "LINE-1".into(),
                status: EquipmentStatus::Operational,
                last_maintenance: date(2024, 5, 2),
                next_maintenance: date(2024, 8, 2),
            },
            Equipment {
                id: "EQ-102".into(),
                name: "Resin infusion pump".into(),
                line_id: "LINE-1".into(),
                status: EquipmentStatus::Degraded,
                last_maintenance: date(2024, 3, 14),
                next_maintenance: date(2024, 6, 14),
            },
            Equipment {
                id: "EQ-201".into(),
                name: "Nacelle assembly crane".into(),
                line_id: "LINE-2".into(),
                status: EquipmentStatus::Operational,
                last_maintenance: date(2024, 4, 20),
                next_maintenance: date(2024, 10, 20),
            },
            Equipment {
                id: "EQ-301".into(),
                name: "Tower section welder".into(),
                line_id: "LINE-3".into(),
                status: EquipmentStatus::Down,
                last_maintenance: date(2024, 1, 30),
                next_maintenance: date(2024, 4, 30),
            },
        ];

        let work_orders = vec![
            WorkOrder {
                id: "WO-1001".into(),
                equipment_id: "EQ-102".into(),
                title: "Replace worn pump seals".into(),
                priority: Priority::High,
                status: WorkOrderStatus::Open,
                assigned_to: Some("EMP-007".into()),
                due: date(2024, 6, 12),
            },
            WorkOrder {
                id: "WO-1002".into(),
                equipment_id: "EQ-301".into(),
                title: "Welder wire feed failure".into(),
                priority: Priority::Critical,
                status: WorkOrderStatus::InProgress,
                assigned_to: Some("EMP-011".into()),
                due: date(2024, 6, 10),
            },
            WorkOrder {
                id: "WO-1003".into(),
                equipment_id: "EQ-201".into(),
                title: "Annual crane load test".into(),
                priority: Priority::Medium,
                status: WorkOrderStatus::OnHold,
                assigned_to: None,
                due: date(2024, 7, 1),
            },
            WorkOrder {
                id: "WO-0994".into(),
                equipment_id: "EQ-101".into(),
                title: "Press hydraulic oil change".into(),
                priority: Priority::Low,
                status: WorkOrderStatus::Closed,
                assigned_to: Some("EMP-007".into()),
                due: date(2024, 5, 2),
            },
        ];

        let inventory = vec![
            InventoryItem {
                part_number: "PN-4410".into(),
                description: "Pitch bearing 2.5m".into(),
                on_hand: 12,
                reorder_point: 8,
                unit_cost: dec!(18450.00),
                location: "WH-A-01".into(),
            },
            InventoryItem {
                part_number: "PN-5120".into(),
                description: "Epoxy resin drum 200L".into(),
                on_hand: 6,
                reorder_point: 10,
                unit_cost: dec!(1320.50),
                location: "WH-C-14".into(),
            },
            InventoryItem {
                part_number: "PN-6001".into(),
                description: "Gearbox assembly 3MW".into(),
                on_hand: 3,
                reorder_point: 2,
                unit_cost: dec!(212000.00),
                location: "WH-B-02".into(),
            },
            InventoryItem {
                part_number: "PN-7788".into(),
                description: "Pump seal kit".into(),
                on_hand: 1,
                reorder_point: 4,
                unit_cost: dec!(245.75),
                location: "MRO-03".into(),
            },
        ];

        let production_orders = vec![
            ProductionOrder {
                id: "PO-2024-031".into(),
                product: "Blade B62".into(),
                quantity: 30,
                completed: 18,
                status: OrderStatus::InProgress,
                line_id: "LINE-1".into(),
                due: date(2024, 6, 28),
                customer_order: Some("CO-880".into()),
            },
            ProductionOrder {
                id: "PO-2024-032".into(),
                product: "Nacelle N3".into(),
                quantity: 10,
                completed: 4,
                status: OrderStatus::InProgress,
                line_id: "LINE-2".into(),
                due: date(2024, 7, 15),
                customer_order: Some("CO-881".into()),
            },
            ProductionOrder {
                id: "PO-2024-033".into(),
                product: "Tower section T90".into(),
                quantity: 24,
                completed: 0,
                status: OrderStatus::Released,
                line_id: "LINE-3".into(),
                due: date(2024, 8, 1),
                customer_order: Some("CO-881".into()),
            },
            ProductionOrder {
                id: "PO-2024-034".into(),
                product: "Blade B62".into(),
                quantity: 15,
                completed: 0,
                status: OrderStatus::Planned,
                line_id: "LINE-1".into(),
                due: date(2024, 9, 5),
                customer_order: None,
            },
        ];

        let customer_orders = vec![
            CustomerOrder {
                id: "CO-880".into(),
                customer: "Northwind Energy".into(),
                product: "Blade B62".into(),
                quantity: 30,
                unit_price: dec!(310000),
                status: OrderStatus::InProgress,
                ship_date: date(2024, 7, 5),
            },
            CustomerOrder {
                id: "CO-881".into(),
                customer: "Fjord Offshore Wind".into(),
                product: "Turbine 3MW kit".into(),
                quantity: 8,
                unit_price: dec!(2450000),
                status: OrderStatus::Released,
                ship_date: date(2024, 8, 20),
            },
            CustomerOrder {
                id: "CO-872".into(),
                customer: "Prairie Gusts Coop".into(),
                product: "Nacelle N3".into(),
                quantity: 2,
                unit_price: dec!(890000),
                status: OrderStatus::Shipped,
                ship_date: date(2024, 5, 18),
            },
        ];

        let lines = vec![
            ProductionLine {
                id: "LINE-1".into(),
                name: "Blade line".into(),
                status: LineStatus::Running,
                current_order: Some("PO-2024-031".into()),
                units_today: 2,
                target_today: 2,
                oee: dec!(78.4),
            },
            ProductionLine {
                id: "LINE-2".into(),
                name: "Nacelle line".into(),
                status: LineStatus::Changeover,
                current_order: Some("PO-2024-032".into()),
                units_today: 0,
                target_today: 1,
                oee: dec!(64.1),
            },
            ProductionLine {
                id: "LINE-3".into(),
                name: "Tower line".into(),
                status: LineStatus::Stopped,
                current_order: None,
                units_today: 0,
                target_today: 3,
                oee: dec!(0.0),
            },
        ];

        let employees = vec![
            Employee {
                id: "EMP-003".into(),
                name: "Ingrid Solberg".into(),
                role: "Line supervisor".into(),
                skills: vec!["composites".into(), "lean".into()],
                shift: Shift::Day,
            },
            Employee {
                id: "EMP-007".into(),
                name: "Marco Reyes".into(),
                role: "Maintenance technician".into(),
                skills: vec!["hydraulics".into(), "pumps".into()],
                shift: Shift::Day,
            },
            Employee {
                id: "EMP-011".into(),
                name: "Aiko Tanaka".into(),
                role: "Welding specialist".into(),
                skills: vec!["welding".into(), "ndt".into()],
                shift: Shift::Swing,
            },
            Employee {
                id: "EMP-015".into(),
                name: "Samuel Okafor".into(),
                role: "Crane operator".into(),
                skills: vec!["rigging".into(), "crane".into()],
                shift: Shift::Night,
            },
        ];

        let assignments = vec![
            ShiftAssignment {
                employee_id: "EMP-003".into(),
                shift: Shift::Day,
                date: date(2024, 6, 10),
                line_id: "LINE-1".into(),
                task: "Supervise blade layup".into(),
            },
            ShiftAssignment {
                employee_id: "EMP-007".into(),
                shift: Shift::Day,
                date: date(2024, 6, 10),
                line_id: "LINE-1".into(),
                task: "WO-1001 pump seals".into(),
            },
            ShiftAssignment {
                employee_id: "EMP-011".into(),
                shift: Shift::Swing,
                date: date(2024, 6, 10),
                line_id: "LINE-3".into(),
                task: "WO-1002 welder repair".into(),
            },
            ShiftAssignment {
                employee_id: "EMP-015".into(),
                shift: Shift::Night,
                date: date(2024, 6, 10),
                line_id: "LINE-2".into(),
                task: "Nacelle lift for changeover".into(),
            },
        ];

        Self {
            equipment,
            work_orders,
            inventory,
            production_orders,
            customer_orders,
            lines,
            employees,
            assignments,
        }
    }

    pub fn work_orders(&self, status: Option<WorkOrderStatus>) -> Vec<&WorkOrder> {
        let mut orders: Vec<&WorkOrder> = self
            .work_orders
            .iter()
            .filter(|wo| status.is_none_or(|s| wo.status == s))
            .collect();
        orders.sort_by_key(|wo| (wo.priority, wo.due));
        orders
    }

    pub fn equipment(&self, id: &str) -> Result<&Equipment> {
        self.equipment
            .iter()
            .find(|e| e.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| PlantError::not_found("Equipment", id))
    }

    /// Open work orders against one piece of equipment
    pub fn open_work_orders_for(&self, equipment_id: &str) -> Vec<&WorkOrder> {
        self.work_orders
            .iter()
            .filter(|wo| wo.equipment_id == equipment_id && wo.status != WorkOrderStatus::Closed)
            .collect()
    }

    pub fn inventory(&self, part: Option<&str>) -> Vec<&InventoryItem> {
        self.inventory
            .iter()
            .filter(|item| {
                part.is_none_or(|p| {
                    item.part_number.eq_ignore_ascii_case(p) || contains_ci(&item.description, p)
                })
            })
            .collect()
    }

    pub fn production_orders(
        &self,
        status: Option<OrderStatus>,
        line_id: Option<&str>,
    ) -> Vec<&ProductionOrder> {
        self.production_orders
            .iter()
            .filter(|po| status.is_none_or(|s| po.status == s))
            .filter(|po| line_id.is_none_or(|l| po.line_id.eq_ignore_ascii_case(l)))
            .collect()
    }

    pub fn customer_orders(&self, customer: Option<&str>) -> Vec<&CustomerOrder> {
        self.customer_orders
            .iter()
            .filter(|co| customer.is_none_or(|c| contains_ci(&co.customer, c)))
            .collect()
    }

    pub fn lines(&self) -> &[ProductionLine] {
        &self.lines
    }

    pub fn line(&self, id: &str) -> Result<&ProductionLine> {
        self.lines
            .iter()
            .find(|l| l.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| PlantError::not_found("Production line", id))
    }

    pub fn employees(&self, skill: Option<&str>) -> Vec<&Employee> {
        self.employees
            .iter()
            .filter(|e| skill.is_none_or(|s| e.skills.iter().any(|k| k.eq_ignore_ascii_case(s))))
            .collect()
    }

    pub fn employee_name(&self, id: &str) -> Option<&str> {
        self.employees
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn shift_assignments(&self, shift: Option<Shift>) -> Vec<&ShiftAssignment> {
        self.assignments
            .iter()
            .filter(|a| shift.is_none_or(|s| a.shift == s))
            .collect()
    }
}
