use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for work orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkOrderId(pub String);

/// Identifier wrapper for technicians. Ordering is lexicographic and backs the
/// deterministic tie-break used during candidate selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TechnicianId(pub String);

const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84 coordinate pair for work-order sites and technician home bases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat_a = self.latitude.to_radians();
        let lat_b = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Lifecycle status for a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Pending,
    Approved,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "pending",
            WorkOrderStatus::Approved => "approved",
            WorkOrderStatus::Scheduled => "scheduled",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Priority band used both for dispatch urgency and rule applicability gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl WorkOrderPriority {
    pub const fn label(self) -> &'static str {
        match self {
            WorkOrderPriority::Low => "low",
            WorkOrderPriority::Medium => "medium",
            WorkOrderPriority::High => "high",
            WorkOrderPriority::Urgent => "urgent",
        }
    }
}

/// A unit of maintenance work flowing through the assignment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub status: WorkOrderStatus,
    pub priority: WorkOrderPriority,
    pub service_category: String,
    pub location_name: String,
    pub coordinates: Option<GeoPoint>,
    pub assigned_technician: Option<TechnicianId>,
}

impl WorkOrder {
    pub fn is_assigned(&self) -> bool {
        self.assigned_technician.is_some()
    }
}

/// Recurring working window for a technician, expressed in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSchedule {
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub working_days: Vec<Weekday>,
}

impl WorkSchedule {
    /// Whether the instant falls inside the technician's working window.
    /// Shifts that wrap midnight (start > end) are honored.
    pub fn on_shift(&self, at: DateTime<Utc>) -> bool {
        if !self.working_days.contains(&at.weekday()) {
            return false;
        }

        let time = at.time();
        if self.shift_start <= self.shift_end {
            time >= self.shift_start && time < self.shift_end
        } else {
            time >= self.shift_start || time < self.shift_end
        }
    }
}

/// Historical delivery metrics sourced from the external reporting store.
/// Both rates are fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub completion_rate: f64,
    pub sla_adherence: f64,
}

/// A field worker eligible for work-order assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub name: String,
    pub home_base: String,
    pub coordinates: Option<GeoPoint>,
    pub specializations: Vec<String>,
    pub open_orders: u32,
    pub max_concurrent_orders: u32,
    pub schedule: WorkSchedule,
    pub performance: Option<PerformanceSnapshot>,
}

impl Technician {
    pub fn at_capacity(&self) -> bool {
        self.max_concurrent_orders > 0 && self.open_orders >= self.max_concurrent_orders
    }

    pub fn distance_to(&self, site: Option<&GeoPoint>) -> Option<f64> {
        match (self.coordinates.as_ref(), site) {
            (Some(base), Some(site)) => Some(base.distance_km(site)),
            _ => None,
        }
    }
}

/// Re-evaluation queue lifecycle for work orders parked by the `queue`
/// fallback action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Assigned,
    Failed,
    Expired,
}

impl QueueStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Assigned => "assigned",
            QueueStatus::Failed => "failed",
            QueueStatus::Expired => "expired",
        }
    }
}