use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::WorkOrderStatus;

/// Delivery channels for assignment and fallback notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
    InApp,
}

impl NotificationChannel {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
            NotificationChannel::Push => "push",
            NotificationChannel::InApp => "in_app",
        }
    }
}

/// Window during which automatic assignment is allowed to run, in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub business_days: Vec<Weekday>,
}

impl BusinessHours {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if !self.business_days.contains(&at.weekday()) {
            return false;
        }

        let time = at.time();
        if self.opens_at <= self.closes_at {
            time >= self.opens_at && time < self.closes_at
        } else {
            time >= self.opens_at || time < self.closes_at
        }
    }
}

/// Global engine configuration. Loaded once per evaluation and passed
/// explicitly into the engine so evaluations stay pure and testable; edited
/// only by administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoAssignmentSettings {
    pub enabled: bool,
    pub auto_assign_on_status: Vec<WorkOrderStatus>,
    pub notify_on_assignment: bool,
    pub notify_on_fallback: bool,
    pub notification_channels: Vec<NotificationChannel>,
    /// Upper bound on candidates scored per rule; bounds fan-out against the
    /// external store. Truncation keeps nearest-first (see engine docs).
    pub max_candidates_to_evaluate: usize,
    /// How long infrastructure adapters may serve cached technician reads.
    pub technician_cache_ttl_secs: u64,
    /// Wall-clock budget for one evaluation; exceeding it logs a failed
    /// attempt with a timeout reason.
    pub evaluation_timeout_ms: u64,
    pub business_hours: BusinessHours,
}

impl Default for AutoAssignmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_assign_on_status: vec![WorkOrderStatus::Pending, WorkOrderStatus::Approved],
            notify_on_assignment: true,
            notify_on_fallback: true,
            notification_channels: vec![NotificationChannel::InApp, NotificationChannel::Email],
            max_candidates_to_evaluate: 25,
            technician_cache_ttl_secs: 300,
            evaluation_timeout_ms: 5_000,
            business_hours: BusinessHours {
                opens_at: NaiveTime::from_hms_opt(7, 0, 0).expect("valid opening time"),
                closes_at: NaiveTime::from_hms_opt(19, 0, 0).expect("valid closing time"),
                business_days: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                    Weekday::Sat,
                ],
            },
        }
    }
}
