use serde::{Deserialize, Serialize};

use super::domain::WorkOrderPriority;

/// Relative weights for the five scoring factors. Each weight is 0..=100;
/// the set is treated as relative contributions and deliberately does not
/// need to sum to 100 (the composite divides by the weight total).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub availability: u8,
    pub specialization: u8,
    pub proximity: u8,
    pub workload: u8,
    pub performance: u8,
}

impl ScoreWeights {
    pub fn total(&self) -> u32 {
        self.availability as u32
            + self.specialization as u32
            + self.proximity as u32
            + self.workload as u32
            + self.performance as u32
    }

    fn factors(&self) -> [(&'static str, u8); 5] {
        [
            ("availability", self.availability),
            ("specialization", self.specialization),
            ("proximity", self.proximity),
            ("workload", self.workload),
            ("performance", self.performance),
        ]
    }
}

/// Policy executed when a rule applies but no candidate survives the hard
/// constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    Escalate,
    Queue,
    NotifyManager,
}

impl FallbackAction {
    pub const fn label(self) -> &'static str {
        match self {
            FallbackAction::Escalate => "escalate",
            FallbackAction::Queue => "queue",
            FallbackAction::NotifyManager => "notify_manager",
        }
    }
}

/// Administrator-defined assignment policy. Lower `priority` numbers take
/// precedence; the first rule that applies and yields an eligible candidate
/// wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRule {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub priority: u32,
    pub weights: ScoreWeights,
    pub max_distance_km: Option<f64>,
    pub require_specialization_match: bool,
    pub respect_max_concurrent_orders: bool,
    pub allowed_locations: Option<Vec<String>>,
    pub allowed_service_categories: Option<Vec<String>>,
    pub priority_levels: Option<Vec<WorkOrderPriority>>,
    pub fallback_action: FallbackAction,
    pub fallback_user_id: Option<String>,
}

impl AssignmentRule {
    /// Reject malformed rules up front instead of silently clamping values.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        for (factor, value) in self.weights.factors() {
            if value > 100 {
                return Err(RuleValidationError::WeightOutOfRange {
                    rule_id: self.id.clone(),
                    factor,
                    value,
                });
            }
        }

        if self.weights.total() == 0 {
            return Err(RuleValidationError::ZeroWeightTotal {
                rule_id: self.id.clone(),
            });
        }

        if let Some(distance) = self.max_distance_km {
            if !distance.is_finite() || distance <= 0.0 {
                return Err(RuleValidationError::InvalidMaxDistance {
                    rule_id: self.id.clone(),
                    value: distance,
                });
            }
        }

        Ok(())
    }
}

/// Validation errors raised when loading administrator-edited rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule {rule_id}: weight '{factor}' is {value}, outside 0..=100")]
    WeightOutOfRange {
        rule_id: String,
        factor: &'static str,
        value: u8,
    },
    #[error("rule {rule_id}: all weights are zero")]
    ZeroWeightTotal { rule_id: String },
    #[error("rule {rule_id}: max_distance_km {value} must be finite and positive")]
    InvalidMaxDistance { rule_id: String, value: f64 },
}
