pub(crate) mod scoring;
pub(crate) mod selection;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Technician, TechnicianId, WorkOrder};
use super::rules::{AssignmentRule, FallbackAction, RuleValidationError, ScoreWeights};
use super::settings::AutoAssignmentSettings;

/// Per-factor scores for one candidate, each normalized to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub availability: f64,
    pub specialization: f64,
    pub proximity: f64,
    pub workload: f64,
    pub performance: f64,
}

impl ScoreBreakdown {
    /// Composite score: weighted sum divided by the weight total, so weights
    /// act as relative contributions whether or not they sum to 100.
    pub fn weighted_total(&self, weights: &ScoreWeights) -> f64 {
        let total = weights.total();
        if total == 0 {
            return 0.0;
        }

        let weighted = self.availability * weights.availability as f64
            + self.specialization * weights.specialization as f64
            + self.proximity * weights.proximity as f64
            + self.workload * weights.workload as f64
            + self.performance * weights.performance as f64;
        weighted / total as f64
    }
}

/// One technician's evaluation against a work order. Ephemeral: only
/// persisted as part of a log's candidate snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub technician_id: TechnicianId,
    pub technician_name: String,
    pub scores: ScoreBreakdown,
    pub total_score: f64,
    pub distance_km: Option<f64>,
    pub eligible: bool,
    pub reason: String,
}

/// Why an evaluation did not run. Preconditions are a silent no-op, never a
/// logged failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AssignmentDisabled,
    StatusNotTriggering,
    OutsideBusinessHours,
    AlreadyAssigned,
    NoActiveRules,
    NoApplicableRule,
}

impl SkipReason {
    pub const fn message(self) -> &'static str {
        match self {
            SkipReason::AssignmentDisabled => "auto-assignment is disabled",
            SkipReason::StatusNotTriggering => "work order status does not trigger auto-assignment",
            SkipReason::OutsideBusinessHours => "outside the configured business hours",
            SkipReason::AlreadyAssigned => "work order already has an assigned technician",
            SkipReason::NoActiveRules => "no active assignment rules",
            SkipReason::NoApplicableRule => "no rule applies to this work order",
        }
    }
}

/// Outcome of one pure engine pass, before any side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineVerdict {
    Assigned {
        rule_id: String,
        winner: CandidateEvaluation,
        candidates: Vec<CandidateEvaluation>,
    },
    Exhausted {
        rule_id: String,
        fallback_action: FallbackAction,
        fallback_user_id: Option<String>,
        candidates: Vec<CandidateEvaluation>,
    },
    Skipped(SkipReason),
}

/// Stateless evaluator. All inputs arrive as parameters so a single pass can
/// be reproduced exactly in tests; I/O stays in the service layer.
#[derive(Debug, Default)]
pub struct AssignmentEngine;

impl AssignmentEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        work_order: &WorkOrder,
        rules: &[AssignmentRule],
        technicians: &[Technician],
        settings: &AutoAssignmentSettings,
        now: DateTime<Utc>,
    ) -> Result<EngineVerdict, RuleValidationError> {
        if !settings.enabled {
            return Ok(EngineVerdict::Skipped(SkipReason::AssignmentDisabled));
        }
        if !settings.auto_assign_on_status.contains(&work_order.status) {
            return Ok(EngineVerdict::Skipped(SkipReason::StatusNotTriggering));
        }
        if !settings.business_hours.contains(now) {
            return Ok(EngineVerdict::Skipped(SkipReason::OutsideBusinessHours));
        }
        if work_order.is_assigned() {
            return Ok(EngineVerdict::Skipped(SkipReason::AlreadyAssigned));
        }

        let mut active: Vec<&AssignmentRule> = rules.iter().filter(|rule| rule.active).collect();
        if active.is_empty() {
            return Ok(EngineVerdict::Skipped(SkipReason::NoActiveRules));
        }
        active.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        // Top applicable rule backs the fallback decision when every rule
        // comes up empty.
        let mut top_applicable: Option<(&AssignmentRule, Vec<CandidateEvaluation>)> = None;

        for rule in active {
            rule.validate()?;
            if !selection::rule_applies(rule, work_order) {
                continue;
            }

            let pool = selection::candidate_pool(
                rule,
                work_order,
                technicians,
                settings.max_candidates_to_evaluate,
            );
            let pool_average_load = if pool.is_empty() {
                0.0
            } else {
                pool.iter().map(|t| t.open_orders as f64).sum::<f64>() / pool.len() as f64
            };

            let candidates: Vec<CandidateEvaluation> = pool
                .iter()
                .map(|technician| {
                    selection::evaluate_candidate(
                        rule,
                        work_order,
                        technician,
                        pool_average_load,
                        now,
                    )
                })
                .collect();

            if let Some(winner) = selection::select_winner(&candidates) {
                return Ok(EngineVerdict::Assigned {
                    rule_id: rule.id.clone(),
                    winner: winner.clone(),
                    candidates,
                });
            }

            if top_applicable.is_none() {
                top_applicable = Some((rule, candidates));
            }
        }

        match top_applicable {
            Some((rule, candidates)) => Ok(EngineVerdict::Exhausted {
                rule_id: rule.id.clone(),
                fallback_action: rule.fallback_action,
                fallback_user_id: rule.fallback_user_id.clone(),
                candidates,
            }),
            None => Ok(EngineVerdict::Skipped(SkipReason::NoApplicableRule)),
        }
    }
}
