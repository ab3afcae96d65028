use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{TechnicianId, WorkOrderId};
use super::engine::{CandidateEvaluation, ScoreBreakdown};
use super::rules::FallbackAction;

/// Terminal status of one assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Success,
    Failed,
    Fallback,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Success => "success",
            AssignmentStatus::Failed => "failed",
            AssignmentStatus::Fallback => "fallback",
        }
    }
}

/// Immutable audit record for one assignment attempt: inserted exactly once,
/// never mutated. The resolved score breakdown is snapshotted here so later
/// rule edits cannot retroactively alter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentLog {
    pub work_order_id: WorkOrderId,
    pub rule_id: Option<String>,
    pub assigned_technician_id: Option<TechnicianId>,
    pub total_score: Option<f64>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub candidates_evaluated: usize,
    pub candidates_data: Vec<CandidateEvaluation>,
    pub status: AssignmentStatus,
    pub failure_reason: Option<String>,
    pub fallback_action_taken: Option<FallbackAction>,
    pub created_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

impl AssignmentLog {
    pub fn success(
        work_order_id: WorkOrderId,
        rule_id: String,
        winner: &CandidateEvaluation,
        candidates: Vec<CandidateEvaluation>,
        created_at: DateTime<Utc>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            work_order_id,
            rule_id: Some(rule_id),
            assigned_technician_id: Some(winner.technician_id.clone()),
            total_score: Some(winner.total_score),
            score_breakdown: Some(winner.scores),
            candidates_evaluated: candidates.len(),
            candidates_data: candidates,
            status: AssignmentStatus::Success,
            failure_reason: None,
            fallback_action_taken: None,
            created_at,
            execution_time_ms,
        }
    }

    pub fn fallback(
        work_order_id: WorkOrderId,
        rule_id: String,
        action: FallbackAction,
        candidates: Vec<CandidateEvaluation>,
        created_at: DateTime<Utc>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            work_order_id,
            rule_id: Some(rule_id),
            assigned_technician_id: None,
            total_score: None,
            score_breakdown: None,
            candidates_evaluated: candidates.len(),
            candidates_data: candidates,
            status: AssignmentStatus::Fallback,
            failure_reason: None,
            fallback_action_taken: Some(action),
            created_at,
            execution_time_ms,
        }
    }

    pub fn failed(
        work_order_id: WorkOrderId,
        rule_id: Option<String>,
        reason: String,
        candidates: Vec<CandidateEvaluation>,
        created_at: DateTime<Utc>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            work_order_id,
            rule_id,
            assigned_technician_id: None,
            total_score: None,
            score_breakdown: None,
            candidates_evaluated: candidates.len(),
            candidates_data: candidates,
            status: AssignmentStatus::Failed,
            failure_reason: Some(reason),
            fallback_action_taken: None,
            created_at,
            execution_time_ms,
        }
    }

    pub fn view(&self) -> AssignmentLogView {
        AssignmentLogView {
            work_order_id: self.work_order_id.clone(),
            status: self.status.label(),
            outcome: self.outcome_summary(),
            total_score: self.total_score,
            candidates_evaluated: self.candidates_evaluated,
            created_at: self.created_at,
            execution_time_ms: self.execution_time_ms,
        }
    }

    fn outcome_summary(&self) -> String {
        match self.status {
            AssignmentStatus::Success => match &self.assigned_technician_id {
                Some(technician) => format!("assigned to {}", technician.0),
                None => "assigned".to_string(),
            },
            AssignmentStatus::Fallback => match self.fallback_action_taken {
                Some(action) => format!("no eligible candidate, fallback: {}", action.label()),
                None => "no eligible candidate".to_string(),
            },
            AssignmentStatus::Failed => self
                .failure_reason
                .clone()
                .unwrap_or_else(|| "failed".to_string()),
        }
    }
}

/// Sanitized log representation for activity-log UIs and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentLogView {
    pub work_order_id: WorkOrderId,
    pub status: &'static str,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    pub candidates_evaluated: usize,
    pub created_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}
