use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::audit::{AssignmentLog, AssignmentLogView};
use super::domain::WorkOrderId;
use super::engine::{AssignmentEngine, CandidateEvaluation, EngineVerdict, SkipReason};
use super::repository::{
    AlertRecipient, AssignmentAlert, AssignmentRepository, AssignmentWrite, NotificationPublisher,
    RepositoryError,
};
use super::rules::FallbackAction;
use super::settings::AutoAssignmentSettings;

/// Response shape surfaced to callers and the activity-log UI. Every
/// invocation produces one of these; the engine never throws past its
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub success: bool,
    pub work_order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_technician_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_evaluated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_action: Option<String>,
}

/// Machine-readable classification of a failed attempt, so HTTP status
/// mapping does not depend on the wording of `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    WorkOrderNotFound,
    Internal,
}

/// Explicit result variant per attempt so callers and tests can
/// pattern-match outcomes instead of unwinding exceptions.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    Assigned {
        work_order_id: WorkOrderId,
        technician_id: String,
        technician_name: String,
        score: f64,
        candidates_evaluated: usize,
        execution_time_ms: u64,
        message: String,
    },
    Fallback {
        work_order_id: WorkOrderId,
        action: FallbackAction,
        candidates_evaluated: usize,
        execution_time_ms: u64,
        message: String,
    },
    Failed {
        work_order_id: WorkOrderId,
        kind: FailureKind,
        reason: String,
        execution_time_ms: u64,
    },
    Skipped {
        work_order_id: WorkOrderId,
        reason: SkipReason,
    },
}

impl EvaluationOutcome {
    pub fn response(&self) -> AssignmentResponse {
        match self {
            EvaluationOutcome::Assigned {
                work_order_id,
                technician_id,
                technician_name,
                score,
                candidates_evaluated,
                execution_time_ms,
                message,
            } => AssignmentResponse {
                success: true,
                work_order_id: work_order_id.0.clone(),
                assigned_technician_id: Some(technician_id.clone()),
                technician_name: Some(technician_name.clone()),
                assignment_score: Some(*score),
                candidates_evaluated: Some(*candidates_evaluated),
                execution_time_ms: Some(*execution_time_ms),
                message: Some(message.clone()),
                fallback_action: None,
            },
            EvaluationOutcome::Fallback {
                work_order_id,
                action,
                candidates_evaluated,
                execution_time_ms,
                message,
            } => AssignmentResponse {
                success: false,
                work_order_id: work_order_id.0.clone(),
                assigned_technician_id: None,
                technician_name: None,
                assignment_score: None,
                candidates_evaluated: Some(*candidates_evaluated),
                execution_time_ms: Some(*execution_time_ms),
                message: Some(message.clone()),
                fallback_action: Some(action.label().to_string()),
            },
            EvaluationOutcome::Failed {
                work_order_id,
                kind: _,
                reason,
                execution_time_ms,
            } => AssignmentResponse {
                success: false,
                work_order_id: work_order_id.0.clone(),
                assigned_technician_id: None,
                technician_name: None,
                assignment_score: None,
                candidates_evaluated: None,
                execution_time_ms: Some(*execution_time_ms),
                message: Some(reason.clone()),
                fallback_action: None,
            },
            EvaluationOutcome::Skipped {
                work_order_id,
                reason,
            } => AssignmentResponse {
                success: false,
                work_order_id: work_order_id.0.clone(),
                assigned_technician_id: None,
                technician_name: None,
                assignment_score: None,
                candidates_evaluated: None,
                execution_time_ms: None,
                message: Some(format!("skipped: {}", reason.message())),
                fallback_action: None,
            },
        }
    }
}

/// Service composing the repository, notification hook, and scoring engine.
/// Settings are passed per call rather than held as state so administrators'
/// edits take effect on the next evaluation.
pub struct AssignmentService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    engine: AssignmentEngine,
}

impl<R, N> AssignmentService<R, N>
where
    R: AssignmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
            engine: AssignmentEngine::new(),
        }
    }

    /// Evaluate one work order against current rules and candidates.
    pub fn evaluate(
        &self,
        work_order_id: &WorkOrderId,
        settings: &AutoAssignmentSettings,
    ) -> AssignmentResponse {
        self.evaluate_at(work_order_id, settings, Utc::now())
            .response()
    }

    /// Same as [`evaluate`](Self::evaluate) with an explicit clock, so tests
    /// and replays are deterministic.
    pub fn evaluate_at(
        &self,
        work_order_id: &WorkOrderId,
        settings: &AutoAssignmentSettings,
        now: DateTime<Utc>,
    ) -> EvaluationOutcome {
        let started = Instant::now();

        let work_order = match self.repository.work_order(work_order_id) {
            Ok(Some(work_order)) => work_order,
            Ok(None) => {
                return self.failed(
                    work_order_id.clone(),
                    FailureKind::WorkOrderNotFound,
                    None,
                    "work order not found".to_string(),
                    Vec::new(),
                    now,
                    started,
                )
            }
            Err(err) => {
                return self.failed(
                    work_order_id.clone(),
                    FailureKind::Internal,
                    None,
                    format!("work order lookup failed: {err}"),
                    Vec::new(),
                    now,
                    started,
                )
            }
        };

        let rules = match self.repository.active_rules() {
            Ok(rules) => rules,
            Err(err) => {
                return self.failed(
                    work_order_id.clone(),
                    FailureKind::Internal,
                    None,
                    format!("rule lookup failed: {err}"),
                    Vec::new(),
                    now,
                    started,
                )
            }
        };

        let technicians = match self.repository.technicians() {
            Ok(technicians) => technicians,
            Err(err) => {
                return self.failed(
                    work_order_id.clone(),
                    FailureKind::Internal,
                    None,
                    format!("technician lookup failed: {err}"),
                    Vec::new(),
                    now,
                    started,
                )
            }
        };

        if elapsed_ms(started) > settings.evaluation_timeout_ms {
            return self.failed(
                work_order_id.clone(),
                FailureKind::Internal,
                None,
                format!(
                    "evaluation timed out after {}ms while loading inputs",
                    elapsed_ms(started)
                ),
                Vec::new(),
                now,
                started,
            );
        }

        let verdict = match self
            .engine
            .evaluate(&work_order, &rules, &technicians, settings, now)
        {
            Ok(verdict) => verdict,
            Err(validation) => {
                return self.failed(
                    work_order_id.clone(),
                    FailureKind::Internal,
                    None,
                    format!("malformed rule: {validation}"),
                    Vec::new(),
                    now,
                    started,
                )
            }
        };

        match verdict {
            EngineVerdict::Skipped(reason) => {
                debug!(work_order = %work_order_id.0, reason = reason.message(), "evaluation skipped");
                EvaluationOutcome::Skipped {
                    work_order_id: work_order_id.clone(),
                    reason,
                }
            }
            EngineVerdict::Assigned {
                rule_id,
                winner,
                candidates,
            } => self.commit_assignment(
                work_order_id.clone(),
                rule_id,
                winner,
                candidates,
                settings,
                now,
                started,
            ),
            EngineVerdict::Exhausted {
                rule_id,
                fallback_action,
                fallback_user_id,
                candidates,
            } => self.run_fallback(
                work_order_id.clone(),
                rule_id,
                fallback_action,
                fallback_user_id,
                candidates,
                settings,
                now,
                started,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_assignment(
        &self,
        work_order_id: WorkOrderId,
        rule_id: String,
        winner: CandidateEvaluation,
        candidates: Vec<CandidateEvaluation>,
        settings: &AutoAssignmentSettings,
        now: DateTime<Utc>,
        started: Instant,
    ) -> EvaluationOutcome {
        match self
            .repository
            .assign_if_unassigned(&work_order_id, &winner.technician_id)
        {
            Ok(AssignmentWrite::Applied) => {}
            Ok(AssignmentWrite::Superseded { current_assignee }) => {
                // The losing side of a duplicate-trigger race: record it as
                // superseded instead of overwriting the earlier assignment.
                return self.failed(
                    work_order_id,
                    FailureKind::Internal,
                    Some(rule_id),
                    format!(
                        "superseded: work order was assigned to {} during evaluation",
                        current_assignee.0
                    ),
                    candidates,
                    now,
                    started,
                );
            }
            Err(err) => {
                return self.failed(
                    work_order_id,
                    FailureKind::Internal,
                    Some(rule_id),
                    format!("assignment write failed: {err}"),
                    candidates,
                    now,
                    started,
                )
            }
        }

        let mut message = format!("assigned to {}", winner.technician_name);
        if settings.notify_on_assignment {
            let mut details = BTreeMap::new();
            details.insert("rule_id".to_string(), rule_id.clone());
            details.insert(
                "score".to_string(),
                format!("{:.1}", winner.total_score),
            );
            let alert = AssignmentAlert {
                template: "technician_assigned".to_string(),
                work_order_id: work_order_id.clone(),
                recipient: AlertRecipient::User(winner.technician_id.0.clone()),
                channels: settings.notification_channels.clone(),
                details,
            };
            if let Err(err) = self.notifier.publish(alert) {
                warn!(work_order = %work_order_id.0, error = %err, "assignment notification failed");
                message.push_str(" (notification delivery failed)");
            }
        }

        let execution_time_ms = elapsed_ms(started);
        let log = AssignmentLog::success(
            work_order_id.clone(),
            rule_id,
            &winner,
            candidates.clone(),
            now,
            execution_time_ms,
        );
        self.insert_log(log);

        EvaluationOutcome::Assigned {
            work_order_id,
            technician_id: winner.technician_id.0,
            technician_name: winner.technician_name,
            score: winner.total_score,
            candidates_evaluated: candidates.len(),
            execution_time_ms,
            message,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_fallback(
        &self,
        work_order_id: WorkOrderId,
        rule_id: String,
        action: FallbackAction,
        fallback_user_id: Option<String>,
        candidates: Vec<CandidateEvaluation>,
        settings: &AutoAssignmentSettings,
        now: DateTime<Utc>,
        started: Instant,
    ) -> EvaluationOutcome {
        let mut message = format!("no eligible candidate, fallback: {}", action.label());

        match action {
            FallbackAction::Queue => {
                if let Err(err) = self.repository.enqueue_for_reassignment(&work_order_id) {
                    return self.failed(
                        work_order_id,
                        FailureKind::Internal,
                        Some(rule_id),
                        format!("queue fallback failed: {err}"),
                        candidates,
                        now,
                        started,
                    );
                }
            }
            FallbackAction::Escalate | FallbackAction::NotifyManager => {
                if settings.notify_on_fallback {
                    let recipient = match fallback_user_id {
                        Some(user) => AlertRecipient::User(user),
                        None => AlertRecipient::ManagerRole,
                    };
                    let mut details = BTreeMap::new();
                    details.insert("rule_id".to_string(), rule_id.clone());
                    details.insert(
                        "candidates_evaluated".to_string(),
                        candidates.len().to_string(),
                    );
                    let alert = AssignmentAlert {
                        template: match action {
                            FallbackAction::Escalate => "assignment_escalated".to_string(),
                            _ => "assignment_needs_manager".to_string(),
                        },
                        work_order_id: work_order_id.clone(),
                        recipient,
                        channels: settings.notification_channels.clone(),
                        details,
                    };
                    if let Err(err) = self.notifier.publish(alert) {
                        warn!(work_order = %work_order_id.0, error = %err, "fallback notification failed");
                        message.push_str(" (notification delivery failed)");
                    }
                }
            }
        }

        let execution_time_ms = elapsed_ms(started);
        let log = AssignmentLog::fallback(
            work_order_id.clone(),
            rule_id,
            action,
            candidates.clone(),
            now,
            execution_time_ms,
        );
        self.insert_log(log);

        EvaluationOutcome::Fallback {
            work_order_id,
            action,
            candidates_evaluated: candidates.len(),
            execution_time_ms,
            message,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn failed(
        &self,
        work_order_id: WorkOrderId,
        kind: FailureKind,
        rule_id: Option<String>,
        reason: String,
        candidates: Vec<CandidateEvaluation>,
        now: DateTime<Utc>,
        started: Instant,
    ) -> EvaluationOutcome {
        let execution_time_ms = elapsed_ms(started);
        let log = AssignmentLog::failed(
            work_order_id.clone(),
            rule_id,
            reason.clone(),
            candidates,
            now,
            execution_time_ms,
        );
        self.insert_log(log);

        EvaluationOutcome::Failed {
            work_order_id,
            kind,
            reason,
            execution_time_ms,
        }
    }

    /// Activity-log view for operator UIs.
    pub fn activity_log(
        &self,
        work_order_id: &WorkOrderId,
    ) -> Result<Vec<AssignmentLogView>, RepositoryError> {
        let logs = self.repository.logs_for(work_order_id)?;
        Ok(logs.iter().map(AssignmentLog::view).collect())
    }

    // The audit trail is best-effort when the store itself is failing; a
    // lost log line must not escalate into a thrown error.
    fn insert_log(&self, log: AssignmentLog) {
        if let Err(err) = self.repository.insert_log(log) {
            warn!(error = %err, "failed to persist assignment log");
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
