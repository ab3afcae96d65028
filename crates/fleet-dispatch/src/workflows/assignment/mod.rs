//! Rule-driven technician auto-assignment for maintenance work orders.
//!
//! Given a work order and the current technician roster, the engine applies
//! the active prioritized rules: it filters candidates through each rule's
//! allow-lists and hard constraints, computes five weighted sub-scores per
//! candidate, and either commits the best eligible technician or executes the
//! rule's fallback action. Every real attempt leaves exactly one immutable
//! audit log entry recording the full scoring breakdown.

pub mod audit;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;

pub use audit::{AssignmentLog, AssignmentLogView, AssignmentStatus};
pub use domain::{
    GeoPoint, PerformanceSnapshot, QueueStatus, Technician, TechnicianId, WorkOrder, WorkOrderId,
    WorkOrderPriority, WorkOrderStatus, WorkSchedule,
};
pub use engine::{
    AssignmentEngine, CandidateEvaluation, EngineVerdict, ScoreBreakdown, SkipReason,
};
pub use repository::{
    AlertRecipient, AssignmentAlert, AssignmentRepository, AssignmentWrite, NotificationError,
    NotificationPublisher, RepositoryError,
};
pub use router::{assignment_router, AssignmentApi};
pub use rules::{AssignmentRule, FallbackAction, RuleValidationError, ScoreWeights};
pub use service::{AssignmentResponse, AssignmentService, EvaluationOutcome, FailureKind};
pub use settings::{AutoAssignmentSettings, BusinessHours, NotificationChannel};
