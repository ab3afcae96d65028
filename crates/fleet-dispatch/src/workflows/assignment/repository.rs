use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::audit::AssignmentLog;
use super::domain::{Technician, TechnicianId, WorkOrder, WorkOrderId};
use super::rules::AssignmentRule;
use super::settings::NotificationChannel;

/// Result of the conditional assignment write. The write must only apply
/// while the work order is still unassigned; a concurrent evaluation that
/// lands first turns this invocation into `Superseded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentWrite {
    Applied,
    Superseded { current_assignee: TechnicianId },
}

/// Storage abstraction over the external data store. The engine only reads
/// work orders, technicians, and rules; writes are limited to the conditional
/// assignment, the append-only log, and the re-evaluation queue.
pub trait AssignmentRepository: Send + Sync {
    fn work_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError>;
    fn technicians(&self) -> Result<Vec<Technician>, RepositoryError>;
    fn active_rules(&self) -> Result<Vec<AssignmentRule>, RepositoryError>;
    fn assign_if_unassigned(
        &self,
        id: &WorkOrderId,
        technician: &TechnicianId,
    ) -> Result<AssignmentWrite, RepositoryError>;
    fn insert_log(&self, log: AssignmentLog) -> Result<(), RepositoryError>;
    fn logs_for(&self, id: &WorkOrderId) -> Result<Vec<AssignmentLog>, RepositoryError>;
    fn enqueue_for_reassignment(&self, id: &WorkOrderId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, SMS, push adapters). Dispatch is
/// fire-and-forget: delivery failure never changes an evaluation's outcome.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, alert: AssignmentAlert) -> Result<(), NotificationError>;
}

/// Who receives a fallback or assignment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertRecipient {
    User(String),
    ManagerRole,
}

/// Notification payload so routes and tests can assert integration
/// boundaries without a live transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentAlert {
    pub template: String,
    pub work_order_id: WorkOrderId,
    pub recipient: AlertRecipient,
    pub channels: Vec<NotificationChannel>,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
