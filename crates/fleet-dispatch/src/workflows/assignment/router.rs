use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::WorkOrderId;
use super::repository::{AssignmentRepository, NotificationPublisher, RepositoryError};
use super::service::{AssignmentService, EvaluationOutcome, FailureKind};
use super::settings::AutoAssignmentSettings;

/// Shared handler state: the service plus the settings snapshot applied to
/// incoming evaluations.
pub struct AssignmentApi<R, N> {
    pub service: Arc<AssignmentService<R, N>>,
    pub settings: Arc<AutoAssignmentSettings>,
}

impl<R, N> Clone for AssignmentApi<R, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            settings: self.settings.clone(),
        }
    }
}

/// Router builder exposing HTTP endpoints for triggering evaluations and
/// reading the activity log.
pub fn assignment_router<R, N>(api: AssignmentApi<R, N>) -> Router
where
    R: AssignmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/assignments/:work_order_id/evaluate",
            post(evaluate_handler::<R, N>),
        )
        .route(
            "/api/v1/assignments/:work_order_id/logs",
            get(logs_handler::<R, N>),
        )
        .with_state(api)
}

pub(crate) async fn evaluate_handler<R, N>(
    State(api): State<AssignmentApi<R, N>>,
    Path(work_order_id): Path<String>,
) -> Response
where
    R: AssignmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = WorkOrderId(work_order_id);
    let outcome = api
        .service
        .evaluate_at(&id, &api.settings, chrono::Utc::now());

    match &outcome {
        EvaluationOutcome::Failed {
            kind: FailureKind::WorkOrderNotFound,
            reason,
            ..
        } => {
            let payload = json!({ "error": reason, "work_order_id": id.0 });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        // Skipped covers the documented no-ops (disabled settings, already
        // assigned, non-triggering status); they still return the structured
        // response body.
        _ => (StatusCode::OK, axum::Json(outcome.response())).into_response(),
    }
}

pub(crate) async fn logs_handler<R, N>(
    State(api): State<AssignmentApi<R, N>>,
    Path(work_order_id): Path<String>,
) -> Response
where
    R: AssignmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = WorkOrderId(work_order_id);
    match api.service.activity_log(&id) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(RepositoryError::NotFound) => {
            let payload = json!({ "work_order_id": id.0, "logs": [] });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
