use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use fleet_dispatch::config::AppConfig;
use fleet_dispatch::error::AppError;
use fleet_dispatch::telemetry;
use fleet_dispatch::workflows::assignment::{
    AssignmentApi, AssignmentService, AutoAssignmentSettings,
};

use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAssignmentRepository, InMemoryNotificationPublisher};
use crate::routes::with_assignment_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let settings = Arc::new(AutoAssignmentSettings::default());
    let repository = Arc::new(InMemoryAssignmentRepository::seeded(&settings));
    let notifier = Arc::new(InMemoryNotificationPublisher::default());
    let assignment_service = Arc::new(AssignmentService::new(repository, notifier));

    let app = with_assignment_routes(AssignmentApi {
        service: assignment_service,
        settings,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "fleet dispatch service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
