use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use clap::Args;

use fleet_dispatch::error::AppError;
use fleet_dispatch::workflows::assignment::{
    AssignmentLog, AssignmentRepository, AssignmentService, AssignmentStatus,
    AutoAssignmentSettings, WorkOrderId,
};

use crate::infra::{InMemoryAssignmentRepository, InMemoryNotificationPublisher};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Only evaluate this work order instead of the whole seeded backlog.
    #[arg(long)]
    pub(crate) work_order: Option<String>,
    /// Print the per-candidate score breakdown for each evaluation.
    #[arg(long)]
    pub(crate) show_candidates: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Work order identifier to evaluate against the seeded fleet.
    pub(crate) work_order_id: String,
    /// Print the stored audit trail after the evaluation.
    #[arg(long)]
    pub(crate) show_log: bool,
}

// Demos evaluate at a fixed mid-week, mid-shift instant so the printed
// scores are reproducible run to run.
fn demo_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 11, 15, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn seeded_service() -> (
    Arc<InMemoryAssignmentRepository>,
    AssignmentService<InMemoryAssignmentRepository, InMemoryNotificationPublisher>,
    Arc<InMemoryNotificationPublisher>,
    AutoAssignmentSettings,
) {
    let settings = AutoAssignmentSettings::default();
    let repository = Arc::new(InMemoryAssignmentRepository::seeded(&settings));
    let notifier = Arc::new(InMemoryNotificationPublisher::default());
    let service = AssignmentService::new(repository.clone(), notifier.clone());
    (repository, service, notifier, settings)
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let (repository, service, _notifier, settings) = seeded_service();
    let id = WorkOrderId(args.work_order_id);

    let outcome = service.evaluate_at(&id, &settings, demo_clock());
    match serde_json::to_string_pretty(&outcome.response()) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("response unavailable: {err}"),
    }

    if args.show_log {
        for log in repository.logs_for(&id).map_err(AppError::from)? {
            print_log(&log, true);
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (repository, service, notifier, settings) = seeded_service();

    let backlog = match args.work_order {
        Some(id) => vec![WorkOrderId(id)],
        None => repository.work_order_ids(),
    };

    println!("Fleet dispatch demo ({} work orders)", backlog.len());
    for id in &backlog {
        let response = service
            .evaluate_at(id, &settings, demo_clock())
            .response();

        println!("\nWork order {}", id.0);
        match (&response.assigned_technician_id, &response.fallback_action) {
            (Some(technician), _) => {
                let score = response.assignment_score.unwrap_or_default();
                println!("- assigned to {technician} (score {score:.1})");
            }
            (None, Some(action)) => println!("- no eligible candidate, fallback: {action}"),
            (None, None) => {
                let message = response.message.as_deref().unwrap_or("no outcome");
                println!("- {message}");
            }
        }
        if let Some(count) = response.candidates_evaluated {
            println!("- candidates evaluated: {count}");
        }

        if args.show_candidates {
            for log in repository.logs_for(id).map_err(AppError::from)? {
                print_log(&log, true);
            }
        }
    }

    let queued = repository.queued();
    if !queued.is_empty() {
        println!("\nRe-evaluation queue");
        for (id, status) in queued {
            println!("- {} ({})", id.0, status.label());
        }
    }

    let alerts = notifier.events();
    if alerts.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications");
        for alert in alerts {
            println!("- template={} -> {}", alert.template, alert.work_order_id.0);
        }
    }

    Ok(())
}

fn print_log(log: &AssignmentLog, show_candidates: bool) {
    println!(
        "  [{}] {} candidates in {}ms",
        log.status.label(),
        log.candidates_evaluated,
        log.execution_time_ms
    );
    if log.status == AssignmentStatus::Failed {
        if let Some(reason) = &log.failure_reason {
            println!("  reason: {reason}");
        }
    }
    if !show_candidates {
        return;
    }
    for candidate in &log.candidates_data {
        let marker = if candidate.eligible { " " } else { "x" };
        println!(
            "  {marker} {} total {:.1} | avail {:.0} spec {:.0} prox {:.0} load {:.0} perf {:.0} | {}",
            candidate.technician_id.0,
            candidate.total_score,
            candidate.scores.availability,
            candidate.scores.specialization,
            candidate.scores.proximity,
            candidate.scores.workload,
            candidate.scores.performance,
            candidate.reason
        );
    }
}
