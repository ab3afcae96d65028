use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{NaiveTime, Weekday};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use fleet_dispatch::workflows::assignment::{
    AssignmentAlert, AssignmentLog, AssignmentRepository, AssignmentRule, AssignmentWrite,
    AutoAssignmentSettings, FallbackAction, GeoPoint, NotificationError, NotificationPublisher,
    PerformanceSnapshot, QueueStatus, RepositoryError, ScoreWeights, Technician, TechnicianId,
    WorkOrder, WorkOrderId, WorkOrderPriority, WorkOrderStatus, WorkSchedule,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

struct TechnicianCache {
    fetched_at: Instant,
    roster: Vec<Technician>,
}

/// In-memory store backing the service in demos and local runs. Technician
/// reads go through a TTL cache so the read path matches deployments where
/// the roster lives in an external system of record.
pub(crate) struct InMemoryAssignmentRepository {
    work_orders: Mutex<HashMap<WorkOrderId, WorkOrder>>,
    technicians: Mutex<Vec<Technician>>,
    technician_cache: Mutex<Option<TechnicianCache>>,
    cache_ttl: Duration,
    rules: Mutex<Vec<AssignmentRule>>,
    logs: Mutex<Vec<AssignmentLog>>,
    reassignment_queue: Mutex<Vec<(WorkOrderId, QueueStatus)>>,
}

impl InMemoryAssignmentRepository {
    pub(crate) fn new(cache_ttl: Duration) -> Self {
        Self {
            work_orders: Mutex::new(HashMap::new()),
            technicians: Mutex::new(Vec::new()),
            technician_cache: Mutex::new(None),
            cache_ttl,
            rules: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            reassignment_queue: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn seeded(settings: &AutoAssignmentSettings) -> Self {
        let repository = Self::new(Duration::from_secs(settings.technician_cache_ttl_secs));
        {
            let mut guard = repository
                .work_orders
                .lock()
                .expect("work order mutex poisoned");
            for work_order in seed_work_orders() {
                guard.insert(work_order.id.clone(), work_order);
            }
        }
        *repository
            .technicians
            .lock()
            .expect("technician mutex poisoned") = seed_technicians();
        *repository.rules.lock().expect("rule mutex poisoned") = seed_rules();
        repository
    }

    pub(crate) fn queued(&self) -> Vec<(WorkOrderId, QueueStatus)> {
        self.reassignment_queue
            .lock()
            .expect("queue mutex poisoned")
            .clone()
    }

    pub(crate) fn work_order_ids(&self) -> Vec<WorkOrderId> {
        let mut ids: Vec<WorkOrderId> = self
            .work_orders
            .lock()
            .expect("work order mutex poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }
}

impl AssignmentRepository for InMemoryAssignmentRepository {
    fn work_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        Ok(self
            .work_orders
            .lock()
            .expect("work order mutex poisoned")
            .get(id)
            .cloned())
    }

    fn technicians(&self) -> Result<Vec<Technician>, RepositoryError> {
        let mut cache = self
            .technician_cache
            .lock()
            .expect("technician cache mutex poisoned");
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                return Ok(cached.roster.clone());
            }
        }

        let roster = self
            .technicians
            .lock()
            .expect("technician mutex poisoned")
            .clone();
        *cache = Some(TechnicianCache {
            fetched_at: Instant::now(),
            roster: roster.clone(),
        });
        Ok(roster)
    }

    fn active_rules(&self) -> Result<Vec<AssignmentRule>, RepositoryError> {
        Ok(self.rules.lock().expect("rule mutex poisoned").clone())
    }

    fn assign_if_unassigned(
        &self,
        id: &WorkOrderId,
        technician: &TechnicianId,
    ) -> Result<AssignmentWrite, RepositoryError> {
        let mut guard = self.work_orders.lock().expect("work order mutex poisoned");
        let work_order = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if let Some(current) = &work_order.assigned_technician {
            return Ok(AssignmentWrite::Superseded {
                current_assignee: current.clone(),
            });
        }
        work_order.assigned_technician = Some(technician.clone());
        Ok(AssignmentWrite::Applied)
    }

    fn insert_log(&self, log: AssignmentLog) -> Result<(), RepositoryError> {
        self.logs.lock().expect("log mutex poisoned").push(log);
        Ok(())
    }

    fn logs_for(&self, id: &WorkOrderId) -> Result<Vec<AssignmentLog>, RepositoryError> {
        Ok(self
            .logs
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .filter(|log| &log.work_order_id == id)
            .cloned()
            .collect())
    }

    fn enqueue_for_reassignment(&self, id: &WorkOrderId) -> Result<(), RepositoryError> {
        self.reassignment_queue
            .lock()
            .expect("queue mutex poisoned")
            .push((id.clone(), QueueStatus::Pending));
        Ok(())
    }
}

/// Publisher that records alerts and surfaces them on the log stream; real
/// deployments swap in an email/SMS gateway adapter here.
#[derive(Default)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Mutex<Vec<AssignmentAlert>>,
}

impl InMemoryNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<AssignmentAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, alert: AssignmentAlert) -> Result<(), NotificationError> {
        info!(
            template = %alert.template,
            work_order = %alert.work_order_id.0,
            "dispatch notification"
        );
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

fn depot() -> GeoPoint {
    GeoPoint::new(41.5868, -93.6250)
}

fn near_depot(km_north: f64) -> GeoPoint {
    GeoPoint::new(depot().latitude + km_north / 111.1949, depot().longitude)
}

fn standard_shift() -> WorkSchedule {
    WorkSchedule {
        shift_start: NaiveTime::from_hms_opt(6, 0, 0).expect("valid shift start"),
        shift_end: NaiveTime::from_hms_opt(22, 0, 0).expect("valid shift end"),
        working_days: vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ],
    }
}

fn seed_work_orders() -> Vec<WorkOrder> {
    vec![
        WorkOrder {
            id: WorkOrderId("wo-1001".to_string()),
            status: WorkOrderStatus::Pending,
            priority: WorkOrderPriority::High,
            service_category: "electrical".to_string(),
            location_name: "Depot North".to_string(),
            coordinates: Some(depot()),
            assigned_technician: None,
        },
        WorkOrder {
            id: WorkOrderId("wo-1002".to_string()),
            status: WorkOrderStatus::Approved,
            priority: WorkOrderPriority::Urgent,
            service_category: "hvac".to_string(),
            location_name: "Depot North".to_string(),
            coordinates: Some(near_depot(1.5)),
            assigned_technician: None,
        },
        WorkOrder {
            id: WorkOrderId("wo-1003".to_string()),
            status: WorkOrderStatus::Pending,
            priority: WorkOrderPriority::Medium,
            service_category: "tires".to_string(),
            location_name: "Depot South".to_string(),
            coordinates: Some(near_depot(-4.0)),
            assigned_technician: None,
        },
    ]
}

fn seed_technicians() -> Vec<Technician> {
    let technician = |id: &str, name: &str, skills: &[&str], km: f64, open: u32, perf: f64| {
        Technician {
            id: TechnicianId(id.to_string()),
            name: name.to_string(),
            home_base: "Depot North".to_string(),
            coordinates: Some(near_depot(km)),
            specializations: skills.iter().map(|s| s.to_string()).collect(),
            open_orders: open,
            max_concurrent_orders: 8,
            schedule: standard_shift(),
            performance: Some(PerformanceSnapshot {
                completion_rate: perf,
                sla_adherence: perf,
            }),
        }
    };

    vec![
        technician("tech-a", "Avery Brooks", &["electrical"], 5.0, 1, 0.82),
        technician("tech-b", "Blair Chen", &["electrical", "hvac"], 9.0, 3, 0.91),
        technician("tech-c", "Casey Dunn", &[], 3.0, 0, 0.74),
        technician("tech-d", "Drew Ellis", &["tires", "brakes"], -2.0, 2, 0.88),
    ]
}

fn seed_rules() -> Vec<AssignmentRule> {
    vec![
        AssignmentRule {
            id: "rule-specialist".to_string(),
            name: "Specialist dispatch".to_string(),
            active: true,
            priority: 1,
            weights: ScoreWeights {
                availability: 30,
                specialization: 30,
                proximity: 20,
                workload: 10,
                performance: 10,
            },
            max_distance_km: Some(15.0),
            require_specialization_match: true,
            respect_max_concurrent_orders: true,
            allowed_locations: None,
            allowed_service_categories: None,
            priority_levels: None,
            fallback_action: FallbackAction::NotifyManager,
            fallback_user_id: None,
        },
        AssignmentRule {
            id: "rule-urgent-anyone".to_string(),
            name: "Urgent catch-all".to_string(),
            active: true,
            priority: 5,
            weights: ScoreWeights {
                availability: 40,
                specialization: 10,
                proximity: 30,
                workload: 10,
                performance: 10,
            },
            max_distance_km: Some(40.0),
            require_specialization_match: false,
            respect_max_concurrent_orders: true,
            allowed_locations: None,
            allowed_service_categories: None,
            priority_levels: Some(vec![WorkOrderPriority::Urgent]),
            fallback_action: FallbackAction::Escalate,
            fallback_user_id: Some("dispatch-supervisor".to_string()),
        },
        AssignmentRule {
            id: "rule-overflow-queue".to_string(),
            name: "Overflow queue".to_string(),
            active: true,
            priority: 9,
            weights: ScoreWeights {
                availability: 50,
                specialization: 20,
                proximity: 10,
                workload: 10,
                performance: 10,
            },
            max_distance_km: None,
            require_specialization_match: false,
            respect_max_concurrent_orders: true,
            allowed_locations: None,
            allowed_service_categories: None,
            priority_levels: None,
            fallback_action: FallbackAction::Queue,
            fallback_user_id: None,
        },
    ]
}
