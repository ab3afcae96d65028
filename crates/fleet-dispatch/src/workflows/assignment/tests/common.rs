use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};

use crate::workflows::assignment::audit::AssignmentLog;
use crate::workflows::assignment::domain::{
    GeoPoint, PerformanceSnapshot, Technician, TechnicianId, WorkOrder, WorkOrderId,
    WorkOrderPriority, WorkOrderStatus, WorkSchedule,
};
use crate::workflows::assignment::repository::{
    AssignmentAlert, AssignmentRepository, AssignmentWrite, NotificationError,
    NotificationPublisher, RepositoryError,
};
use crate::workflows::assignment::rules::{AssignmentRule, FallbackAction, ScoreWeights};
use crate::workflows::assignment::service::AssignmentService;
use crate::workflows::assignment::settings::AutoAssignmentSettings;

/// Wednesday 15:00 UTC, inside the default business hours.
pub(super) fn clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 11, 15, 0, 0)
        .single()
        .expect("valid test instant")
}

pub(super) fn site() -> GeoPoint {
    GeoPoint::new(41.5868, -93.6250)
}

/// A point roughly `km` kilometers due north of `base`.
pub(super) fn offset_km(base: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint::new(base.latitude + km / 111.1949, base.longitude)
}

pub(super) fn all_week() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
}

pub(super) fn day_shift() -> WorkSchedule {
    WorkSchedule {
        shift_start: NaiveTime::from_hms_opt(6, 0, 0).expect("valid"),
        shift_end: NaiveTime::from_hms_opt(22, 0, 0).expect("valid"),
        working_days: all_week(),
    }
}

pub(super) fn settings() -> AutoAssignmentSettings {
    AutoAssignmentSettings::default()
}

/// The worked example rule: weights 30/30/20/10/10, 15 km radius, strict
/// specialization match.
pub(super) fn electrical_rule() -> AssignmentRule {
    AssignmentRule {
        id: "rule-electrical".to_string(),
        name: "Electrical dispatch".to_string(),
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
    }
}

pub(super) fn work_order() -> WorkOrder {
    WorkOrder {
        id: WorkOrderId("wo-1001".to_string()),
        status: WorkOrderStatus::Pending,
        priority: WorkOrderPriority::High,
        service_category: "electrical".to_string(),
        location_name: "Depot North".to_string(),
        coordinates: Some(site()),
        assigned_technician: None,
    }
}

pub(super) fn technician(
    id: &str,
    name: &str,
    specializations: &[&str],
    coordinates: Option<GeoPoint>,
    open_orders: u32,
) -> Technician {
    Technician {
        id: TechnicianId(id.to_string()),
        name: name.to_string(),
        home_base: "Depot North".to_string(),
        coordinates,
        specializations: specializations.iter().map(|s| s.to_string()).collect(),
        open_orders,
        max_concurrent_orders: 10,
        schedule: day_shift(),
        performance: Some(PerformanceSnapshot {
            completion_rate: 0.8,
            sla_adherence: 0.8,
        }),
    }
}

/// Worked-example roster: an in-range electrician, an out-of-range
/// electrician, and a nearby generalist. All carry one open order so the
/// pool average stays at 1.0.
pub(super) fn example_roster() -> Vec<Technician> {
    vec![
        technician(
            "tech-a",
            "Avery Brooks",
            &["electrical"],
            Some(offset_km(site(), 5.0)),
            1,
        ),
        technician(
            "tech-b",
            "Blair Chen",
            &["electrical"],
            Some(offset_km(site(), 20.0)),
            1,
        ),
        technician("tech-c", "Casey Dunn", &[], Some(offset_km(site(), 3.0)), 1),
    ]
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) work_orders: Mutex<HashMap<WorkOrderId, WorkOrder>>,
    pub(super) technicians: Mutex<Vec<Technician>>,
    pub(super) rules: Mutex<Vec<AssignmentRule>>,
    pub(super) logs: Mutex<Vec<AssignmentLog>>,
    pub(super) queued: Mutex<Vec<WorkOrderId>>,
}

impl MemoryRepository {
    pub(super) fn seeded(
        work_order: WorkOrder,
        technicians: Vec<Technician>,
        rules: Vec<AssignmentRule>,
    ) -> Self {
        let repository = Self::default();
        repository
            .work_orders
            .lock()
            .expect("work order mutex poisoned")
            .insert(work_order.id.clone(), work_order);
        *repository
            .technicians
            .lock()
            .expect("technician mutex poisoned") = technicians;
        *repository.rules.lock().expect("rule mutex poisoned") = rules;
        repository
    }

    pub(super) fn logs(&self) -> Vec<AssignmentLog> {
        self.logs.lock().expect("log mutex poisoned").clone()
    }

    pub(super) fn queued_ids(&self) -> Vec<WorkOrderId> {
        self.queued.lock().expect("queue mutex poisoned").clone()
    }

    pub(super) fn stored_work_order(&self, id: &WorkOrderId) -> Option<WorkOrder> {
        self.work_orders
            .lock()
            .expect("work order mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl AssignmentRepository for MemoryRepository {
    fn work_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        Ok(self
            .work_orders
            .lock()
            .expect("work order mutex poisoned")
            .get(id)
            .cloned())
    }

    fn technicians(&self) -> Result<Vec<Technician>, RepositoryError> {
        Ok(self
            .technicians
            .lock()
            .expect("technician mutex poisoned")
            .clone())
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
        self.queued
            .lock()
            .expect("queue mutex poisoned")
            .push(id.clone());
        Ok(())
    }
}

/// Read-through repository whose conditional write always loses the race.
pub(super) struct RacingRepository {
    pub(super) inner: MemoryRepository,
    pub(super) winner: TechnicianId,
}

impl AssignmentRepository for RacingRepository {
    fn work_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        self.inner.work_order(id)
    }

    fn technicians(&self) -> Result<Vec<Technician>, RepositoryError> {
        self.inner.technicians()
    }

    fn active_rules(&self) -> Result<Vec<AssignmentRule>, RepositoryError> {
        self.inner.active_rules()
    }

    fn assign_if_unassigned(
        &self,
        _id: &WorkOrderId,
        _technician: &TechnicianId,
    ) -> Result<AssignmentWrite, RepositoryError> {
        Ok(AssignmentWrite::Superseded {
            current_assignee: self.winner.clone(),
        })
    }

    fn insert_log(&self, log: AssignmentLog) -> Result<(), RepositoryError> {
        self.inner.insert_log(log)
    }

    fn logs_for(&self, id: &WorkOrderId) -> Result<Vec<AssignmentLog>, RepositoryError> {
        self.inner.logs_for(id)
    }

    fn enqueue_for_reassignment(&self, id: &WorkOrderId) -> Result<(), RepositoryError> {
        self.inner.enqueue_for_reassignment(id)
    }
}

/// Delegating repository whose technician reads stall long enough to trip a
/// zero-millisecond evaluation budget.
pub(super) struct SlowRepository {
    pub(super) inner: MemoryRepository,
}

impl AssignmentRepository for SlowRepository {
    fn work_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        self.inner.work_order(id)
    }

    fn technicians(&self) -> Result<Vec<Technician>, RepositoryError> {
        std::thread::sleep(std::time::Duration::from_millis(5));
        self.inner.technicians()
    }

    fn active_rules(&self) -> Result<Vec<AssignmentRule>, RepositoryError> {
        self.inner.active_rules()
    }

    fn assign_if_unassigned(
        &self,
        id: &WorkOrderId,
        technician: &TechnicianId,
    ) -> Result<AssignmentWrite, RepositoryError> {
        self.inner.assign_if_unassigned(id, technician)
    }

    fn insert_log(&self, log: AssignmentLog) -> Result<(), RepositoryError> {
        self.inner.insert_log(log)
    }

    fn logs_for(&self, id: &WorkOrderId) -> Result<Vec<AssignmentLog>, RepositoryError> {
        self.inner.logs_for(id)
    }

    fn enqueue_for_reassignment(&self, id: &WorkOrderId) -> Result<(), RepositoryError> {
        self.inner.enqueue_for_reassignment(id)
    }
}

pub(super) struct UnavailableRepository;

impl AssignmentRepository for UnavailableRepository {
    fn work_order(&self, _id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn technicians(&self) -> Result<Vec<Technician>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn active_rules(&self) -> Result<Vec<AssignmentRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assign_if_unassigned(
        &self,
        _id: &WorkOrderId,
        _technician: &TechnicianId,
    ) -> Result<AssignmentWrite, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_log(&self, _log: AssignmentLog) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn logs_for(&self, _id: &WorkOrderId) -> Result<Vec<AssignmentLog>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn enqueue_for_reassignment(&self, _id: &WorkOrderId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<AssignmentAlert>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<AssignmentAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, alert: AssignmentAlert) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn publish(&self, _alert: AssignmentAlert) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    AssignmentService<MemoryRepository, MemoryNotifier>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(MemoryRepository::seeded(
        work_order(),
        example_roster(),
        vec![electrical_rule()],
    ));
    let notifier = Arc::new(MemoryNotifier::default());
    let service = AssignmentService::new(repository.clone(), notifier.clone());
    (service, repository, notifier)
}
