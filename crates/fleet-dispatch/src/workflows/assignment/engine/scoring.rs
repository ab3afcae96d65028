use chrono::{DateTime, Utc};

use super::super::domain::{PerformanceSnapshot, Technician};

/// Midpoint awarded when a factor has no data to score against. Never zero:
/// new technicians and unmapped sites must not be penalized outright.
pub(crate) const NEUTRAL_SCORE: f64 = 50.0;

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Capacity headroom gated by the technician's working window. Off-shift
/// technicians score zero regardless of load.
pub(crate) fn availability_score(technician: &Technician, now: DateTime<Utc>) -> f64 {
    if !technician.schedule.on_shift(now) {
        return 0.0;
    }

    if technician.max_concurrent_orders == 0 {
        return NEUTRAL_SCORE;
    }

    let load = technician.open_orders as f64 / technician.max_concurrent_orders as f64;
    clamp_score(100.0 * (1.0 - load))
}

const SPECIALIZATION_EXACT: f64 = 100.0;
const SPECIALIZATION_GENERALIST: f64 = 40.0;
const SPECIALIZATION_MISMATCH: f64 = 20.0;

/// Exact category match scores highest; a generalist with no declared
/// specializations beats a specialist in the wrong trade.
pub(crate) fn specialization_score(technician: &Technician, service_category: &str) -> f64 {
    if technician
        .specializations
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(service_category))
    {
        SPECIALIZATION_EXACT
    } else if technician.specializations.is_empty() {
        SPECIALIZATION_GENERALIST
    } else {
        SPECIALIZATION_MISMATCH
    }
}

/// Linear decay of two points per kilometer. Unknown distance (either side
/// lacks coordinates) scores the neutral midpoint; the hard distance
/// constraint is enforced separately during selection.
pub(crate) fn proximity_score(distance_km: Option<f64>) -> f64 {
    match distance_km {
        Some(distance) => clamp_score(100.0 - 2.0 * distance),
        None => NEUTRAL_SCORE,
    }
}

/// Open-order count relative to the evaluated pool's average. A technician at
/// exactly the pool average scores 50; underloaded technicians score higher.
pub(crate) fn workload_score(open_orders: u32, pool_average: f64) -> f64 {
    if pool_average <= 0.0 {
        return 100.0;
    }

    clamp_score(100.0 - 50.0 * (open_orders as f64 / pool_average))
}

/// Mean of completion rate and SLA adherence, scaled to 0..=100. Missing
/// history defaults to the neutral midpoint.
pub(crate) fn performance_score(performance: Option<&PerformanceSnapshot>) -> f64 {
    match performance {
        Some(snapshot) => {
            let completion = snapshot.completion_rate.clamp(0.0, 1.0);
            let sla = snapshot.sla_adherence.clamp(0.0, 1.0);
            clamp_score((completion + sla) / 2.0 * 100.0)
        }
        None => NEUTRAL_SCORE,
    }
}
