use chrono::{DateTime, Utc};

use super::super::domain::{Technician, WorkOrder};
use super::super::rules::AssignmentRule;
use super::scoring;
use super::{CandidateEvaluation, ScoreBreakdown};

/// A rule whose allow-listed priority levels exclude the work order is
/// skipped entirely for this evaluation.
pub(crate) fn rule_applies(rule: &AssignmentRule, work_order: &WorkOrder) -> bool {
    match &rule.priority_levels {
        Some(levels) => levels.contains(&work_order.priority),
        None => true,
    }
}

/// Build the candidate pool for one rule: apply the location and service
/// category allow-lists, then truncate to `max_candidates` keeping
/// nearest-first (unknown distance sorts last, ties by ascending technician
/// id). The truncation order is deterministic because the kept set is
/// user-observable through `candidates_evaluated`.
pub(crate) fn candidate_pool<'a>(
    rule: &AssignmentRule,
    work_order: &WorkOrder,
    technicians: &'a [Technician],
    max_candidates: usize,
) -> Vec<&'a Technician> {
    let mut pool: Vec<&Technician> = technicians
        .iter()
        .filter(|technician| {
            if let Some(locations) = &rule.allowed_locations {
                if !locations
                    .iter()
                    .any(|location| location.eq_ignore_ascii_case(&technician.home_base))
                {
                    return false;
                }
            }

            if let Some(categories) = &rule.allowed_service_categories {
                if !technician.specializations.iter().any(|specialization| {
                    categories
                        .iter()
                        .any(|category| category.eq_ignore_ascii_case(specialization))
                }) {
                    return false;
                }
            }

            true
        })
        .collect();

    let site = work_order.coordinates;
    pool.sort_by(|a, b| {
        let da = a.distance_to(site.as_ref());
        let db = b.distance_to(site.as_ref());
        match (da, db) {
            (Some(da), Some(db)) => da
                .partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        }
    });

    pool.truncate(max_candidates);
    pool
}

/// Score one candidate and apply the rule's hard constraints. Constraint
/// failures mark the candidate ineligible with a reason rather than merely
/// lowering the score.
pub(crate) fn evaluate_candidate(
    rule: &AssignmentRule,
    work_order: &WorkOrder,
    technician: &Technician,
    pool_average_load: f64,
    now: DateTime<Utc>,
) -> CandidateEvaluation {
    let distance_km = technician.distance_to(work_order.coordinates.as_ref());

    let scores = ScoreBreakdown {
        availability: scoring::availability_score(technician, now),
        specialization: scoring::specialization_score(technician, &work_order.service_category),
        proximity: scoring::proximity_score(distance_km),
        workload: scoring::workload_score(technician.open_orders, pool_average_load),
        performance: scoring::performance_score(technician.performance.as_ref()),
    };
    let total_score = scores.weighted_total(&rule.weights);

    let mut evaluation = CandidateEvaluation {
        technician_id: technician.id.clone(),
        technician_name: technician.name.clone(),
        scores,
        total_score,
        distance_km,
        eligible: true,
        reason: format!("scored {total_score:.1}"),
    };

    if let (Some(max_distance), Some(distance)) = (rule.max_distance_km, distance_km) {
        if distance > max_distance {
            evaluation.eligible = false;
            evaluation.reason =
                format!("excluded: {distance:.1} km exceeds max distance {max_distance:.1} km");
            return evaluation;
        }
    }

    if rule.require_specialization_match
        && !technician
            .specializations
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(&work_order.service_category))
    {
        evaluation.eligible = false;
        evaluation.reason = format!(
            "excluded: no '{}' specialization",
            work_order.service_category
        );
        return evaluation;
    }

    if rule.respect_max_concurrent_orders && technician.at_capacity() {
        evaluation.eligible = false;
        evaluation.reason = format!(
            "excluded: at capacity ({}/{})",
            technician.open_orders, technician.max_concurrent_orders
        );
        return evaluation;
    }

    evaluation
}

/// Pick the eligible candidate with the highest composite score. Ties break
/// by ascending technician id so repeated runs on identical inputs always
/// select the same winner.
pub(crate) fn select_winner(candidates: &[CandidateEvaluation]) -> Option<&CandidateEvaluation> {
    candidates
        .iter()
        .filter(|candidate| candidate.eligible)
        .max_by(|a, b| {
            a.total_score
                .partial_cmp(&b.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.technician_id.cmp(&a.technician_id))
        })
}
