use super::common::*;
use crate::workflows::assignment::domain::PerformanceSnapshot;
use crate::workflows::assignment::engine::scoring::{
    availability_score, performance_score, proximity_score, specialization_score, workload_score,
};
use chrono::{NaiveTime, Weekday};

#[test]
fn availability_is_zero_off_shift() {
    let mut tech = technician("tech-n", "Night Crew", &["electrical"], None, 0);
    tech.schedule.shift_start = NaiveTime::from_hms_opt(22, 0, 0).expect("valid");
    tech.schedule.shift_end = NaiveTime::from_hms_opt(6, 0, 0).expect("valid");

    // clock() is 15:00 UTC, outside the overnight window.
    assert_eq!(availability_score(&tech, clock()), 0.0);
}

#[test]
fn availability_honors_overnight_shift_wrap() {
    let mut tech = technician("tech-n", "Night Crew", &["electrical"], None, 0);
    tech.schedule.shift_start = NaiveTime::from_hms_opt(22, 0, 0).expect("valid");
    tech.schedule.shift_end = NaiveTime::from_hms_opt(6, 0, 0).expect("valid");

    let late = clock() + chrono::Duration::hours(8); // 23:00 UTC
    assert_eq!(availability_score(&tech, late), 100.0);
}

#[test]
fn availability_scales_with_remaining_capacity() {
    let tech = technician("tech-a", "Avery", &["electrical"], None, 1);
    assert_eq!(availability_score(&tech, clock()), 90.0);

    let busy = technician("tech-b", "Blair", &["electrical"], None, 10);
    assert_eq!(availability_score(&busy, clock()), 0.0);
}

#[test]
fn availability_without_capacity_limit_is_neutral() {
    let mut tech = technician("tech-a", "Avery", &["electrical"], None, 4);
    tech.max_concurrent_orders = 0;
    assert_eq!(availability_score(&tech, clock()), 50.0);
}

#[test]
fn specialization_prefers_exact_match_over_generalist() {
    let specialist = technician("tech-a", "Avery", &["electrical"], None, 0);
    let generalist = technician("tech-c", "Casey", &[], None, 0);
    let mismatched = technician("tech-d", "Drew", &["plumbing"], None, 0);

    assert_eq!(specialization_score(&specialist, "electrical"), 100.0);
    assert_eq!(specialization_score(&generalist, "electrical"), 40.0);
    assert_eq!(specialization_score(&mismatched, "electrical"), 20.0);
}

#[test]
fn specialization_match_is_case_insensitive() {
    let specialist = technician("tech-a", "Avery", &["Electrical"], None, 0);
    assert_eq!(specialization_score(&specialist, "electrical"), 100.0);
}

#[test]
fn proximity_decays_linearly_and_clamps() {
    assert_eq!(proximity_score(Some(0.0)), 100.0);
    assert_eq!(proximity_score(Some(5.0)), 90.0);
    assert_eq!(proximity_score(Some(50.0)), 0.0);
    assert_eq!(proximity_score(Some(80.0)), 0.0);
}

#[test]
fn proximity_without_coordinates_is_neutral_not_zero() {
    assert_eq!(proximity_score(None), 50.0);
}

#[test]
fn workload_at_pool_average_is_midpoint() {
    assert_eq!(workload_score(2, 2.0), 50.0);
    assert_eq!(workload_score(0, 2.0), 100.0);
    assert_eq!(workload_score(8, 2.0), 0.0);
}

#[test]
fn workload_with_idle_pool_is_full_score() {
    assert_eq!(workload_score(0, 0.0), 100.0);
}

#[test]
fn performance_averages_completion_and_sla() {
    let snapshot = PerformanceSnapshot {
        completion_rate: 0.9,
        sla_adherence: 0.7,
    };
    assert_eq!(performance_score(Some(&snapshot)), 80.0);
}

#[test]
fn missing_performance_history_defaults_to_midpoint() {
    // New technicians start neutral, never at zero.
    assert_eq!(performance_score(None), 50.0);
}

#[test]
fn out_of_range_performance_data_is_clamped() {
    let snapshot = PerformanceSnapshot {
        completion_rate: 1.4,
        sla_adherence: -0.2,
    };
    assert_eq!(performance_score(Some(&snapshot)), 50.0);
}

#[test]
fn weekday_gate_applies_before_shift_times() {
    let mut tech = technician("tech-a", "Avery", &["electrical"], None, 0);
    tech.schedule.working_days = vec![Weekday::Sat, Weekday::Sun];
    // clock() is a Wednesday.
    assert_eq!(availability_score(&tech, clock()), 0.0);
}
