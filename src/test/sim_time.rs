use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime(u64::MAX) + SimTime(1), SimTime::MAX);
}

#[test]
fn countdown_subtraction_floors_at_zero() {
    assert_eq!(SimTime(5).saturating_sub(SimTime(9)), SimTime::ZERO);
    assert!(SimTime(5).saturating_sub(SimTime(5)).is_zero());
    assert_eq!(SimTime(9).saturating_mul(3), SimTime(27));
    assert_eq!(SimTime(34).to_string(), "34us");
}
