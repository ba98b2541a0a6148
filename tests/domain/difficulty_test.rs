use cyoa_server::domain::DifficultyProfile;

fn rising() -> DifficultyProfile {
    DifficultyProfile::new("rising", &[0.0, 0.1, 0.2, 0.4, 0.8]).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn given_curve_points_when_at_quarter_marks_then_probability_matches_point() {
    let profile = rising();

    assert_close(profile.death_probability(0, 10), 0.0);
    assert_close(profile.death_probability(5, 10), 0.2);
    assert_close(profile.death_probability(10, 10), 0.8);
}

#[test]
fn given_turn_between_points_when_computing_probability_then_interpolates_linearly() {
    let profile = rising();

    assert_close(profile.death_probability(3, 10), 0.12);
    assert_close(profile.death_probability(9, 10), 0.64);
}

#[test]
fn given_turn_past_game_length_when_computing_probability_then_clamped_to_last_point() {
    assert_close(rising().death_probability(14, 10), 0.8);
}

#[test]
fn given_certain_death_curve_when_first_turn_then_never_ends() {
    let profile = DifficultyProfile::new("certain", &[1.0; 5]).unwrap();

    assert!(!profile.should_end(1, 10, 0.0));
    assert!(profile.should_end(2, 10, 0.99));
}

#[test]
fn given_roll_above_probability_when_deciding_then_survives() {
    let profile = rising();

    assert!(!profile.should_end(5, 10, 0.5));
    assert!(profile.should_end(5, 10, 0.1));
}

#[test]
fn given_wrong_number_of_points_when_creating_profile_then_rejected() {
    assert!(DifficultyProfile::new("short", &[0.1, 0.2]).is_err());
}

#[test]
fn given_point_outside_unit_interval_when_creating_profile_then_rejected() {
    assert!(DifficultyProfile::new("broken", &[0.0, 0.1, 1.5, 0.2, 0.3]).is_err());
}
