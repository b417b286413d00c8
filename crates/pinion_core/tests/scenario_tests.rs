//! End-to-end scenario fixtures: replay a named move list, then check
//! one piece's relational data against a hand-computed snapshot.

use pinion_core::fixtures::Scenario;

fn run(json: &str) {
    let scenario = Scenario::from_json(json).unwrap();
    let state = scenario.replay().unwrap();
    let mismatches = scenario.verify(&state).unwrap();
    assert!(
        mismatches.is_empty(),
        "{}: {}",
        scenario.name,
        mismatches.join("; ")
    );
}

#[test]
fn knight_development_snapshot() {
    run(include_str!("fixtures/knight_development.json"));
}

#[test]
fn pinned_bishop_snapshot() {
    run(include_str!("fixtures/pinned_bishop.json"));
}

#[test]
fn double_check_snapshot() {
    run(include_str!("fixtures/double_check.json"));
}

#[test]
fn double_check_is_mate_without_interception_logic() {
    let scenario =
        Scenario::from_json(include_str!("fixtures/double_check.json")).unwrap();
    let state = scenario.replay().unwrap();
    assert!(state.is_checkmate(pinion_core::piece::Side::Black));
}

#[test]
fn compute_tokens_need_a_selector_aware_runner() {
    let scenario = Scenario::from_json(
        r#"{
            "name": "needs a selector",
            "first_turn": "W",
            "moves": ["compute"],
            "subject": "WK",
            "expect": {}
        }"#,
    )
    .unwrap();
    assert!(scenario.replay().is_err());
}

#[test]
fn snapshot_mismatches_are_reported_not_swallowed() {
    let scenario = Scenario::from_json(
        r#"{
            "name": "wrong on purpose",
            "first_turn": "W",
            "moves": [],
            "subject": "WKP",
            "expect": { "legals": ["e3"] }
        }"#,
    )
    .unwrap();
    let state = scenario.replay().unwrap();
    let mismatches = scenario.verify(&state).unwrap();
    assert_eq!(mismatches.len(), 1);
    assert!(mismatches[0].starts_with("legals:"));
}
