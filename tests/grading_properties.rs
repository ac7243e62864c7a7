#[path = "../src/grading.rs"]
mod grading;

use grading::{compute, grade_for_percentage, percentage, Grade, ResultStatus, SubjectRow};

fn row(marks: f64, max: Option<f64>, credits: Option<f64>) -> SubjectRow {
    SubjectRow {
        marks_obtained: marks,
        max_marks: max,
        credits,
        ..SubjectRow::default()
    }
}

#[test]
fn percentage_stays_within_bounds_for_any_marks() {
    let marks = [-50.0, -0.5, 0.0, 0.1, 33.0, 49.99, 50.0, 99.5, 100.0, 250.0, f64::NAN];
    let maxes = [0.0, -10.0, 1.0, 3.0, 40.0, 50.0, 100.0, 150.0];
    for m in marks {
        for max in maxes {
            let p = percentage(m, max);
            assert!((0.0..=100.0).contains(&p), "percentage({m}, {max}) = {p}");
        }
    }
}

#[test]
fn every_band_edge_maps_to_the_expected_grade() {
    let cases = [
        (100.0, Grade::O, 10),
        (90.0, Grade::O, 10),
        (89.99, Grade::E, 9),
        (80.0, Grade::E, 9),
        (79.99, Grade::A, 8),
        (70.0, Grade::A, 8),
        (69.99, Grade::B, 7),
        (60.0, Grade::B, 7),
        (59.99, Grade::C, 6),
        (50.0, Grade::C, 6),
        (49.99, Grade::D, 5),
        (40.0, Grade::D, 5),
        (39.99, Grade::F, 0),
        (0.0, Grade::F, 0),
    ];
    for (pct, grade, point) in cases {
        assert_eq!(grade_for_percentage(pct), (grade, point), "at {pct}%");
    }
}

#[test]
fn grade_points_never_increase_as_percentage_drops() {
    let mut last = 10u8;
    let mut pct = 100.0;
    while pct >= 0.0 {
        let (_, point) = grade_for_percentage(pct);
        assert!(point <= last, "point rose to {point} at {pct}%");
        last = point;
        pct -= 0.25;
    }
}

#[test]
fn sgpa_is_bounded_and_order_independent() {
    let rows = vec![
        row(91.0, None, Some(4.0)),
        row(72.0, Some(80.0), Some(3.0)),
        row(12.0, Some(25.0), Some(2.0)),
        row(38.0, None, None),
        row(64.0, None, Some(1.0)),
    ];
    let sheet = compute(&rows);
    assert!((0.0..=10.0).contains(&sheet.sgpa));

    let mut rotated = rows.clone();
    rotated.rotate_left(2);
    assert_eq!(compute(&rotated).sgpa, sheet.sgpa);
}

#[test]
fn status_fails_exactly_when_some_row_is_f() {
    let passing = compute(&[row(40.0, None, None), row(95.0, None, None)]);
    assert_eq!(passing.status, ResultStatus::Pass);

    let failing = compute(&[row(40.0, None, None), row(39.0, None, None)]);
    assert_eq!(failing.status, ResultStatus::Fail);
    assert!(failing.rows.iter().any(|r| r.grade == Grade::F));
}

#[test]
fn recomputing_a_sheet_is_stable() {
    let rows = vec![row(45.0, Some(50.0), Some(4.0)), row(55.0, None, Some(3.0))];
    assert_eq!(compute(&rows), compute(&rows));
}

#[test]
fn mixed_sheet_matches_hand_calculation() {
    // (4 * 10 + 3 * 6) / 7 = 8.2857...
    let sheet = compute(&[row(95.0, Some(100.0), Some(4.0)), row(55.0, Some(100.0), Some(3.0))]);
    assert_eq!(sheet.rows[0].grade, Grade::O);
    assert_eq!(sheet.rows[1].grade, Grade::C);
    assert_eq!(sheet.sgpa, 8.29);
    assert_eq!(sheet.status, ResultStatus::Pass);
}
