use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_MAX_MARKS: f64 = 100.0;
pub const DEFAULT_CREDITS: f64 = 3.0;

/// Percentage thresholds, evaluated highest first. Lower bounds are inclusive.
const GRADE_BANDS: [(f64, Grade, u8); 6] = [
    (90.0, Grade::O, 10),
    (80.0, Grade::E, 9),
    (70.0, Grade::A, 8),
    (60.0, Grade::B, 7),
    (50.0, Grade::C, 6),
    (40.0, Grade::D, 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    O,
    E,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::O => "O",
            Grade::E => "E",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Pass,
    Fail,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Pass => "Pass",
            ResultStatus::Fail => "Fail",
        }
    }
}

/// Whatever the edit form sent for a numeric cell.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Num(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl LooseNumber {
    fn value(self) -> Option<f64> {
        let n = match self {
            LooseNumber::Num(n) => n,
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok()?,
            LooseNumber::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

/// Null, blank or non-numeric marks count as 0.
fn de_marks<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(LooseNumber::deserialize(d)?.value().unwrap_or(0.0))
}

/// Null or non-numeric values become `None` so the row defaults apply.
fn de_opt_number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(LooseNumber::deserialize(d)?.value())
}

/// One subject line as edited in the examination sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, deserialize_with = "de_marks")]
    pub marks_obtained: f64,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub max_marks: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub credits: Option<f64>,
}

impl SubjectRow {
    /// Fresh row for a catalog subject, with no marks entered yet.
    pub fn blank(
        subject_id: Option<String>,
        name: impl Into<String>,
        code: impl Into<String>,
        credits: Option<f64>,
        max_marks: Option<f64>,
    ) -> Self {
        Self {
            subject_id,
            name: name.into(),
            code: code.into(),
            marks_obtained: 0.0,
            max_marks,
            credits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedRow {
    pub subject_id: Option<String>,
    pub name: String,
    pub code: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub grade: Grade,
    pub grade_point: u8,
    pub credits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSheet {
    pub rows: Vec<GradedRow>,
    pub sgpa: f64,
    pub status: ResultStatus,
    pub total_credits: f64,
}

/// Two-decimal rounding, scaled first so `x.xx5` values do not drift.
pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Missing, zero, negative or non-finite max marks fall back to 100.
fn effective_max(max_marks: Option<f64>) -> f64 {
    match max_marks {
        Some(m) if m.is_finite() && m > 0.0 => m,
        _ => DEFAULT_MAX_MARKS,
    }
}

/// Missing credits fall back to 3. Zero is kept; negatives count as zero.
fn effective_credits(credits: Option<f64>) -> f64 {
    match credits {
        Some(c) if c.is_finite() => c.max(0.0),
        Some(_) => 0.0,
        None => DEFAULT_CREDITS,
    }
}

pub fn clamp_marks(marks: f64, max_marks: f64) -> f64 {
    if !marks.is_finite() {
        return 0.0;
    }
    marks.clamp(0.0, max_marks)
}

pub fn percentage(marks: f64, max_marks: f64) -> f64 {
    let max = effective_max(Some(max_marks));
    let m = clamp_marks(marks, max);
    (m / max * 10000.0).round() / 100.0
}

pub fn grade_for_percentage(pct: f64) -> (Grade, u8) {
    for (threshold, grade, point) in GRADE_BANDS {
        if pct >= threshold {
            return (grade, point);
        }
    }
    (Grade::F, 0)
}

pub fn grade_row(row: &SubjectRow) -> GradedRow {
    let max_marks = effective_max(row.max_marks);
    let marks_obtained = clamp_marks(row.marks_obtained, max_marks);
    let pct = percentage(marks_obtained, max_marks);
    let (grade, grade_point) = grade_for_percentage(pct);
    GradedRow {
        subject_id: row.subject_id.clone(),
        name: row.name.clone(),
        code: row.code.clone(),
        marks_obtained,
        max_marks,
        percentage: pct,
        grade,
        grade_point,
        credits: effective_credits(row.credits),
    }
}

pub fn sgpa(rows: &[GradedRow]) -> f64 {
    let total_credits: f64 = rows.iter().map(|r| r.credits).sum();
    if total_credits <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = rows
        .iter()
        .map(|r| r.credits * f64::from(r.grade_point))
        .sum();
    round_2(weighted / total_credits)
}

pub fn status(rows: &[GradedRow]) -> ResultStatus {
    if rows.iter().any(|r| r.grade == Grade::F) {
        ResultStatus::Fail
    } else {
        ResultStatus::Pass
    }
}

/// Recompute every derived field for a sheet. Input rows are left untouched.
pub fn compute(rows: &[SubjectRow]) -> ResultSheet {
    let graded: Vec<GradedRow> = rows.iter().map(grade_row).collect();
    let total_credits = graded.iter().map(|r| r.credits).sum();
    ResultSheet {
        sgpa: sgpa(&graded),
        status: status(&graded),
        total_credits,
        rows: graded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(marks: f64, max: Option<f64>, credits: Option<f64>) -> SubjectRow {
        SubjectRow {
            marks_obtained: marks,
            max_marks: max,
            credits,
            ..SubjectRow::default()
        }
    }

    #[test]
    fn band_lower_bounds_are_inclusive() {
        assert_eq!(grade_for_percentage(90.0), (Grade::O, 10));
        assert_eq!(grade_for_percentage(89.99), (Grade::E, 9));
        assert_eq!(grade_for_percentage(40.0), (Grade::D, 5));
        assert_eq!(grade_for_percentage(39.99), (Grade::F, 0));
        assert_eq!(grade_for_percentage(0.0), (Grade::F, 0));
    }

    #[test]
    fn percentage_uses_scaled_rounding() {
        assert_eq!(percentage(2.0, 3.0), 66.67);
        assert_eq!(percentage(1.0, 3.0), 33.33);
        assert_eq!(percentage(45.0, 50.0), 90.0);
    }

    #[test]
    fn marks_are_clamped_not_rejected() {
        let sheet = compute(&[row(-5.0, Some(50.0), None), row(120.0, None, None)]);
        assert_eq!(sheet.rows[0].marks_obtained, 0.0);
        assert_eq!(sheet.rows[0].percentage, 0.0);
        assert_eq!(sheet.rows[1].marks_obtained, 100.0);
        assert_eq!(sheet.rows[1].percentage, 100.0);
    }

    #[test]
    fn defaults_apply_per_row() {
        let sheet = compute(&[row(50.0, None, None), row(20.0, Some(40.0), Some(4.0))]);
        assert_eq!(sheet.rows[0].max_marks, 100.0);
        assert_eq!(sheet.rows[0].credits, 3.0);
        assert_eq!(sheet.rows[1].max_marks, 40.0);
        assert_eq!(sheet.rows[1].credits, 4.0);
        assert_eq!(sheet.total_credits, 7.0);
    }

    #[test]
    fn zero_max_marks_falls_back_to_hundred() {
        let g = grade_row(&row(72.0, Some(0.0), None));
        assert_eq!(g.max_marks, 100.0);
        assert_eq!(g.grade, Grade::A);
    }

    #[test]
    fn input_rows_are_not_mutated() {
        let input = vec![row(150.0, None, None)];
        let before = input.clone();
        let _ = compute(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn worked_example_mixed_pass() {
        let sheet = compute(&[row(95.0, Some(100.0), Some(4.0)), row(55.0, Some(100.0), Some(3.0))]);
        let grades: Vec<&str> = sheet.rows.iter().map(|r| r.grade.as_str()).collect();
        assert_eq!(grades, vec!["O", "C"]);
        assert_eq!(sheet.rows[0].percentage, 95.0);
        assert_eq!(sheet.rows[1].percentage, 55.0);
        assert_eq!(sheet.sgpa, 8.29);
        assert_eq!(sheet.status, ResultStatus::Pass);
    }

    #[test]
    fn single_failing_row() {
        let sheet = compute(&[row(30.0, Some(100.0), Some(3.0))]);
        assert_eq!(sheet.rows[0].grade, Grade::F);
        assert_eq!(sheet.rows[0].grade_point, 0);
        assert_eq!(sheet.sgpa, 0.0);
        assert_eq!(sheet.status, ResultStatus::Fail);
    }

    #[test]
    fn empty_sheet_passes_with_zero_sgpa() {
        let sheet = compute(&[]);
        assert!(sheet.rows.is_empty());
        assert_eq!(sheet.sgpa, 0.0);
        assert_eq!(sheet.status, ResultStatus::Pass);
    }

    #[test]
    fn all_zero_credits_gives_zero_sgpa() {
        let sheet = compute(&[row(95.0, None, Some(0.0)), row(85.0, None, Some(0.0))]);
        assert_eq!(sheet.sgpa, 0.0);
    }

    #[test]
    fn form_values_never_fail_to_parse() {
        let rows: Vec<SubjectRow> = serde_json::from_value(serde_json::json!([
            { "name": "Maths", "marksObtained": null },
            { "name": "Physics", "marksObtained": " 85 ", "maxMarks": "100", "credits": "4" },
            { "name": "Lab", "marksObtained": "absent", "maxMarks": null, "credits": "" },
            { "name": "Viva", "marksObtained": true, "maxMarks": "NaN" }
        ]))
        .expect("rows");
        assert_eq!(rows[0].marks_obtained, 0.0);
        assert_eq!(rows[1].marks_obtained, 85.0);
        assert_eq!(rows[1].max_marks, Some(100.0));
        assert_eq!(rows[1].credits, Some(4.0));
        assert_eq!(rows[2].marks_obtained, 0.0);
        assert_eq!(rows[2].max_marks, None);
        assert_eq!(rows[2].credits, None);
        assert_eq!(rows[3].marks_obtained, 0.0);
        assert_eq!(rows[3].max_marks, None);

        let sheet = compute(&rows);
        assert_eq!(sheet.rows[1].grade, Grade::E);
        assert_eq!(sheet.rows[2].credits, 3.0);
    }

    #[test]
    fn sgpa_ignores_row_order() {
        let a = vec![
            row(91.0, None, Some(4.0)),
            row(63.0, None, Some(2.0)),
            row(47.0, Some(60.0), Some(3.0)),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(compute(&a).sgpa, compute(&b).sgpa);
    }
}
