//! Backend payload schemas. Required fields are required: a payload missing
//! them fails decoding with a path instead of turning into an empty default.

use crate::grading::{GradedRow, ResultSheet, SubjectRow};
use crate::session::SessionUser;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrText {
    Num(f64),
    Text(String),
}

/// Semesters arrive as `3` or `"3"` depending on the endpoint.
fn de_opt_semester<'de, D>(d: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumOrText> = Option::deserialize(d)?;
    match raw {
        None => Ok(None),
        Some(NumOrText::Num(n)) if n.fract() == 0.0 && (0.0..=255.0).contains(&n) => {
            Ok(Some(n as u8))
        }
        Some(NumOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumOrText::Text(s)) => s
            .trim()
            .parse::<u8>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid semester {s:?}"))),
        Some(NumOrText::Num(n)) => Err(serde::de::Error::custom(format!("invalid semester {n}"))),
    }
}

/// Reference fields are either a bare id or a populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(String),
    Populated {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Id(id) => id,
            EntityRef::Populated { id, .. } => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            EntityRef::Id(_) => None,
            EntityRef::Populated { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "registrationNumber", alias = "regNo")]
    pub regd_no: String,
    #[serde(default)]
    pub branch: Option<EntityRef>,
    #[serde(default, deserialize_with = "de_opt_semester")]
    pub semester: Option<u8>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cgpa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub credits: Option<f64>,
    #[serde(default)]
    pub max_marks: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_semester")]
    pub semester: Option<u8>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Subject {
    pub fn blank_row(&self) -> SubjectRow {
        SubjectRow::blank(
            Some(self.id.clone()),
            self.name.clone(),
            self.code.clone(),
            self.credits,
            self.max_marks,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadAdminStats {
    pub total_students: u64,
    pub total_faculty: u64,
    pub total_branches: u64,
    #[serde(default)]
    pub total_subjects: Option<u64>,
    #[serde(default)]
    pub total_revenue: Option<f64>,
    #[serde(default)]
    pub pending_payments: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyOverview {
    pub total_students: u64,
    pub total_subjects: u64,
    #[serde(default)]
    pub results_published: u64,
    #[serde(default)]
    pub results_pending: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[serde(alias = "completed", alias = "verified", alias = "paid")]
    Success,
    #[serde(alias = "rejected")]
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "success" | "completed" | "verified" | "paid" => Some(PaymentStatus::Success),
            "failed" | "rejected" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(alias = "_id")]
    pub id: String,
    pub order_id: String,
    pub student_name: String,
    #[serde(default, alias = "registrationNumber")]
    pub regd_no: Option<String>,
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub verified_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total_amount: f64,
    pub total_payments: u64,
    #[serde(default)]
    pub successful_payments: u64,
    #[serde(default)]
    pub pending_payments: u64,
    #[serde(default)]
    pub failed_payments: u64,
}

impl PaymentStats {
    /// Totals over a locally held list, used when filtering client-side.
    pub fn from_payments(payments: &[Payment]) -> Self {
        let mut stats = PaymentStats {
            total_amount: 0.0,
            total_payments: payments.len() as u64,
            successful_payments: 0,
            pending_payments: 0,
            failed_payments: 0,
        };
        for p in payments {
            match p.status {
                PaymentStatus::Success => {
                    stats.successful_payments += 1;
                    stats.total_amount += p.amount;
                }
                PaymentStatus::Pending => stats.pending_payments += 1,
                PaymentStatus::Failed | PaymentStatus::Cancelled => stats.failed_payments += 1,
            }
        }
        stats.total_amount = crate::grading::round_2(stats.total_amount);
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubject {
    #[serde(default)]
    pub subject: Option<EntityRef>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    pub marks_obtained: f64,
    #[serde(default)]
    pub max_marks: Option<f64>,
    #[serde(default)]
    pub credits: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub grade_point: Option<f64>,
}

impl ResultSubject {
    pub fn to_row(&self) -> SubjectRow {
        let populated_name = self.subject.as_ref().and_then(|s| s.name()).map(str::to_string);
        let populated_code = match self.subject.as_ref() {
            Some(EntityRef::Populated { code, .. }) => code.clone(),
            _ => None,
        };
        SubjectRow {
            subject_id: self.subject.as_ref().map(|s| s.id().to_string()),
            name: self.name.clone().or(populated_name).unwrap_or_default(),
            code: self.code.clone().or(populated_code).unwrap_or_default(),
            marks_obtained: self.marks_obtained,
            max_marks: self.max_marks,
            credits: self.credits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub student: Option<EntityRef>,
    #[serde(default, deserialize_with = "de_opt_semester")]
    pub semester: Option<u8>,
    #[serde(default)]
    pub academic_year: Option<String>,
    pub subjects: Vec<ResultSubject>,
    #[serde(default)]
    pub sgpa: Option<f64>,
    #[serde(default)]
    pub cgpa: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "published")]
    pub is_published: Option<bool>,
}

impl StudentResult {
    pub fn rows(&self) -> Vec<SubjectRow> {
        self.subjects.iter().map(ResultSubject::to_row).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultSubject {
    pub subject: Option<String>,
    pub name: String,
    pub code: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub grade: &'static str,
    pub grade_point: u8,
    pub credits: f64,
}

impl From<&GradedRow> for SaveResultSubject {
    fn from(r: &GradedRow) -> Self {
        Self {
            subject: r.subject_id.clone(),
            name: r.name.clone(),
            code: r.code.clone(),
            marks_obtained: r.marks_obtained,
            max_marks: r.max_marks,
            percentage: r.percentage,
            grade: r.grade.as_str(),
            grade_point: r.grade_point,
            credits: r.credits,
        }
    }
}

/// Body of `POST /api/results`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultRequest {
    pub student_id: String,
    pub semester: u8,
    pub academic_year: String,
    pub subjects: Vec<SaveResultSubject>,
    pub sgpa: f64,
    pub status: &'static str,
}

impl SaveResultRequest {
    pub fn new(student_id: String, semester: u8, academic_year: String, sheet: &ResultSheet) -> Self {
        Self {
            student_id,
            semester,
            academic_year,
            subjects: sheet.rows.iter().map(SaveResultSubject::from).collect(),
            sgpa: sheet.sgpa,
            status: sheet.status.as_str(),
        }
    }
}

/// Cohort selector shared by publish/unpublish and export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSelector {
    pub branch_id: String,
    pub semester: String,
    pub academic_year: String,
}

impl ClassSelector {
    /// All three filters must be non-empty before anything is sent.
    pub fn new(branch_id: &str, semester: &str, academic_year: &str) -> Option<Self> {
        let (b, s, y) = (branch_id.trim(), semester.trim(), academic_year.trim());
        if b.is_empty() || s.is_empty() || y.is_empty() {
            return None;
        }
        Some(Self {
            branch_id: b.to_string(),
            semester: s.to_string(),
            academic_year: y.to_string(),
        })
    }

    pub fn query(&self) -> Vec<(String, String)> {
        vec![
            ("branchId".to_string(), self.branch_id.clone()),
            ("semester".to_string(), self.semester.clone()),
            ("academicYear".to_string(), self.academic_year.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    #[serde(default, alias = "modifiedCount", alias = "count")]
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

/// Body of `POST /api/payments/custom-payment`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPaymentRequest {
    pub order_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub student_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regd_no: Option<String>,
    pub payment_method: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub order_id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
