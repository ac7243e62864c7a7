mod error;
#[cfg(test)]
pub mod fake;
pub mod models;
mod transport;

pub use error::{ApiError, ApiResult};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};

use crate::config::Config;
use crate::session::Credentials;
use models::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

/// A decoded payload plus the envelope's `message`, if any.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub data: T,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub branch: Option<String>,
    pub semester: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectFilter {
    pub branch: Option<String>,
    pub semester: Option<String>,
    pub active_only: bool,
}

fn push_opt(query: &mut Vec<(String, String)>, key: &str, value: Option<&String>) {
    if let Some(v) = value.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        query.push((key.to_string(), v.to_string()));
    }
}

/// `/a/b/{id}` with `id` percent-encoded as a single path segment.
fn endpoint_path(prefix: &[&str], id: &str) -> ApiResult<String> {
    let mut url = url::Url::parse("http://localhost/").map_err(|e| ApiError::Invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::Invalid("base url cannot carry a path".to_string()))?
        .clear()
        .extend(prefix)
        .push(id.trim());
    Ok(url.path().to_string())
}

/// Only objects that look like `{success?, data, message?}` are unwrapped.
fn is_envelope(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("data")
        && (obj.contains_key("success") || obj.keys().all(|k| k == "data" || k == "message"))
}

fn envelope_message(v: &Value) -> Option<String> {
    v.get("message")
        .or_else(|| v.get("error"))
        .and_then(|m| m.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Decode either a bare payload or a `{success, data, message}` envelope.
pub fn decode<T: DeserializeOwned>(endpoint: &str, status: u16, body: &[u8]) -> ApiResult<Decoded<T>> {
    let value: Value = serde_json::from_slice(body).map_err(|e| ApiError::Schema {
        endpoint: endpoint.to_string(),
        path: "$".to_string(),
        detail: format!("body is not JSON: {e}"),
    })?;
    let message = envelope_message(&value);
    if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
        return Err(ApiError::Rejected {
            status,
            message: message.unwrap_or_default(),
        });
    }
    let payload = match value {
        Value::Object(mut obj) if is_envelope(&obj) => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    let data = serde_path_to_error::deserialize(payload).map_err(|e| ApiError::Schema {
        endpoint: endpoint.to_string(),
        path: e.path().to_string(),
        detail: e.inner().to_string(),
    })?;
    Ok(Decoded { data, message })
}

fn error_for_status(status: u16, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| envelope_message(&v))
        .unwrap_or_default();
    if status == 401 || status == 403 {
        ApiError::Unauthorized { status, message }
    } else {
        ApiError::Rejected { status, message }
    }
}

/// Typed access to the college backend. Credentials are passed on every call.
pub struct ApiClient {
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.api_base_url, config.http_timeout)?;
        Ok(Self::new(Box::new(transport)))
    }

    fn send(
        &self,
        creds: &Credentials,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
        require_auth: bool,
    ) -> ApiResult<HttpResponse> {
        if require_auth && !creds.is_present() {
            return Err(ApiError::NotSignedIn);
        }
        let req = HttpRequest {
            method,
            path: path.to_string(),
            query,
            bearer: creds.token().map(str::to_string),
            body,
        };
        let started = Instant::now();
        let resp = match self.transport.send(&req) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(method = method.as_str(), path, error = %e, "backend unreachable");
                return Err(ApiError::Network(e));
            }
        };
        tracing::debug!(
            method = method.as_str(),
            path,
            status = resp.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend call"
        );
        if !resp.is_success() {
            return Err(error_for_status(resp.status, &resp.body));
        }
        Ok(resp)
    }

    fn get<T: DeserializeOwned>(
        &self,
        creds: &Credentials,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ApiResult<Decoded<T>> {
        let resp = self.send(creds, Method::Get, path, query, None, true)?;
        decode(path, resp.status, &resp.body)
    }

    fn post<T: DeserializeOwned>(
        &self,
        creds: &Credentials,
        path: &str,
        body: Value,
        require_auth: bool,
    ) -> ApiResult<Decoded<T>> {
        let resp = self.send(creds, Method::Post, path, Vec::new(), Some(body), require_auth)?;
        decode(path, resp.status, &resp.body)
    }

    pub fn login(&self, email: &str, password: &str) -> ApiResult<Decoded<LoginResponse>> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post(&Credentials::anonymous(), "/api/auth/login", body, false)
    }

    pub fn head_admin_stats(&self, creds: &Credentials) -> ApiResult<HeadAdminStats> {
        Ok(self.get(creds, "/api/dashboard/head-admin", Vec::new())?.data)
    }

    pub fn admin_users(&self, creds: &Credentials) -> ApiResult<Vec<AdminUser>> {
        Ok(self.get(creds, "/api/auth/users", Vec::new())?.data)
    }

    pub fn faculty_overview(&self, creds: &Credentials) -> ApiResult<FacultyOverview> {
        Ok(self.get(creds, "/api/admin/overview", Vec::new())?.data)
    }

    pub fn branches(&self, creds: &Credentials) -> ApiResult<Vec<Branch>> {
        Ok(self.get(creds, "/api/branches", Vec::new())?.data)
    }

    pub fn students(&self, creds: &Credentials, filter: &StudentFilter) -> ApiResult<Vec<Student>> {
        let mut query = Vec::new();
        push_opt(&mut query, "branch", filter.branch.as_ref());
        push_opt(&mut query, "semester", filter.semester.as_ref());
        if let Some(limit) = filter.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        Ok(self.get(creds, "/api/students", query)?.data)
    }

    pub fn subjects(&self, creds: &Credentials, filter: &SubjectFilter) -> ApiResult<Vec<Subject>> {
        let mut query = Vec::new();
        push_opt(&mut query, "branch", filter.branch.as_ref());
        push_opt(&mut query, "semester", filter.semester.as_ref());
        if filter.active_only {
            query.push(("activeOnly".to_string(), "true".to_string()));
        }
        Ok(self.get(creds, "/api/subjects", query)?.data)
    }

    /// `None` when the backend has no result on file for the student.
    pub fn student_result(
        &self,
        creds: &Credentials,
        student_id: &str,
    ) -> ApiResult<Option<StudentResult>> {
        let path = endpoint_path(&["api", "results", "student"], student_id)?;
        match self.get::<Option<StudentResult>>(creds, &path, Vec::new()) {
            Ok(d) => Ok(d.data),
            Err(ApiError::Rejected { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save_result(&self, creds: &Credentials, req: &SaveResultRequest) -> ApiResult<Decoded<Value>> {
        let body = serde_json::to_value(req).map_err(|e| ApiError::Invalid(e.to_string()))?;
        self.post(creds, "/api/results", body, true)
    }

    pub fn delete_result(
        &self,
        creds: &Credentials,
        student_id: &str,
        semester: &str,
        academic_year: &str,
    ) -> ApiResult<Decoded<Value>> {
        let query = vec![
            ("studentId".to_string(), student_id.to_string()),
            ("semester".to_string(), semester.to_string()),
            ("academicYear".to_string(), academic_year.to_string()),
        ];
        let path = "/api/results/by-student";
        let resp = self.send(creds, Method::Delete, path, query, None, true)?;
        if resp.body.is_empty() {
            return Ok(Decoded {
                data: Value::Null,
                message: None,
            });
        }
        decode(path, resp.status, &resp.body)
    }

    pub fn set_class_published(
        &self,
        creds: &Credentials,
        class: &ClassSelector,
        publish: bool,
    ) -> ApiResult<Decoded<PublishSummary>> {
        let path = if publish {
            "/api/results/class/publish"
        } else {
            "/api/results/class/unpublish"
        };
        let body = serde_json::to_value(class).map_err(|e| ApiError::Invalid(e.to_string()))?;
        self.post(creds, path, body, true)
    }

    /// Raw CSV bytes for a cohort.
    pub fn export_results(&self, creds: &Credentials, class: &ClassSelector) -> ApiResult<Vec<u8>> {
        let resp = self.send(
            creds,
            Method::Get,
            "/api/results/export",
            class.query(),
            None,
            true,
        )?;
        Ok(resp.body)
    }

    pub fn submit_custom_payment(
        &self,
        creds: &Credentials,
        req: &CustomPaymentRequest,
    ) -> ApiResult<PaymentAck> {
        let body = serde_json::to_value(req).map_err(|e| ApiError::Invalid(e.to_string()))?;
        let decoded: Decoded<Option<PaymentAck>> =
            self.post(creds, "/api/payments/custom-payment", body, true)?;
        let mut ack = decoded.data.unwrap_or(PaymentAck {
            order_id: None,
            status: None,
            receipt_number: None,
            message: None,
        });
        if ack.message.is_none() {
            ack.message = decoded.message;
        }
        Ok(ack)
    }

    pub fn payment_result(&self, creds: &Credentials, order_id: &str) -> ApiResult<PaymentVerification> {
        let path = endpoint_path(&["api", "payments", "result"], order_id)?;
        Ok(self.get(creds, &path, Vec::new())?.data)
    }

    pub fn finance_payments(&self, creds: &Credentials) -> ApiResult<Vec<Payment>> {
        Ok(self.get(creds, "/api/finance/payments", Vec::new())?.data)
    }

    pub fn finance_stats(&self, creds: &Credentials) -> ApiResult<PaymentStats> {
        Ok(self.get(creds, "/api/finance/payments/stats", Vec::new())?.data)
    }
}
