use anyhow::Context;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:5000";
pub const DEFAULT_QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SESSION_TIMEOUT_MINS: i64 = 30;

/// Process configuration. Workspace settings may override some of these once a
/// workspace is selected.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub upi_vpa: String,
    pub upi_payee_name: String,
    pub qr_endpoint: String,
    pub session_timeout_mins: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            upi_vpa: "college@upi".to_string(),
            upi_payee_name: "College Accounts".to_string(),
            qr_endpoint: DEFAULT_QR_ENDPOINT.to_string(),
            session_timeout_mins: DEFAULT_SESSION_TIMEOUT_MINS,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        if let Some(v) = env_string("COLLEGEDESK_API_BASE") {
            cfg.api_base_url = normalize_base_url(&v);
        }
        if let Some(v) = env_string("COLLEGEDESK_HTTP_TIMEOUT_SECS") {
            let secs: u64 = v
                .parse()
                .with_context(|| format!("invalid COLLEGEDESK_HTTP_TIMEOUT_SECS: {v}"))?;
            cfg.http_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(v) = env_string("COLLEGEDESK_UPI_VPA") {
            cfg.upi_vpa = v;
        }
        if let Some(v) = env_string("COLLEGEDESK_UPI_PAYEE") {
            cfg.upi_payee_name = v;
        }
        if let Some(v) = env_string("COLLEGEDESK_QR_ENDPOINT") {
            cfg.qr_endpoint = v;
        }
        if let Some(v) = env_string("COLLEGEDESK_SESSION_TIMEOUT_MINS") {
            let mins: i64 = v
                .parse()
                .with_context(|| format!("invalid COLLEGEDESK_SESSION_TIMEOUT_MINS: {v}"))?;
            cfg.session_timeout_mins = mins.max(1);
        }
        Ok(cfg)
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
