use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use rusqlite::Connection;
use serde::Deserialize;

use crate::api::models::Payment;
use crate::api::ApiClient;
use crate::config::Config;
use crate::dashboard::RefreshTracker;
use crate::session::Session;
use crate::wizard::PaymentWizard;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A payment flow plus the last time the shell touched it.
pub struct OpenWizard {
    pub wizard: PaymentWizard,
    pub touched: Instant,
}

impl OpenWizard {
    pub fn new(wizard: PaymentWizard, now: Instant) -> Self {
        Self {
            wizard,
            touched: now,
        }
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Config,
    pub api: ApiClient,
    pub session: Session,
    pub refresh: RefreshTracker,
    pub wizards: HashMap<String, OpenWizard>,
    /// Last list loaded for the finance page; exports read from here.
    pub finance_payments: Option<Vec<Payment>>,
}

impl AppState {
    pub fn new(config: Config, api: ApiClient) -> Self {
        let session = Session::new(config.session_timeout_mins);
        Self {
            workspace: None,
            db: None,
            config,
            api,
            session,
            refresh: RefreshTracker::default(),
            wizards: HashMap::new(),
            finance_payments: None,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State wired to an in-memory backend.
    pub fn offline(fake: &crate::api::fake::FakeTransport) -> Self {
        Self::new(Config::default(), ApiClient::new(Box::new(fake.clone())))
    }
}
