use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential handed to every API call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Self::anonymous();
        }
        Self {
            token: Some(token.to_string()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.token.is_some()
    }
}

// Never print the token itself.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub signed_in: bool,
    pub user: Option<SessionUser>,
    pub timeout_minutes: i64,
    pub last_activity_at: Option<String>,
    pub expires_at: Option<String>,
    pub remaining_seconds: i64,
    pub expired: bool,
}

/// Signed-in state for the dashboard shell. Idle time is measured from the
/// last authenticated backend call.
#[derive(Debug, Clone)]
pub struct Session {
    credentials: Credentials,
    user: Option<SessionUser>,
    last_activity: Option<DateTime<Utc>>,
    timeout: Duration,
}

impl Session {
    pub fn new(timeout_minutes: i64) -> Self {
        Self {
            credentials: Credentials::anonymous(),
            user: None,
            last_activity: None,
            timeout: Duration::minutes(timeout_minutes.max(1)),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn set_timeout_minutes(&mut self, minutes: i64) {
        self.timeout = Duration::minutes(minutes.max(1));
    }

    pub fn sign_in(&mut self, credentials: Credentials, user: Option<SessionUser>, now: DateTime<Utc>) {
        self.credentials = credentials;
        self.user = user;
        self.last_activity = Some(now);
    }

    pub fn sign_out(&mut self) {
        self.credentials = Credentials::anonymous();
        self.user = None;
        self.last_activity = None;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.credentials.is_present() {
            self.last_activity = Some(now);
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        let signed_in = self.credentials.is_present();
        let expires_at = self.last_activity.map(|t| t + self.timeout);
        let remaining_seconds = match expires_at {
            Some(exp) if signed_in => (exp - now).num_seconds().max(0),
            _ => 0,
        };
        SessionStatus {
            signed_in,
            user: self.user.clone(),
            timeout_minutes: self.timeout.num_minutes(),
            last_activity_at: self.last_activity.map(|t| t.to_rfc3339()),
            expires_at: expires_at.map(|t| t.to_rfc3339()),
            remaining_seconds,
            expired: signed_in && remaining_seconds == 0,
        }
    }
}
