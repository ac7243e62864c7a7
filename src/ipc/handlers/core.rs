use crate::api::ApiClient;
use crate::config::normalize_base_url;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::session::{Credentials, SessionUser};
use serde_json::json;
use std::path::PathBuf;

pub const SETTING_API_BASE: &str = "api.baseUrl";
pub const SETTING_SESSION_TIMEOUT: &str = "session.timeoutMinutes";
pub const SETTING_SESSION_TOKEN: &str = "session.token";
pub const SETTING_SESSION_USER: &str = "session.user";

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "apiBaseUrl": state.config.api_base_url,
            "signedIn": state.session.credentials().is_present(),
            "openPaymentFlows": state.wizards.len(),
        }),
    )
}

/// Point the client at a new backend. The old client stays if this fails.
pub fn rebuild_api(state: &mut AppState, base_url: &str) -> anyhow::Result<()> {
    let mut cfg = state.config.clone();
    cfg.api_base_url = normalize_base_url(base_url);
    let api = ApiClient::from_config(&cfg)?;
    state.config = cfg;
    state.api = api;
    tracing::info!(base_url = %state.config.api_base_url, "api client configured");
    Ok(())
}

fn apply_workspace_settings(state: &mut AppState) -> anyhow::Result<()> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(());
    };
    let base = db::settings_get_string(conn, SETTING_API_BASE)?;
    let timeout = db::settings_get_json(conn, SETTING_SESSION_TIMEOUT)?.and_then(|v| v.as_i64());
    let token = db::settings_get_string(conn, SETTING_SESSION_TOKEN)?;
    let user: Option<SessionUser> = db::settings_get_json(conn, SETTING_SESSION_USER)?
        .and_then(|v| serde_json::from_value(v).ok());

    if let Some(base) = base {
        rebuild_api(state, &base)?;
    }
    if let Some(mins) = timeout {
        state.config.session_timeout_mins = mins.max(1);
        state.session.set_timeout_minutes(mins);
    }
    if let Some(token) = token {
        state
            .session
            .sign_in(Credentials::bearer(token), user, chrono::Utc::now());
    }
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            // A bad stored setting must not prevent the workspace from opening.
            if let Err(e) = apply_workspace_settings(state) {
                tracing::warn!(error = %e, "ignoring workspace settings");
            }
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "apiBaseUrl": state.config.api_base_url,
                    "signedIn": state.session.credentials().is_present(),
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let c = &state.config;
    ok(
        &req.id,
        json!({
            "apiBaseUrl": c.api_base_url,
            "httpTimeoutSecs": c.http_timeout.as_secs(),
            "upiVpa": c.upi_vpa,
            "upiPayeeName": c.upi_payee_name,
            "qrEndpoint": c.qr_endpoint,
            "sessionTimeoutMinutes": c.session_timeout_mins,
        }),
    )
}

fn handle_config_set_api_base(state: &mut AppState, req: &Request) -> serde_json::Value {
    let base = match get_required_str(&req.params, "apiBaseUrl") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if url::Url::parse(&base).is_err() {
        return err(&req.id, "bad_params", format!("invalid url: {base}"), None);
    }
    if let Err(e) = rebuild_api(state, &base) {
        return err(&req.id, "config_failed", e.to_string(), None);
    }
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = db::settings_set_json(conn, SETTING_API_BASE, &json!(state.config.api_base_url)) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    ok(&req.id, json!({ "apiBaseUrl": state.config.api_base_url }))
}

fn handle_config_set_session_timeout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(mins) = req.params.get("minutes").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing minutes", None);
    };
    if mins < 1 {
        return err(&req.id, "bad_params", "minutes must be at least 1", None);
    }
    state.config.session_timeout_mins = mins;
    state.session.set_timeout_minutes(mins);
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = db::settings_set_json(conn, SETTING_SESSION_TIMEOUT, &json!(mins)) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    ok(&req.id, json!({ "sessionTimeoutMinutes": mins }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "config.setApiBase" => Some(handle_config_set_api_base(state, req)),
        "config.setSessionTimeout" => Some(handle_config_set_session_timeout(state, req)),
        _ => None,
    }
}
