use crate::db;
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::handlers::core::{SETTING_SESSION_TOKEN, SETTING_SESSION_USER};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::session::{Credentials, SessionUser};
use chrono::Utc;
use serde_json::json;

fn persist_session(state: &AppState, token: &str, user: Option<&SessionUser>) -> anyhow::Result<()> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(());
    };
    db::settings_set_json(conn, SETTING_SESSION_TOKEN, &json!(token))?;
    match user {
        Some(u) => db::settings_set_json(conn, SETTING_SESSION_USER, &serde_json::to_value(u)?)?,
        None => db::settings_delete(conn, SETTING_SESSION_USER)?,
    }
    Ok(())
}

fn status_json(state: &AppState) -> serde_json::Value {
    serde_json::to_value(state.session.status(Utc::now())).unwrap_or_else(|_| json!({}))
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match get_required_str(&req.params, "email") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let password = match req.params.get("password").and_then(|v| v.as_str()) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return err(&req.id, "bad_params", "missing password", None),
    };

    let login = match state.api.login(&email, &password) {
        Ok(d) => d.data,
        Err(e) => {
            tracing::info!(code = e.code(), "login failed");
            return api_err(&req.id, &e);
        }
    };
    let creds = Credentials::bearer(&login.token);
    if !creds.is_present() {
        return err(&req.id, "schema_mismatch", "login response carried an empty token", None);
    }
    state.session.sign_in(creds, login.user.clone(), Utc::now());
    if let Err(e) = persist_session(state, &login.token, login.user.as_ref()) {
        tracing::warn!(error = %e, "session not persisted");
    }
    tracing::info!("signed in");
    ok(&req.id, status_json(state))
}

/// Adopt a token obtained elsewhere (e.g. the shell's own login page).
fn handle_set_token(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = match get_required_str(&req.params, "token") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let user: Option<SessionUser> = req
        .params
        .get("user")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    // Stay signed out unless the token is stored.
    if let Err(e) = persist_session(state, &token, user.as_ref()) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    state
        .session
        .sign_in(Credentials::bearer(&token), user, Utc::now());
    ok(&req.id, status_json(state))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.sign_out();
    state.finance_payments = None;
    if let Some(conn) = state.db.as_ref() {
        let cleared = db::settings_delete(conn, SETTING_SESSION_TOKEN)
            .and_then(|_| db::settings_delete(conn, SETTING_SESSION_USER));
        if let Err(e) = cleared {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    ok(&req.id, status_json(state))
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, status_json(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.setToken" => Some(handle_set_token(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.status" => Some(handle_status(state, req)),
        _ => None,
    }
}
