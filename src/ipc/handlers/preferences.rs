use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const SETTING_THEME: &str = "ui.theme";

fn current_theme(state: &AppState) -> anyhow::Result<String> {
    let Some(conn) = state.db.as_ref() else {
        return Ok("light".to_string());
    };
    Ok(match db::settings_get_string(conn, SETTING_THEME)?.as_deref() {
        Some("dark") => "dark".to_string(),
        _ => "light".to_string(),
    })
}

fn store_theme(state: &AppState, req: &Request, theme: &str) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = db::settings_set_json(conn, SETTING_THEME, &json!(theme)) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "theme": theme, "darkMode": theme == "dark" }))
}

fn handle_theme_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match current_theme(state) {
        Ok(theme) => ok(&req.id, json!({ "darkMode": theme == "dark", "theme": theme })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_theme_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let next = match current_theme(state) {
        Ok(t) if t == "dark" => "light",
        Ok(_) => "dark",
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    store_theme(state, req, next)
}

fn handle_theme_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    match req.params.get("theme").and_then(|v| v.as_str()) {
        Some(t @ ("light" | "dark")) => store_theme(state, req, t),
        _ => err(&req.id, "bad_params", "theme must be light or dark", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ui.theme.get" => Some(handle_theme_get(state, req)),
        "ui.theme.toggle" => Some(handle_theme_toggle(state, req)),
        "ui.theme.set" => Some(handle_theme_set(state, req)),
        _ => None,
    }
}
