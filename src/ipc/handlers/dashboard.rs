use crate::dashboard::{self, DashboardKind};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::{json, Value};

fn commit(state: &mut AppState, req: &Request, kind: DashboardKind, generation: u64, body: Value) -> Value {
    let loaded_at = Utc::now().to_rfc3339();
    let snapshot = json!({
        "kind": kind.as_str(),
        "generation": generation,
        "loadedAt": loaded_at,
        "view": body,
    });
    let applied = state.refresh.commit(kind, generation, snapshot.clone());
    let mut out = snapshot;
    out["applied"] = json!(applied);
    ok(&req.id, out)
}

fn any_ok(view: &Value) -> bool {
    view.as_object()
        .map(|o| o.values().any(|s| s["ok"] == json!(true)))
        .unwrap_or(false)
}

fn handle_head_admin(state: &mut AppState, req: &Request) -> Value {
    let generation = state.refresh.begin(DashboardKind::HeadAdmin);
    let view = dashboard::load_head_admin(&state.api, state.session.credentials()).to_json();
    if any_ok(&view) {
        state.session.touch(Utc::now());
    }
    commit(state, req, DashboardKind::HeadAdmin, generation, view)
}

fn handle_faculty(state: &mut AppState, req: &Request) -> Value {
    let generation = state.refresh.begin(DashboardKind::Faculty);
    let view = dashboard::load_faculty(&state.api, state.session.credentials()).to_json();
    if any_ok(&view) {
        state.session.touch(Utc::now());
    }
    commit(state, req, DashboardKind::Faculty, generation, view)
}

fn handle_finance(state: &mut AppState, req: &Request) -> Value {
    let generation = state.refresh.begin(DashboardKind::Finance);
    let loaded = dashboard::load_finance(&state.api, state.session.credentials());
    let view = loaded.to_json();
    if let Ok(payments) = loaded.payments {
        state.finance_payments = Some(payments);
    }
    if any_ok(&view) {
        state.session.touch(Utc::now());
    }
    commit(state, req, DashboardKind::Finance, generation, view)
}

fn handle_snapshot(state: &mut AppState, req: &Request) -> Value {
    let Some(kind) = req
        .params
        .get("kind")
        .and_then(|v| v.as_str())
        .and_then(DashboardKind::parse)
    else {
        return err(
            &req.id,
            "bad_params",
            "kind must be headAdmin, faculty or finance",
            None,
        );
    };
    match state.refresh.snapshot(kind) {
        Some((_, snap)) => ok(&req.id, snap.clone()),
        None => ok(&req.id, json!({ "kind": kind.as_str(), "view": null })),
    }
}

fn handle_admin_users(state: &mut AppState, req: &Request) -> Value {
    match state.api.admin_users(state.session.credentials()) {
        Ok(users) => {
            state.session.touch(Utc::now());
            ok(&req.id, json!({ "users": users }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "dashboard.headAdmin" => Some(handle_head_admin(state, req)),
        "dashboard.faculty" => Some(handle_faculty(state, req)),
        "dashboard.finance" => Some(handle_finance(state, req)),
        "dashboard.snapshot" => Some(handle_snapshot(state, req)),
        "admin.users" => Some(handle_admin_users(state, req)),
        _ => None,
    }
}
