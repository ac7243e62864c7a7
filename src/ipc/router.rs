use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

fn dispatch(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::session::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::preferences::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::dashboard::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::catalog::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::examination::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::payments::try_handle(state, req) {
        return Some(resp);
    }
    if let Some(resp) = handlers::finance::try_handle(state, req) {
        return Some(resp);
    }
    None
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let span = tracing::info_span!("request", id = %req.id, method = %req.method);
    let _guard = span.enter();

    let resp = dispatch(state, &req).unwrap_or_else(|| {
        err(
            &req.id,
            "not_implemented",
            format!("unknown method: {}", req.method),
            None,
        )
    });

    match resp.get("error").and_then(|e| e.get("code")).and_then(|c| c.as_str()) {
        Some(code) => tracing::info!(code, "request failed"),
        None => tracing::debug!("request ok"),
    }
    resp
}
