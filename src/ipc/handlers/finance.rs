use crate::api::models::{Payment, PaymentStats, PaymentStatus};
use crate::export::{self, ExportFormat};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;

pub fn filter_payments(
    payments: Vec<Payment>,
    status: Option<PaymentStatus>,
    search: Option<&str>,
) -> Vec<Payment> {
    let needle = search.map(|s| s.trim().to_ascii_lowercase()).unwrap_or_default();
    payments
        .into_iter()
        .filter(|p| status.map(|s| p.status == s).unwrap_or(true))
        .filter(|p| {
            needle.is_empty()
                || p.student_name.to_ascii_lowercase().contains(&needle)
                || p.order_id.to_ascii_lowercase().contains(&needle)
                || p
                    .regd_no
                    .as_deref()
                    .map(|r| r.to_ascii_lowercase().contains(&needle))
                    .unwrap_or(false)
                || p
                    .transaction_id
                    .as_deref()
                    .map(|t| t.to_ascii_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}

fn handle_payments(state: &mut AppState, req: &Request) -> Value {
    let status = match get_opt_str(&req.params, "status") {
        None => None,
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => match PaymentStatus::parse(&s) {
            Some(v) => Some(v),
            None => return err(&req.id, "bad_params", format!("unknown status: {s}"), None),
        },
    };
    let search = get_opt_str(&req.params, "search");

    let payments = match state.api.finance_payments(state.session.credentials()) {
        Ok(v) => v,
        Err(e) => return api_err(&req.id, &e),
    };
    state.session.touch(Utc::now());
    let shown = filter_payments(payments, status, search.as_deref());
    let summary = PaymentStats::from_payments(&shown);
    let out = json!({ "payments": shown, "summary": summary });
    state.finance_payments = Some(shown);
    ok(&req.id, out)
}

fn handle_stats(state: &mut AppState, req: &Request) -> Value {
    match state.api.finance_stats(state.session.credentials()) {
        Ok(stats) => {
            state.session.touch(Utc::now());
            ok(&req.id, json!({ "stats": stats }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_export_payments(state: &mut AppState, req: &Request) -> Value {
    let out_path = match get_required_str(&req.params, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };
    let format = match get_opt_str(&req.params, "format") {
        None => ExportFormat::Xlsx,
        Some(f) => match ExportFormat::parse(&f) {
            Some(v) => v,
            None => return err(&req.id, "bad_params", format!("unsupported format: {f}"), None),
        },
    };
    let Some(payments) = state.finance_payments.as_ref() else {
        return err(
            &req.id,
            "nothing_to_export",
            "load the payments list before exporting",
            None,
        );
    };
    match export::export_payments(&out_path, format, payments) {
        Ok(rows) => {
            tracing::info!(rows, export_format = format.as_str(), "payments exported");
            ok(
                &req.id,
                json!({
                    "path": out_path.to_string_lossy(),
                    "format": format.as_str(),
                    "rowsExported": rows,
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "export_failed",
            e.to_string(),
            Some(json!({ "path": out_path.to_string_lossy() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "finance.payments" => Some(handle_payments(state, req)),
        "finance.stats" => Some(handle_stats(state, req)),
        "finance.exportPayments" => Some(handle_export_payments(state, req)),
        _ => None,
    }
}
