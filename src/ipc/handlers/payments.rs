use crate::api::models::CustomPaymentRequest;
use crate::db::{self, PaymentAttempt};
use crate::export;
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_str, parse_param};
use crate::ipc::types::{AppState, OpenWizard, Request};
use crate::payment::{self, Payee, Receipt};
use crate::wizard::{PaymentOrder, PaymentWizard, WizardOutcome, WizardStep};
use chrono::{Local, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Flows untouched for this long are dropped on the next wizard call.
const WIZARD_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

fn new_order_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("ORD-{}", &raw[..12])
}

fn wizard_view(state: &AppState, wizard_id: &str, w: &PaymentWizard) -> Value {
    let payee = Payee {
        vpa: state.config.upi_vpa.clone(),
        name: state.config.upi_payee_name.clone(),
    };
    let link = payment::upi_link(&payee, w.order());
    let qr = payment::qr_image_url(&state.config.qr_endpoint, &link).ok();
    json!({
        "wizardId": wizard_id,
        "step": w.step().as_str(),
        "order": w.order(),
        "amountText": payment::format_amount(w.order().amount),
        "upiLink": link,
        "qrImageUrl": qr,
        "canGoBack": w.step() == WizardStep::Qr && !w.is_finished(),
        "canCancel": w.step() != WizardStep::Transaction && !w.is_finished(),
        "outcome": w.outcome(),
        "lastError": w.last_error(),
    })
}

fn record_attempt(
    state: &AppState,
    order: &PaymentOrder,
    outcome: &str,
    step: WizardStep,
    transaction_id: Option<String>,
    message: Option<String>,
    receipt_number: Option<String>,
) {
    let Some(conn) = state.db.as_ref() else {
        tracing::debug!(order_id = %order.order_id, outcome, "no workspace; attempt not recorded");
        return;
    };
    let attempt = PaymentAttempt {
        id: Uuid::new_v4().to_string(),
        order_id: order.order_id.clone(),
        student_name: order.student_name.clone(),
        amount: order.amount,
        outcome: outcome.to_string(),
        step: step.as_str().to_string(),
        transaction_id,
        message,
        receipt_number,
        created_at: Utc::now().to_rfc3339(),
    };
    if let Err(e) = db::insert_payment_attempt(conn, &attempt) {
        tracing::warn!(error = %e, "failed to record payment attempt");
    }
}

fn stale_wizard_ids(
    wizards: &HashMap<String, OpenWizard>,
    now: Instant,
    ttl: Duration,
) -> Vec<String> {
    wizards
        .iter()
        .filter(|(_, w)| now.saturating_duration_since(w.touched) >= ttl)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Drop a flow. Unfinished ones are logged as abandoned.
fn discard_wizard(state: &mut AppState, wizard_id: &str) -> Option<PaymentWizard> {
    let open = state.wizards.remove(wizard_id)?;
    let w = open.wizard;
    if !w.is_finished() {
        let message = w.last_error().map(str::to_string);
        record_attempt(state, w.order(), "abandoned", w.step(), None, message, None);
    }
    Some(w)
}

fn prune_idle_wizards(state: &mut AppState, now: Instant) {
    for id in stale_wizard_ids(&state.wizards, now, WIZARD_IDLE_TTL) {
        if discard_wizard(state, &id).is_some() {
            tracing::info!(wizard_id = %id, "idle payment flow dropped");
        }
    }
}

fn open_wizard<'a>(
    state: &'a mut AppState,
    req: &Request,
    id: &str,
) -> Result<&'a mut PaymentWizard, Value> {
    match state.wizards.get_mut(id) {
        Some(open) => {
            open.touched = Instant::now();
            Ok(&mut open.wizard)
        }
        None => Err(err(&req.id, "not_found", "payment flow not found", None)),
    }
}

fn view_of(state: &AppState, req: &Request, id: &str) -> Value {
    match state.wizards.get(id) {
        Some(open) => ok(&req.id, wizard_view(state, id, &open.wizard)),
        None => err(&req.id, "not_found", "payment flow not found", None),
    }
}

fn handle_wizard_start(state: &mut AppState, req: &Request) -> Value {
    let mut order: PaymentOrder = match parse_param(&req.params, "order") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    order.order_id = order.order_id.trim().to_string();
    if order.order_id.is_empty() {
        order.order_id = new_order_id();
    }
    if order.student_name.trim().is_empty() {
        return err(&req.id, "bad_params", "order.studentName is required", None);
    }
    if !order.amount.is_finite() || order.amount <= 0.0 {
        return err(&req.id, "bad_params", "order.amount must be positive", None);
    }

    let wizard_id = Uuid::new_v4().to_string();
    let wizard = PaymentWizard::new(order);
    tracing::info!(wizard_id = %wizard_id, order_id = %wizard.order().order_id, "payment flow started");
    let view = wizard_view(state, &wizard_id, &wizard);
    state
        .wizards
        .insert(wizard_id, OpenWizard::new(wizard, Instant::now()));
    ok(&req.id, view)
}

fn wizard_id(req: &Request) -> Result<String, Value> {
    get_required_str(&req.params, "wizardId").map_err(|e| e.response(&req.id))
}

fn step_action(
    state: &mut AppState,
    req: &Request,
    action: fn(&mut PaymentWizard) -> Result<WizardStep, crate::wizard::WizardError>,
) -> Value {
    let id = match wizard_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let w = match open_wizard(state, req, &id) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let from = w.step();
    if let Err(e) = action(w) {
        return err(
            &req.id,
            e.code(),
            e.to_string(),
            Some(json!({ "step": from.as_str() })),
        );
    }
    tracing::debug!(wizard_id = %id, from = from.as_str(), to = w.step().as_str(), "wizard step");
    view_of(state, req, &id)
}

fn handle_wizard_cancel(state: &mut AppState, req: &Request) -> Value {
    let id = match wizard_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let w = match open_wizard(state, req, &id) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let step = w.step();
    if let Err(e) = w.cancel() {
        return err(&req.id, e.code(), e.to_string(), Some(json!({ "step": step.as_str() })));
    }
    let order = w.order().clone();
    tracing::info!(wizard_id = %id, order_id = %order.order_id, at = step.as_str(), "payment flow cancelled");
    record_attempt(state, &order, "cancelled", step, None, None, None);
    match state.wizards.remove(&id) {
        Some(open) => ok(&req.id, wizard_view(state, &id, &open.wizard)),
        None => err(&req.id, "not_found", "payment flow not found", None),
    }
}

fn handle_wizard_submit(state: &mut AppState, req: &Request) -> Value {
    let id = match wizard_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let raw_txn = req
        .params
        .get("transactionId")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let w = match open_wizard(state, req, &id) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    // Guard runs first; nothing is sent when it fails.
    let transaction_id = match w.begin_submit(raw_txn) {
        Ok(t) => t,
        Err(e) => {
            return err(
                &req.id,
                e.code(),
                e.to_string(),
                Some(json!({ "step": w.step().as_str() })),
            )
        }
    };

    let order = w.order().clone();
    let body = CustomPaymentRequest {
        order_id: order.order_id.clone(),
        transaction_id: transaction_id.clone(),
        amount: order.amount,
        student_name: order.student_name.clone(),
        regd_no: order.regd_no.clone(),
        payment_method: "upi",
    };
    match state.api.submit_custom_payment(state.session.credentials(), &body) {
        Ok(ack) => {
            let receipt_number = ack
                .receipt_number
                .clone()
                .unwrap_or_else(|| payment::receipt_number(&order.order_id, &transaction_id));
            if let Some(open) = state.wizards.get_mut(&id) {
                open.wizard.record_acceptance(
                    transaction_id.clone(),
                    ack.message.clone(),
                    Some(receipt_number.clone()),
                );
            }
            state.session.touch(Utc::now());
            tracing::info!(wizard_id = %id, order_id = %order.order_id, "payment submitted for verification");
            record_attempt(
                state,
                &order,
                "submitted",
                WizardStep::Transaction,
                Some(transaction_id),
                ack.message,
                Some(receipt_number),
            );
            view_of(state, req, &id)
        }
        Err(e) => {
            let message = e.user_message();
            if let Some(open) = state.wizards.get_mut(&id) {
                open.wizard.record_rejection(message.clone());
            }
            tracing::info!(wizard_id = %id, code = e.code(), "payment submission rejected");
            record_attempt(
                state,
                &order,
                "rejected",
                WizardStep::Transaction,
                Some(transaction_id),
                Some(message),
                None,
            );
            api_err(&req.id, &e)
        }
    }
}

fn handle_wizard_get(state: &mut AppState, req: &Request) -> Value {
    let id = match wizard_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(open) = state.wizards.get_mut(&id) {
        open.touched = Instant::now();
    }
    view_of(state, req, &id)
}

/// The shell is done with a flow (receipt printed, dialog dismissed).
fn handle_wizard_close(state: &mut AppState, req: &Request) -> Value {
    let id = match wizard_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match discard_wizard(state, &id) {
        Some(w) => {
            tracing::debug!(wizard_id = %id, finished = w.is_finished(), "payment flow closed");
            ok(&req.id, json!({ "closed": true, "openFlows": state.wizards.len() }))
        }
        None => ok(&req.id, json!({ "closed": false, "openFlows": state.wizards.len() })),
    }
}

fn handle_receipt(state: &mut AppState, req: &Request) -> Value {
    let id = match wizard_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(w) = state.wizards.get(&id).map(|open| &open.wizard) else {
        return err(&req.id, "not_found", "payment flow not found", None);
    };
    let Some(WizardOutcome::Succeeded {
        transaction_id,
        receipt_number,
        ..
    }) = w.outcome()
    else {
        return err(
            &req.id,
            "payment_incomplete",
            "a receipt is only available after the payment is submitted",
            None,
        );
    };
    let now = Local::now();
    let receipt = Receipt::for_order(w.order(), transaction_id, receipt_number.clone(), now, now);
    let html = receipt.to_html();

    let path = get_opt_str(&req.params, "outPath").map(PathBuf::from);
    if let Some(p) = path.as_ref() {
        if let Err(e) = export::write_bytes(p, html.as_bytes()) {
            return err(
                &req.id,
                "export_failed",
                e.to_string(),
                Some(json!({ "path": p.to_string_lossy() })),
            );
        }
    }
    ok(
        &req.id,
        json!({
            "receiptNumber": receipt.receipt_number,
            "html": html,
            "path": path.map(|p| p.to_string_lossy().to_string()),
        }),
    )
}

fn handle_payment_result(state: &mut AppState, req: &Request) -> Value {
    let order_id = match get_required_str(&req.params, "orderId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match state.api.payment_result(state.session.credentials(), &order_id) {
        Ok(v) => {
            state.session.touch(Utc::now());
            ok(&req.id, json!({ "result": v }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_attempts(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "attempts": [] }));
    };
    let order_id = get_opt_str(&req.params, "orderId");
    match db::list_payment_attempts(conn, order_id.as_deref()) {
        Ok(attempts) => ok(&req.id, json!({ "attempts": attempts })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    if req.method.starts_with("payments.wizard.") {
        prune_idle_wizards(state, Instant::now());
    }
    match req.method.as_str() {
        "payments.wizard.start" => Some(handle_wizard_start(state, req)),
        "payments.wizard.proceed" => Some(step_action(state, req, PaymentWizard::proceed)),
        "payments.wizard.continue" => Some(step_action(
            state,
            req,
            PaymentWizard::continue_to_transaction,
        )),
        "payments.wizard.back" => Some(step_action(state, req, PaymentWizard::back)),
        "payments.wizard.cancel" => Some(handle_wizard_cancel(state, req)),
        "payments.wizard.submit" => Some(handle_wizard_submit(state, req)),
        "payments.wizard.get" => Some(handle_wizard_get(state, req)),
        "payments.wizard.close" => Some(handle_wizard_close(state, req)),
        "payments.receipt" => Some(handle_receipt(state, req)),
        "payments.result" => Some(handle_payment_result(state, req)),
        "payments.attempts" => Some(handle_attempts(state, req)),
        _ => None,
    }
}
