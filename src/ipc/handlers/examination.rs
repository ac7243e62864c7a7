use crate::api::models::{ClassSelector, SaveResultRequest};
use crate::api::SubjectFilter;
use crate::export;
use crate::grading::{self, ResultSheet, SubjectRow};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_semester, get_required_str, parse_param, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;

fn sheet_json(sheet: &ResultSheet) -> Value {
    serde_json::to_value(sheet).unwrap_or_else(|_| json!({}))
}

fn class_selector(params: &Value) -> Result<ClassSelector, HandlerErr> {
    let text = |key: &str| get_opt_str(params, key).unwrap_or_default();
    ClassSelector::new(&text("branchId"), &text("semester"), &text("academicYear")).ok_or_else(
        || HandlerErr::bad_params("branchId, semester and academicYear are all required"),
    )
}

fn handle_grades_compute(_state: &mut AppState, req: &Request) -> Value {
    let rows: Vec<SubjectRow> = match parse_param(&req.params, "rows") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    ok(&req.id, sheet_json(&grading::compute(&rows)))
}

/// Zero-mark sheet for every active catalog subject of a branch/semester.
fn handle_results_draft(state: &mut AppState, req: &Request) -> Value {
    let branch = match get_required_str(&req.params, "branch") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let semester = match get_required_str(&req.params, "semester") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let filter = SubjectFilter {
        branch: Some(branch),
        semester: Some(semester),
        active_only: true,
    };
    match state.api.subjects(state.session.credentials(), &filter) {
        Ok(subjects) => {
            state.session.touch(Utc::now());
            let rows: Vec<SubjectRow> = subjects.iter().map(|s| s.blank_row()).collect();
            ok(&req.id, sheet_json(&grading::compute(&rows)))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_results_load(state: &mut AppState, req: &Request) -> Value {
    let student_id = match get_required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match state.api.student_result(state.session.credentials(), &student_id) {
        Ok(Some(saved)) => {
            state.session.touch(Utc::now());
            let sheet = grading::compute(&saved.rows());
            ok(
                &req.id,
                json!({
                    "found": true,
                    "semester": saved.semester,
                    "academicYear": saved.academic_year,
                    "published": saved.is_published.unwrap_or(false),
                    "cgpa": saved.cgpa,
                    "sheet": sheet_json(&sheet),
                }),
            )
        }
        Ok(None) => {
            state.session.touch(Utc::now());
            ok(&req.id, json!({ "found": false, "sheet": null }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_results_save(state: &mut AppState, req: &Request) -> Value {
    let student_id = match get_required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let semester = match get_required_semester(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let academic_year = match get_required_str(&req.params, "academicYear") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let rows: Vec<SubjectRow> = match parse_param(&req.params, "rows") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if rows.is_empty() {
        return err(&req.id, "bad_params", "a result needs at least one subject", None);
    }

    let sheet = grading::compute(&rows);
    let body = SaveResultRequest::new(student_id.clone(), semester, academic_year, &sheet);
    match state.api.save_result(state.session.credentials(), &body) {
        Ok(saved) => {
            state.session.touch(Utc::now());
            tracing::info!(student_id = %student_id, semester, sgpa = sheet.sgpa, "result saved");
            ok(
                &req.id,
                json!({
                    "saved": true,
                    "message": saved.message.unwrap_or_else(|| "Result saved successfully".to_string()),
                    "sheet": sheet_json(&sheet),
                }),
            )
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_results_delete(state: &mut AppState, req: &Request) -> Value {
    let student_id = match get_required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let semester = match get_required_str(&req.params, "semester") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let academic_year = match get_required_str(&req.params, "academicYear") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match state
        .api
        .delete_result(state.session.credentials(), &student_id, &semester, &academic_year)
    {
        Ok(d) => {
            state.session.touch(Utc::now());
            tracing::info!(student_id = %student_id, semester = %semester, "result deleted");
            ok(
                &req.id,
                json!({
                    "deleted": true,
                    "message": d.message.unwrap_or_else(|| "Result deleted".to_string()),
                }),
            )
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn set_published(state: &mut AppState, req: &Request, publish: bool) -> Value {
    let class = match class_selector(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match state
        .api
        .set_class_published(state.session.credentials(), &class, publish)
    {
        Ok(d) => {
            state.session.touch(Utc::now());
            tracing::info!(
                branch_id = %class.branch_id,
                semester = %class.semester,
                publish,
                updated = d.data.updated,
                "class visibility changed"
            );
            ok(
                &req.id,
                json!({
                    "published": publish,
                    "updated": d.data.updated,
                    "message": d.message,
                }),
            )
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_results_export(state: &mut AppState, req: &Request) -> Value {
    // Checked before anything is sent.
    let class = match class_selector(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let out_path = match get_required_str(&req.params, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };
    let bytes = match state.api.export_results(state.session.credentials(), &class) {
        Ok(b) => b,
        Err(e) => return api_err(&req.id, &e),
    };
    state.session.touch(Utc::now());
    if let Err(e) = export::write_bytes(&out_path, &bytes) {
        return err(
            &req.id,
            "export_failed",
            e.to_string(),
            Some(json!({ "path": out_path.to_string_lossy() })),
        );
    }
    ok(
        &req.id,
        json!({
            "path": out_path.to_string_lossy(),
            "bytes": bytes.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "grades.compute" => Some(handle_grades_compute(state, req)),
        "results.draft" => Some(handle_results_draft(state, req)),
        "results.load" => Some(handle_results_load(state, req)),
        "results.save" => Some(handle_results_save(state, req)),
        "results.delete" => Some(handle_results_delete(state, req)),
        "results.publishClass" => Some(set_published(state, req, true)),
        "results.unpublishClass" => Some(set_published(state, req, false)),
        "results.export" => Some(handle_results_export(state, req)),
        _ => None,
    }
}
