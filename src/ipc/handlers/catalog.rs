use crate::api::models::Student;
use crate::api::{StudentFilter, SubjectFilter};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{get_bool, get_opt_str};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::{json, Value};

const DEFAULT_ROSTER_LIMIT: u32 = 1000;

fn student_filter(params: &Value) -> StudentFilter {
    StudentFilter {
        branch: get_opt_str(params, "branch"),
        semester: get_opt_str(params, "semester"),
        limit: params
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| n.min(u64::from(u32::MAX)) as u32)
            .or(Some(DEFAULT_ROSTER_LIMIT)),
    }
}

/// Case-insensitive match on Regd No (prefix) or name (substring).
pub fn matches_student(s: &Student, query: &str) -> bool {
    let q = query.trim().to_ascii_lowercase();
    if q.is_empty() {
        return true;
    }
    s.regd_no.to_ascii_lowercase().starts_with(&q) || s.name.to_ascii_lowercase().contains(&q)
}

fn handle_branches_list(state: &mut AppState, req: &Request) -> Value {
    match state.api.branches(state.session.credentials()) {
        Ok(branches) => {
            state.session.touch(Utc::now());
            ok(&req.id, json!({ "branches": branches }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> Value {
    let filter = student_filter(&req.params);
    match state.api.students(state.session.credentials(), &filter) {
        Ok(students) => {
            state.session.touch(Utc::now());
            ok(
                &req.id,
                json!({ "students": students, "count": students.len() }),
            )
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_students_search(state: &mut AppState, req: &Request) -> Value {
    let Some(query) = req.params.get("query").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing query", None);
    };
    let filter = student_filter(&req.params);
    match state.api.students(state.session.credentials(), &filter) {
        Ok(students) => {
            state.session.touch(Utc::now());
            let hits: Vec<&Student> = students
                .iter()
                .filter(|s| matches_student(s, query))
                .collect();
            ok(&req.id, json!({ "students": hits, "count": hits.len() }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> Value {
    let filter = SubjectFilter {
        branch: get_opt_str(&req.params, "branch"),
        semester: get_opt_str(&req.params, "semester"),
        active_only: get_bool(&req.params, "activeOnly", true),
    };
    match state.api.subjects(state.session.credentials(), &filter) {
        Ok(subjects) => {
            state.session.touch(Utc::now());
            ok(&req.id, json!({ "subjects": subjects }))
        }
        Err(e) => api_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "branches.list" => Some(handle_branches_list(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        _ => None,
    }
}
