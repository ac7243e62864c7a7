use serde_json::json;

mod test_support;

use test_support::{request_err, request_ok, spawn_sidecar, temp_dir, FakeBackend};

fn signed_in(
    backend: &FakeBackend,
) -> (
    std::process::Child,
    std::process::ChildStdin,
    std::io::BufReader<std::process::ChildStdout>,
) {
    let (child, mut stdin, mut reader) = spawn_sidecar(&backend.base_url);
    request_ok(&mut stdin, &mut reader, "tok", "session.setToken", json!({ "token": "tok-fac" }));
    (child, stdin, reader)
}

#[test]
fn save_posts_recomputed_grades() {
    let backend = FakeBackend::start();
    backend.route(
        "POST",
        "/api/results",
        201,
        json!({ "success": true, "message": "Result saved", "data": { "_id": "r1" } }),
    );
    let (_child, mut stdin, mut reader) = signed_in(&backend);

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "results.save",
        json!({
            "studentId": "stu-1",
            "semester": "3",
            "academicYear": "2025-26",
            "rows": [
                { "subjectId": "sub-ma", "name": "Maths", "code": "MA301", "marksObtained": 95, "maxMarks": 100, "credits": 4 },
                { "subjectId": "sub-ph", "name": "Physics", "code": "PH301", "marksObtained": 55, "maxMarks": 100, "credits": 3 }
            ]
        }),
    );
    assert_eq!(saved["saved"], true);
    assert_eq!(saved["message"], "Result saved");
    assert_eq!(saved["sheet"]["sgpa"], 8.29);

    let sent = backend.requests_to("/api/results");
    assert_eq!(sent.len(), 1);
    let body = sent[0].json_body();
    assert_eq!(body["studentId"], "stu-1");
    assert_eq!(body["semester"], 3);
    assert_eq!(body["sgpa"], 8.29);
    assert_eq!(body["status"], "Pass");
    assert_eq!(body["subjects"][0]["grade"], "O");
    assert_eq!(body["subjects"][0]["gradePoint"], 10);
    assert_eq!(body["subjects"][1]["grade"], "C");
    assert_eq!(body["subjects"][1]["subject"], "sub-ph");
}

#[test]
fn save_with_no_rows_sends_nothing() {
    let backend = FakeBackend::start();
    let (_child, mut stdin, mut reader) = signed_in(&backend);
    let e = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "results.save",
        json!({ "studentId": "stu-1", "semester": 3, "academicYear": "2025-26", "rows": [] }),
    );
    assert_eq!(e["code"], "bad_params");
    assert!(backend.requests().is_empty());
}

#[test]
fn load_recomputes_saved_rows_and_handles_missing_results() {
    let backend = FakeBackend::start();
    backend.route(
        "GET",
        "/api/results/student/stu-1",
        200,
        json!({
            "success": true,
            "data": {
                "_id": "r1",
                "semester": 3,
                "academicYear": "2025-26",
                "isPublished": true,
                "subjects": [
                    { "subject": { "_id": "sub-ma", "name": "Maths", "code": "MA301" }, "marksObtained": 30, "maxMarks": 100, "credits": 3, "grade": "O" }
                ]
            }
        }),
    );
    let (_child, mut stdin, mut reader) = signed_in(&backend);

    let loaded = request_ok(&mut stdin, &mut reader, "1", "results.load", json!({ "studentId": "stu-1" }));
    assert_eq!(loaded["found"], true);
    assert_eq!(loaded["published"], true);
    // Stored grades are never trusted; they are derived again from marks.
    assert_eq!(loaded["sheet"]["rows"][0]["grade"], "F");
    assert_eq!(loaded["sheet"]["rows"][0]["name"], "Maths");
    assert_eq!(loaded["sheet"]["status"], "Fail");

    let missing = request_ok(&mut stdin, &mut reader, "2", "results.load", json!({ "studentId": "stu-2" }));
    assert_eq!(missing["found"], false);
}

#[test]
fn draft_starts_every_active_subject_at_zero() {
    let backend = FakeBackend::start();
    backend.route(
        "GET",
        "/api/subjects",
        200,
        json!({ "data": [
            { "_id": "s1", "name": "Maths", "code": "MA301", "credits": 4 },
            { "_id": "s2", "name": "Workshop", "code": "WS301", "maxMarks": 50 }
        ] }),
    );
    let (_child, mut stdin, mut reader) = signed_in(&backend);

    let draft = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "results.draft",
        json!({ "branch": "b1", "semester": "3" }),
    );
    let rows = draft["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["marksObtained"], 0.0);
    assert_eq!(rows[0]["credits"], 4.0);
    assert_eq!(rows[1]["maxMarks"], 50.0);
    assert_eq!(rows[1]["credits"], 3.0);

    let sent = backend.requests_to("/api/subjects");
    assert!(sent[0].query.contains("branch=b1"));
    assert!(sent[0].query.contains("activeOnly=true"));
}

#[test]
fn export_without_every_filter_sends_no_request() {
    let backend = FakeBackend::start();
    backend.route_raw("GET", "/api/results/export", 200, "Regd No,SGPA\n21CS001,8.29\n".to_string());
    let workspace = temp_dir("collegedesk-results-export");
    let out = workspace.join("results.csv");
    let (_child, mut stdin, mut reader) = signed_in(&backend);

    let incomplete = [
        json!({ "semester": "3", "academicYear": "2025-26" }),
        json!({ "branchId": "b1", "academicYear": "2025-26" }),
        json!({ "branchId": "b1", "semester": "3", "academicYear": "  " }),
    ];
    for (i, mut params) in incomplete.into_iter().enumerate() {
        params["outPath"] = json!(out.to_string_lossy());
        let e = request_err(&mut stdin, &mut reader, &format!("e{i}"), "results.export", params);
        assert_eq!(e["code"], "bad_params");
    }
    assert!(backend.requests().is_empty());
    assert!(!out.exists());

    let done = request_ok(
        &mut stdin,
        &mut reader,
        "ok",
        "results.export",
        json!({ "branchId": "b1", "semester": "3", "academicYear": "2025-26", "outPath": out.to_string_lossy() }),
    );
    assert_eq!(done["path"], out.to_string_lossy().to_string());
    let csv = std::fs::read_to_string(&out).expect("export file");
    assert!(csv.starts_with("Regd No,SGPA"));
    let sent = backend.requests_to("/api/results/export");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].query.contains("academicYear=2025-26"));
}

#[test]
fn publish_and_unpublish_report_updated_counts() {
    let backend = FakeBackend::start();
    backend.route(
        "POST",
        "/api/results/class/publish",
        200,
        json!({ "success": true, "message": "12 results published", "data": { "modifiedCount": 12 } }),
    );
    backend.route(
        "POST",
        "/api/results/class/unpublish",
        200,
        json!({ "success": true, "data": { "updated": 12 } }),
    );
    let (_child, mut stdin, mut reader) = signed_in(&backend);
    let class = json!({ "branchId": "b1", "semester": "3", "academicYear": "2025-26" });

    let p = request_ok(&mut stdin, &mut reader, "1", "results.publishClass", class.clone());
    assert_eq!(p["published"], true);
    assert_eq!(p["updated"], 12);
    assert_eq!(p["message"], "12 results published");

    let u = request_ok(&mut stdin, &mut reader, "2", "results.unpublishClass", class);
    assert_eq!(u["published"], false);
    assert_eq!(u["updated"], 12);

    let body = backend.requests_to("/api/results/class/publish")[0].json_body();
    assert_eq!(body, json!({ "branchId": "b1", "semester": "3", "academicYear": "2025-26" }));
}

#[test]
fn delete_sends_the_class_keys_and_tolerates_an_empty_body() {
    let backend = FakeBackend::start();
    backend.route_raw("DELETE", "/api/results/by-student", 200, String::new());
    let (_child, mut stdin, mut reader) = signed_in(&backend);

    let params = json!({ "studentId": "stu-1", "semester": "3", "academicYear": "2025-26" });
    let done = request_ok(&mut stdin, &mut reader, "1", "results.delete", params.clone());
    assert_eq!(done["deleted"], true);
    assert_eq!(done["message"], "Result deleted");

    let sent = backend.requests_to("/api/results/by-student");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "DELETE");
    for pair in ["studentId=stu-1", "semester=3", "academicYear=2025-26"] {
        assert!(sent[0].query.split('&').any(|q| q == pair), "missing {pair} in {}", sent[0].query);
    }

    backend.route(
        "DELETE",
        "/api/results/by-student",
        409,
        json!({ "success": false, "message": "Result is published" }),
    );
    let e = request_err(&mut stdin, &mut reader, "2", "results.delete", params);
    assert_eq!(e["code"], "backend_rejected");
    assert_eq!(e["message"], "Result is published");
}
