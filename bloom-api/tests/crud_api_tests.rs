//! Integration tests for subjects, people, materials and generated content

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bloom_api::build_router;
use helpers::{delete, get, json_request, send, test_state, test_state_with, FakeCompletion};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

async fn seed_teacher(state: &bloom_api::AppState) -> String {
    bloom_api::db::teachers::ensure_default_teacher(&state.db)
        .await
        .unwrap()
        .id
        .to_string()
}

async fn create_student(app: &axum::Router, username: &str, name: &str) -> Value {
    let (status, student) = send(
        app,
        json_request("POST", "/api/students", json!({ "username": username, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", student);
    student
}

#[tokio::test]
async fn test_teacher_lookup_without_teachers_is_not_found() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);

    let (status, body) = send(&app, get("/api/teacher")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Teacher not found");
}

#[tokio::test]
async fn test_subject_enrollment_flow() {
    let (state, _dir) = test_state().await;
    let teacher_id = seed_teacher(&state).await;
    let app = build_router(state);

    let (status, subject) = send(
        &app,
        json_request("POST", "/api/subjects", json!({ "name": "Chemistry", "teacherId": teacher_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", subject);
    let subject_id = subject["id"].as_str().unwrap().to_string();

    let student = create_student(&app, "ada", "Ada").await;
    let student_id = student["id"].as_str().unwrap().to_string();

    let enroll = json!({ "subjectId": subject_id, "studentId": student_id });
    let (status, body) = send(&app, json_request("POST", "/api/subjects/enroll", enroll.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, json_request("POST", "/api/subjects/enroll", enroll.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, enrollment) = send(
        &app,
        json_request(
            "PATCH",
            "/api/enrollments/progress",
            json!({ "subjectId": subject_id, "studentId": student_id, "progress": 40 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", enrollment);
    assert_eq!(enrollment["progress"], 40);

    let (_, subjects) = send(&app, get("/api/subjects")).await;
    assert_eq!(subjects[0]["name"], "Chemistry");
    assert_eq!(subjects[0]["enrolled"][0]["name"], "Ada");
    assert_eq!(subjects[0]["enrolled"][0]["progress"], 40);

    let (_, students) = send(&app, get("/api/students")).await;
    assert_eq!(students[0]["enrolled"][0]["name"], "Chemistry");

    let (status, _) = send(&app, json_request("POST", "/api/subjects/remove", enroll.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, json_request("POST", "/api/subjects/remove", enroll)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_outside_range_is_rejected() {
    let (state, _dir) = test_state().await;
    let teacher_id = seed_teacher(&state).await;
    let app = build_router(state);

    let (_, subject) = send(
        &app,
        json_request("POST", "/api/subjects", json!({ "name": "Art", "teacherId": teacher_id })),
    )
    .await;
    let student = create_student(&app, "grace", "Grace").await;
    let ids = json!({ "subjectId": subject["id"], "studentId": student["id"] });
    send(&app, json_request("POST", "/api/subjects/enroll", ids)).await;

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            "/api/enrollments/progress",
            json!({ "subjectId": subject["id"], "studentId": student["id"], "progress": 101 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subject_validation() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);

    let (status, body) = send(&app, json_request("POST", "/api/subjects", json!({ "name": "Math" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing name or teacherId");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/subjects",
            json!({ "name": "Math", "teacherId": uuid::Uuid::new_v4().to_string() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_student_creation_and_teacher_roster() {
    let (state, _dir) = test_state().await;
    let teacher_id = seed_teacher(&state).await;
    let app = build_router(state);

    let (status, body) = send(&app, json_request("POST", "/api/students", json!({ "name": "Nameless" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username is required");

    let student = create_student(&app, "linus", "").await;
    assert_eq!(student["name"], "linus");

    let (status, _) = send(&app, json_request("POST", "/api/students", json!({ "username": "linus" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, linked) = send(
        &app,
        json_request(
            "POST",
            "/api/teacher/add-student",
            json!({ "teacherId": teacher_id, "username": "linus" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", linked);
    assert_eq!(linked["id"], student["id"]);

    let (_, roster) = send(&app, get(&format!("/api/students?teacherId={}", teacher_id))).await;
    assert_eq!(roster.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/teacher/add-student",
            json!({ "teacherId": teacher_id, "username": "nobody" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/teacher/remove-student",
            json!({ "teacherId": teacher_id, "studentId": student["id"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, roster) = send(&app, get(&format!("/api/students?teacherId={}", teacher_id))).await;
    assert!(roster.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_teacher_lookup_by_username() {
    let (state, _dir) = test_state().await;
    seed_teacher(&state).await;
    let app = build_router(state);

    let (status, teacher) = send(&app, get("/api/teacher?username=default-teacher")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(teacher["name"], "Default Teacher");

    let (status, body) = send(&app, get("/api/teacher?username=someone-else")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Teacher not found");
}

#[tokio::test]
async fn test_material_with_blob_lifecycle() {
    let (state, dir) = test_state().await;
    let teacher_id = seed_teacher(&state).await;
    let app = build_router(state);

    let (_, subject) = send(
        &app,
        json_request("POST", "/api/subjects", json!({ "name": "Physics", "teacherId": teacher_id })),
    )
    .await;
    let subject_id = subject["id"].as_str().unwrap().to_string();

    let put = Request::builder()
        .method("PUT")
        .uri("/api/blobs/physics/week-1/notes.txt")
        .body(Body::from("Newton's laws"))
        .unwrap();
    let (status, _) = send(&app, put).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/blobs/physics/week-1/notes.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Newton's laws");

    let (status, material) = send(
        &app,
        json_request(
            "POST",
            "/api/materials",
            json!({ "title": "Week 1 notes", "subjectId": subject_id, "storagePath": "physics/week-1/notes.txt" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", material);
    assert_eq!(material["contentUrl"], "/api/blobs/physics/week-1/notes.txt");

    let (_, listed) = send(&app, get(&format!("/api/materials?subjectId={}", subject_id))).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        delete(&format!("/api/materials?id={}", material["id"].as_str().unwrap())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!dir.path().join("blobs/physics/week-1/notes.txt").exists());

    let (status, _) = send(&app, get("/api/blobs/physics/week-1/notes.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blob_paths_cannot_escape_store() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);

    let put = Request::builder()
        .method("PUT")
        .uri("/api/blobs/a/%2E%2E/%2E%2E/escape.txt")
        .body(Body::from("x"))
        .unwrap();
    let (status, body) = send(&app, put).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
}

#[tokio::test]
async fn test_material_requires_url_or_blob() {
    let (state, _dir) = test_state().await;
    let teacher_id = seed_teacher(&state).await;
    let app = build_router(state);

    let (_, subject) = send(
        &app,
        json_request("POST", "/api/subjects", json!({ "name": "Biology", "teacherId": teacher_id })),
    )
    .await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/materials", json!({ "title": "Slides", "subjectId": subject["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing contentUrl or storagePath");

    let (status, material) = send(
        &app,
        json_request(
            "POST",
            "/api/materials",
            json!({ "title": "Slides", "subjectId": subject["id"], "contentUrl": "https://example.com/slides.pdf" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(material["storagePath"].is_null());
}

const ROADMAP_REPLY: &str = r#"Here is the roadmap:
{
  "title": "Chemistry Roadmap",
  "description": "From atoms to reactions",
  "milestones": [
    {
      "title": "Atomic structure",
      "description": "Protons, neutrons, electrons",
      "tasks": [{ "title": "Read chapter 1", "description": "Atoms", "resources": ["Textbook"] }]
    }
  ]
}"#;

#[tokio::test]
async fn test_generate_and_publish_roadmap() {
    let (state, _dir) = test_state_with(Arc::new(FakeCompletion::always(ROADMAP_REPLY))).await;
    let app = build_router(state);

    let (status, body) = send(&app, get("/api/generate-roadmap?subject=Chemistry")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["roadmap"]["milestones"][0]["title"], "Atomic structure");

    let (status, published) = send(
        &app,
        json_request(
            "POST",
            "/api/publish-roadmap",
            json!({ "subject": "Chemistry", "roadmap": body["roadmap"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", published);
    assert_eq!(published["success"], true);
    assert_eq!(published["roadmap"]["subject"], "Chemistry");

    let (status, stored) = send(&app, get("/api/publish-roadmap?subject=Chemistry")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["roadmap"]["title"], "Chemistry Roadmap");

    let (status, _) = send(&app, get("/api/publish-roadmap?subject=Geology")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/generate-roadmap")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Subject parameter is required");
}

#[tokio::test]
async fn test_unusable_roadmap_reply_is_server_error() {
    let (state, _dir) = test_state_with(Arc::new(FakeCompletion::always("no roadmap today"))).await;
    let app = build_router(state);

    let (status, body) = send(&app, get("/api/generate-roadmap?subject=Art")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate roadmap");
}

#[tokio::test]
async fn test_lesson_details() {
    let service = FakeCompletion::always(r#"{"objectives": "define limits", "coreConcepts": "epsilon-delta"}"#);
    let (state, _dir) = test_state_with(Arc::new(service)).await;
    let app = build_router(state);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/lesson-details", json!({ "lessonName": "Limits" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["objectives"], "define limits");
    assert_eq!(body["coreConcepts"], "epsilon-delta");

    let (status, body) = send(&app, json_request("POST", "/api/lesson-details", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing lessonName");
}

#[tokio::test]
async fn test_lesson_details_degrade_to_empty_strings() {
    let (state, _dir) = test_state_with(Arc::new(FakeCompletion::always("I cannot help with that"))).await;
    let app = build_router(state);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/lesson-details", json!({ "lessonName": "Limits" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objectives"], "");
    assert_eq!(body["coreConcepts"], "");
}
