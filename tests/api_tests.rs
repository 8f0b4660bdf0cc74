mod common;

use common::{InMemoryRepo, app_state, seed_user};
use etextbook_api::{
    create_router,
    models::{Course, CourseDetail, CourseTracking, Module, UserRole},
};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepo>,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Serves the full router over a real socket, backed by the in-memory repository.
async fn spawn_app() -> TestApp {
    let repo = InMemoryRepo::new();
    let router = create_router(app_state(repo.clone()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_authoring_and_learning_flow() {
    let app = spawn_app().await;
    let faculty = seed_user(&app.repo, UserRole::Faculty);
    let student = seed_user(&app.repo, UserRole::Student);
    let as_faculty = faculty.id.to_string();
    let as_student = student.id.to_string();

    // 1. Faculty writes a chapter with two sections.
    let chapter: Module = app
        .client
        .post(app.url("/api/modules"))
        .header("x-user-id", &as_faculty)
        .json(&json!({ "title": "Memory", "status": "published" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let mut sections = Vec::new();
    for title in ["Stack", "Heap"] {
        let response = app
            .client
            .post(app.url("/api/modules"))
            .header("x-user-id", &as_faculty)
            .json(&json!({
                "title": title,
                "status": "published",
                "parent_module_id": chapter.id,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        sections.push(response.json::<Module>().await.unwrap());
    }
    assert_eq!(sections[1].module_number, "1.2");

    // 2. The sections become a published course.
    let course: Course = app
        .client
        .post(app.url("/api/courses"))
        .header("x-user-id", &as_faculty)
        .json(&json!({ "title": "Memory Basics", "status": "published" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let module_ids: Vec<Uuid> = sections.iter().map(|m| m.id).collect();
    let detail: CourseDetail = app
        .client
        .put(app.url(&format!("/api/courses/{}/modules", course.id)))
        .header("x-user-id", &as_faculty)
        .json(&json!({ "module_ids": module_ids }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.modules.len(), 2);

    // 3. A student enrols and finishes the first section.
    let response = app
        .client
        .post(app.url(&format!("/api/progress/courses/{}/enroll", course.id)))
        .header("x-user-id", &as_student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .client
        .put(app.url(&format!("/api/progress/modules/{}", sections[0].id)))
        .header("x-user-id", &as_student)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tracking: CourseTracking = app
        .client
        .get(app.url(&format!("/api/progress/courses/{}", course.id)))
        .header("x-user-id", &as_student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tracking.completion_percentage, 50);

    // 4. The public table of contents reflects the outline.
    let forest: serde_json::Value = app
        .client
        .get(app.url(&format!("/api/modules/tree?author_id={}", faculty.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(forest[0]["module_number"], "1");
    assert_eq!(forest[0]["children"][1]["title"], "Heap");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = spawn_app().await;
    let faculty = seed_user(&app.repo, UserRole::Faculty);

    let response = app
        .client
        .post(app.url("/api/modules"))
        .header("x-user-id", faculty.id.to_string())
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
