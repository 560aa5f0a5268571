// apps/api/tests/api_test.rs
// The assembled router and the maintenance pass.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use hkdoc_api::{create_router, maintenance};
use shared_utils::test_utils::{body_json, json_request, TestConfig, TestUser};

#[tokio::test]
async fn every_cell_is_mounted() {
    let state = TestConfig::default().to_state().await;
    let token = TestUser::admin().session_token(&state).await;
    let app = create_router(state);

    let response = app.clone().oneshot(json_request("GET", "/", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "running");

    for uri in ["/health", "/locations", "/specialties", "/doctors/search"] {
        let response = app.clone().oneshot(json_request("GET", uri, None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    for uri in [
        "/admin/doctors",
        "/admin/queries",
        "/admin/severe-cases",
        "/admin/reservations",
        "/admin/analytics",
        "/admin/config",
    ] {
        let response = app
            .clone()
            .oneshot(json_request("GET", uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/login",
            None,
            Some(json!({ "username": "nobody", "password": "nothing1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn maintenance_pass_on_empty_databases() {
    let state = TestConfig::default().to_state().await;
    let report = maintenance::run_once(&state).await;
    assert_eq!(report, maintenance::MaintenanceReport::default());
}
