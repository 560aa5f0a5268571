// libs/doctor-cell/tests/handlers_test.rs
// Route-level tests for the doctor directory.

use std::sync::Arc;

use axum::{body::Body, http::{Request, StatusCode}, Router};
use serde_json::json;
use tower::ServiceExt;

use doctor_cell::models::CreateDoctorRequest;
use doctor_cell::router::doctor_routes;
use doctor_cell::services::DoctorService;
use shared_database::AppState;
use shared_models::auth::AdminRole;
use shared_utils::test_utils::{body_json, body_string, json_request, JwtTestUtils, TestConfig, TestUser};

async fn setup() -> (Arc<AppState>, Router, String) {
    let state = TestConfig::default().to_state().await;
    let token = TestUser::admin().session_token(&state).await;
    (state.clone(), doctor_routes(state), token)
}

async fn seed(state: &AppState, name: &str, specialty: &str, address: &str) -> i64 {
    DoctorService::new(state)
        .create_doctor(CreateDoctorRequest {
            name_en: Some(name.to_string()),
            specialty_en: Some(specialty.to_string()),
            address_en: Some(address.to_string()),
            languages_en: Some("English, Cantonese".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_public_search_filters_and_pages() {
    let (state, app, _) = setup().await;
    seed(&state, "Dr. Chan", "Cardiology", "Nathan Road, Mong Kok").await;
    seed(&state, "Dr. Lee", "Dermatology", "Hennessy Road, Wan Chai").await;
    seed(&state, "Dr. Wong", "Cardiology", "King's Road, North Point").await;

    let response = app
        .oneshot(json_request("GET", "/doctors/search?specialty=cardio&per_page=1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["per_page"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert!(body["items"][0].get("whatsapp_number").is_none());
}

#[tokio::test]
async fn test_get_missing_doctor_is_404() {
    let (_, app, _) = setup().await;

    let response = app
        .oneshot(json_request("GET", "/doctors/999", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Doctor 999 not found");
}

#[tokio::test]
async fn test_locations_and_specialties_are_public() {
    let (_, app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(json_request("GET", "/locations", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["regions"].as_array().unwrap().len(), 3);

    let response = app
        .oneshot(json_request("GET", "/specialties", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["specialties"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["key"] == "general_practice"));
}

#[tokio::test]
async fn test_admin_routes_require_a_session() {
    let (state, app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(json_request("GET", "/admin/doctors", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let config = TestConfig::default();
    let expired = JwtTestUtils::create_expired_token(&TestUser::admin(), &config.session_secret);
    let response = app
        .clone()
        .oneshot(json_request("GET", "/admin/doctors", Some(&expired), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A valid signature is not enough without a stored account.
    let unknown = TestUser::new(9, "ghost", AdminRole::Admin).token(&config.session_secret);
    let response = app
        .clone()
        .oneshot(json_request("GET", "/admin/doctors", Some(&unknown), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let doctor_token = TestUser::doctor(1).session_token(&state).await;
    let response = app
        .oneshot(json_request("GET", "/admin/doctors", Some(&doctor_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_crud_cycle() {
    let (_, app, token) = setup().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/doctors",
            Some(&token),
            Some(json!({
                "name_en": "Dr. Ho",
                "name_zh": "何醫生",
                "specialty_en": "Paediatrics",
                "priority_flag": 3
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["affiliation_status"], "none");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/admin/doctors/{}", id),
            Some(&token),
            Some(json!({ "phone": "2345 6789", "name_zh": "" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["phone"], "2345 6789");
    assert!(updated["name_zh"].is_null());
    assert_eq!(updated["priority_flag"], 3);

    let response = app
        .clone()
        .oneshot(json_request("DELETE", &format!("/admin/doctors/{}", id), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request("GET", &format!("/admin/doctors/{}", id), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_requires_name_and_specialty() {
    let (_, app, token) = setup().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/doctors",
            Some(&token),
            Some(json!({ "name_en": "Dr. Nobody" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_affiliation_flow() {
    let (state, app, token) = setup().await;
    let id = seed(&state, "Dr. Chan", "Cardiology", "Mong Kok").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/doctors/{}/affiliation-request", id),
            None,
            Some(json!({ "whatsapp_number": "+852 9123 4567" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["affiliation_status"], "pending");

    // A second application is a conflict.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/doctors/{}/affiliation-request", id),
            None,
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/admin/doctors/{}/affiliation", id),
            Some(&token),
            Some(json!({ "status": "affiliated" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["affiliation_status"], "affiliated");
    assert_eq!(body["whatsapp_number"], "+85291234567");
    assert!(body["affiliated_at"].is_string());

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/admin/doctors/{}/affiliation", id),
            Some(&token),
            Some(json!({ "status": "pending" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_affiliating_without_whatsapp_is_rejected() {
    let (state, app, token) = setup().await;
    let id = seed(&state, "Dr. Lam", "Urology", "Sha Tin").await;

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/admin/doctors/{}/affiliation", id),
            Some(&token),
            Some(json!({ "status": "affiliated" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_csv_import_and_export() {
    let (_, app, token) = setup().await;

    let csv = "name_en,name_zh,specialty_en,district,priority_flag,unknown_column\n\
               Dr. Chan,陳醫生,Cardiology,Yau Tsim Mong,2,x\n\
               ,,Dermatology,,,\n\
               Dr. Lee,,General Practitioner,Sha Tin,,y\n";

    let request = Request::builder()
        .method("POST")
        .uri("/admin/doctors/import?mode=replace")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "text/csv")
        .body(Body::from(csv))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["imported"], 2);
    assert_eq!(report["skipped"][0]["line"], 3);

    let response = app
        .oneshot(json_request("GET", "/admin/doctors/export", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );

    let exported = body_string(response).await;
    let mut lines = exported.lines();
    assert!(lines.next().unwrap().starts_with("id,name_en,name_zh,specialty_en"));
    assert_eq!(lines.count(), 2);
    assert!(exported.contains("Dr. Chan,陳醫生,Cardiology"));
}
