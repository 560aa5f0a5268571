// libs/symptom-cell/tests/find_doctor_test.rs
// End-to-end tests for /find_doctor and the admin query views, with the LLM
// and PubMed mocked.

use std::sync::Arc;

use axum::{http::StatusCode, Router};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::CreateDoctorRequest;
use doctor_cell::services::DoctorService;
use shared_database::{settings, AppState};
use symptom_cell::symptom_routes;
use shared_utils::test_utils::{body_json, body_string, json_request, TestConfig, TestUser};

fn chat_reply(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

async fn mock_llm(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-openrouter-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(content)))
        .mount(server)
        .await;
}

async fn mock_pubmed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": { "count": "1", "idlist": ["31234567"] }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .and(query_param("id", "31234567"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "uids": ["31234567"],
                "31234567": {
                    "title": "Evaluation of chest pain in primary care",
                    "fulljournalname": "The BMJ",
                    "pubdate": "2019 Nov"
                }
            }
        })))
        .mount(server)
        .await;
}

async fn seed_doctors(state: &AppState) {
    let service = DoctorService::new(state);
    for (name, specialty, address) in [
        ("Dr. Heart", "Cardiology 心臟科", "Nathan Road, Mong Kok"),
        ("Dr. Far", "Cardiology", "Castle Peak Road, Tuen Mun"),
        ("Dr. Family", "Family Medicine", "Jordan Road, Jordan"),
        ("Dr. Skin", "Dermatology", "Mong Kok"),
    ] {
        service
            .create_doctor(CreateDoctorRequest {
                name_en: Some(name.to_string()),
                specialty_en: Some(specialty.to_string()),
                address_en: Some(address.to_string()),
                languages_en: Some("English, Cantonese".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
    }
}

async fn setup(server: &MockServer) -> (Arc<AppState>, Router) {
    let state = TestConfig::with_upstream(&server.uri()).to_state().await;
    seed_doctors(&state).await;
    (state.clone(), symptom_routes(state))
}

#[tokio::test]
async fn test_find_doctor_end_to_end() {
    let server = MockServer::start().await;
    mock_llm(
        &server,
        "Recommended specialty: Cardiology\nSeverity: medium\nAnalysis: Palpitations warrant a heart check.",
    )
    .await;
    mock_pubmed(&server).await;
    let (_, app) = setup(&server).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/find_doctor",
            None,
            Some(json!({
                "age": 54,
                "gender": "female",
                "symptoms": "palpitations when climbing stairs",
                "language": "Cantonese",
                "location": { "area": "Mong Kok" }
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["analysis"]["specialties"][0]["key"], "cardiology");
    assert_eq!(body["analysis"]["severity"], "medium");
    assert_eq!(body["analysis"]["degraded"], false);
    assert!(body["emergency"].is_null());

    let doctors = body["doctors"].as_array().unwrap();
    assert_eq!(doctors[0]["doctor"]["name_en"], "Dr. Heart");
    assert_eq!(doctors[0]["location_tier"], "area");
    assert_eq!(doctors[0]["score"], 25 + 30 + 60);
    assert_eq!(doctors[1]["doctor"]["name_en"], "Dr. Far");
    assert_eq!(doctors[2]["doctor"]["name_en"], "Dr. Family");
    assert_eq!(doctors[2]["is_fallback"], true);
    assert_eq!(doctors.len(), 3);

    assert_eq!(body["references"][0]["pmid"], "31234567");
    assert_eq!(body["references"][0]["journal"], "The BMJ");

    let query_id = body["query_id"].as_i64().unwrap();
    let response = app
        .oneshot(json_request("GET", &format!("/report/{}", query_id), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    assert_eq!(report["symptoms"], "palpitations when climbing stairs");
    assert_eq!(report["recommended_specialties"], json!(["Cardiology"]));
    assert_eq!(report["location"]["area"], "Mong Kok");
    assert_eq!(report["doctors"].as_array().unwrap().len(), 3);
    assert_eq!(report["references"][0]["title"], "Evaluation of chest pain in primary care");
}

#[tokio::test]
async fn test_llm_outage_degrades_to_gp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;
    let (_, app) = setup(&server).await;

    let response = app
        .oneshot(json_request("POST", "/find_doctor", None, Some(json!({ "symptoms": "fever and sore throat" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["analysis"]["degraded"], true);
    assert_eq!(body["analysis"]["specialties"][0]["key"], "general_practice");
    assert_eq!(body["doctors"][0]["doctor"]["name_en"], "Dr. Family");
    assert_eq!(body["references"], json!([]));
}

#[tokio::test]
async fn test_red_flags_create_severe_case() {
    let server = MockServer::start().await;
    mock_llm(&server, "Recommended specialty: Cardiology\nSeverity: low").await;
    let (state, app) = setup(&server).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/find_doctor",
            None,
            Some(json!({ "age": 70, "symptoms": "突然胸口痛，冒冷汗", "ui_language": "zh-TW" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["emergency"]["keywords"], json!(["chest pain"]));
    assert!(body["emergency"]["message"].as_str().unwrap().contains("999"));

    let token = TestUser::admin().session_token(&state).await;
    let response = app
        .clone()
        .oneshot(json_request("GET", "/admin/severe-cases?handled=false", Some(&token), None))
        .await
        .unwrap();
    let cases = body_json(response).await;
    assert_eq!(cases["total"], 1);
    let case_id = cases["severe_cases"][0]["id"].as_i64().unwrap();
    assert_eq!(cases["severe_cases"][0]["query_id"], body["query_id"]);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/admin/severe-cases/{}/handled", case_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request("POST", "/admin/severe-cases/999/handled", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let unhandled: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM severe_cases WHERE handled = 0")
        .fetch_one(state.admin_db.pool())
        .await
        .unwrap();
    assert_eq!(unhandled, 0);
}

#[tokio::test]
async fn test_ai_provider_override_uses_ollama() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "medllama", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "medllama",
            "message": { "role": "assistant", "content": "Recommended specialty: Dermatology\nSeverity: low" },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (state, app) = setup(&server).await;

    settings::set(state.admin_db.pool(), settings::AI_PROVIDER, "ollama").await.unwrap();
    settings::set(state.admin_db.pool(), settings::AI_MODEL, "medllama").await.unwrap();

    let response = app
        .oneshot(json_request("POST", "/find_doctor", None, Some(json!({ "symptoms": "itchy rash on arms" }))))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["analysis"]["provider"], "ollama");
    assert_eq!(body["analysis"]["specialties"][0]["key"], "dermatology");
    assert_eq!(body["doctors"][0]["doctor"]["name_en"], "Dr. Skin");
}

#[tokio::test]
async fn test_find_doctor_validation() {
    let server = MockServer::start().await;
    let (_, app) = setup(&server).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/find_doctor", None, Some(json!({ "symptoms": "   " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request("POST", "/find_doctor", None, Some(json!({ "symptoms": "cough", "age": -1 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_report_is_404() {
    let server = MockServer::start().await;
    let (_, app) = setup(&server).await;

    let response = app
        .oneshot(json_request("GET", "/report/42", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_query_list_and_export() {
    let server = MockServer::start().await;
    mock_llm(&server, "Recommended specialty: General Practitioner\nSeverity: low").await;
    let (state, app) = setup(&server).await;

    for symptoms in ["runny nose", "mild cough"] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/find_doctor", None, Some(json!({ "symptoms": symptoms }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(json_request("GET", "/admin/queries", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = TestUser::admin().session_token(&state).await;
    let response = app
        .clone()
        .oneshot(json_request("GET", "/admin/queries?per_page=1", Some(&token), None))
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["symptoms"], "mild cough");

    let response = app
        .oneshot(json_request("GET", "/admin/queries/export", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csv = body_string(response).await;
    assert!(csv.starts_with("id,created_at,age,gender,symptoms"));
    assert_eq!(csv.lines().count(), 3);
}
