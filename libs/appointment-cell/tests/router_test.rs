// libs/appointment-cell/tests/router_test.rs
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn app_for(server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_url(&server.uri());
    (appointment_routes(config.to_state()), config)
}

fn bearer(user: &TestUser, config: &TestConfig) -> String {
    format!("Bearer {}", JwtTestUtils::create_test_token(user, &config.jwt_secret, Some(1)))
}

fn json_request(method: &str, uri: &str, auth: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", auth)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn expect_no_writes(server: &MockServer) {
    for verb in ["POST", "PATCH"] {
        Mock::given(method(verb))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn citizen_cannot_book_for_someone_else() {
    let server = MockServer::start().await;
    expect_no_writes(&server).await;
    let (app, config) = app_for(&server);
    let citizen = TestUser::citizen("maria@example.com");

    let response = app
        .oneshot(json_request(
            "POST",
            "/",
            &bearer(&citizen, &config),
            json!({ "client_id": Uuid::new_v4(), "client_name": "Outra Pessoa" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn incomplete_booking_is_a_bad_request() {
    let server = MockServer::start().await;
    expect_no_writes(&server).await;
    let (app, config) = app_for(&server);
    let attendant = TestUser::attendant("front@example.com");

    let response = app
        .oneshot(json_request(
            "POST",
            "/",
            &bearer(&attendant, &config),
            json!({ "client_id": Uuid::new_v4(), "date": "2024-06-10" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().starts_with("Dados do agendamento inválidos"));
}

#[tokio::test]
async fn unconfirmed_cancel_asks_for_confirmation() {
    let server = MockServer::start().await;
    expect_no_writes(&server).await;
    let (app, config) = app_for(&server);
    let attendant = TestUser::attendant("front@example.com");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/{}/cancel", Uuid::new_v4()),
            &bearer(&attendant, &config),
            json!({ "confirmed": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_REQUIRED);
}

#[tokio::test]
async fn citizen_cannot_cancel_another_citizens_appointment() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, Uuid::new_v4(), Uuid::new_v4(), day, "09:00", "upcoming")
        ])))
        .mount(&server)
        .await;
    expect_no_writes(&server).await;

    let (app, config) = app_for(&server);
    let citizen = TestUser::citizen("maria@example.com");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/{}/cancel", appointment_id),
            &bearer(&citizen, &config),
            json!({ "confirmed": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn drivers_record_boarding_but_citizens_do_not() {
    let server = MockServer::start().await;
    expect_no_writes(&server).await;
    let (app, config) = app_for(&server);
    let citizen = TestUser::citizen("maria@example.com");

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/{}/transport-status", Uuid::new_v4()),
            &bearer(&citizen, &config),
            json!({ "transport_status": "present" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let server = MockServer::start().await;
    let (app, config) = app_for(&server);
    let user = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn professional_cannot_complete_a_colleagues_appointment() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, Uuid::new_v4(), Uuid::new_v4(), day, "09:00", "upcoming")
        ])))
        .mount(&server)
        .await;
    expect_no_writes(&server).await;

    let (app, config) = app_for(&server);
    let professional = TestUser::professional("ana@example.com");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/{}/complete", appointment_id),
            &bearer(&professional, &config),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn professional_cannot_cancel_a_colleagues_appointment() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, Uuid::new_v4(), Uuid::new_v4(), day, "09:00", "upcoming")
        ])))
        .mount(&server)
        .await;
    expect_no_writes(&server).await;

    let (app, config) = app_for(&server);
    let professional = TestUser::professional("ana@example.com");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/{}/cancel", appointment_id),
            &bearer(&professional, &config),
            json!({ "confirmed": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn professional_completes_own_appointment() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let professional = TestUser::professional("ana@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, client_id, professional.uuid(), day, "09:00", "upcoming")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, client_id, professional.uuid(), day, "09:00", "completed")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (app, config) = app_for(&server);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/{}/complete", appointment_id),
            &bearer(&professional, &config),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "completed");
}
