// libs/appointment-cell/tests/booking_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentError, BookAppointmentRequest};
use appointment_cell::services::AppointmentBookingService;
use shared_database::SupabaseClient;
use shared_models::error::AppError;
use shared_models::scheduling::{LocationType, Service, TransportStatus};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "test-token";

fn booking_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn service_for(server: &MockServer) -> AppointmentBookingService {
    let config = TestConfig::with_url(&server.uri()).to_app_config();
    AppointmentBookingService::new(Arc::new(SupabaseClient::new(&config)), &config)
}

fn local_service() -> Service {
    Service {
        id: Uuid::new_v4(),
        name: "Consulta".to_string(),
        duration: 30,
        price: 0.0,
        location_type: LocationType::Local,
        destination_city: None,
    }
}

fn external_service() -> Service {
    Service {
        id: Uuid::new_v4(),
        name: "Cardiologia".to_string(),
        duration: 60,
        price: 0.0,
        location_type: LocationType::External,
        destination_city: Some("Campina Grande".to_string()),
    }
}

fn request(client_id: Uuid, professional_id: Uuid, service: Service, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        client_id: Some(client_id),
        client_name: Some("Maria da Silva".to_string()),
        professional_id: Some(professional_id),
        professional_name: Some("Dra. Ana Souza".to_string()),
        service: Some(service),
        date: Some(booking_day()),
        time: Some(time.to_string()),
        health_unit: Some("UBS Centro".to_string()),
        ..BookAppointmentRequest::default()
    }
}

async fn mount_duplicate_lookup(server: &MockServer, client_id: Uuid, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("client_id", format!("eq.{}", client_id)))
        .and(query_param("date", "eq.2024-06-10"))
        .and(query_param("status", "eq.upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

async fn mount_transport_load(server: &MockServer, with_companion: usize, alone: usize) {
    let rows: Vec<Value> = std::iter::repeat(json!({ "has_companion": true }))
        .take(with_companion)
        .chain(std::iter::repeat(json!({ "has_companion": false })).take(alone))
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("location_type", "eq.external"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(rows)))
        .mount(server)
        .await;
}

async fn expect_no_insert(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn second_booking_same_client_professional_day_is_rejected() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();

    mount_duplicate_lookup(&server, client_id, json!([{ "id": Uuid::new_v4() }])).await;
    expect_no_insert(&server).await;

    let result = service_for(&server)
        .book_appointment(request(client_id, professional_id, local_service(), "14:00"), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::DuplicateBooking));
}

#[tokio::test]
async fn local_booking_is_persisted_with_slot_unit() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_duplicate_lookup(&server, client_id, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("location_type", "eq.external"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "status": "upcoming",
            "location_type": "local",
            "health_unit": "UBS Centro",
            "transport_status": null,
            "service_name": "Consulta (Clínico Geral)",
            "time": "09:30"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, client_id, professional_id, booking_day(), "09:30", "upcoming")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut booking = request(client_id, professional_id, local_service(), "09:30:00");
    booking.specialty = Some("Clínico Geral".to_string());

    let response = service_for(&server).book_appointment(booking, TOKEN).await.unwrap();

    assert_eq!(response.appointment.id, appointment_id);
    let share = response.share_url.unwrap();
    assert!(share.starts_with("https://wa.me/?text="));
}

#[tokio::test]
async fn off_grid_local_time_never_reaches_the_data_service() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    expect_no_insert(&server).await;

    let result = service_for(&server)
        .book_appointment(request(Uuid::new_v4(), Uuid::new_v4(), local_service(), "09:10"), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::Validation(_)));
}

#[tokio::test]
async fn companion_does_not_fit_when_one_seat_is_left() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();

    mount_duplicate_lookup(&server, client_id, json!([])).await;
    // 6 * 2 + 2 * 1 = 14 committed passengers.
    mount_transport_load(&server, 6, 2).await;
    expect_no_insert(&server).await;

    let mut booking = request(client_id, Uuid::new_v4(), external_service(), "07:15");
    booking.has_companion = true;

    let result = service_for(&server).book_appointment(booking, TOKEN).await;

    assert_matches!(
        result,
        Err(AppointmentError::CapacityExceeded { capacity: 15, remaining: 1 })
    );
}

#[tokio::test]
async fn lone_patient_takes_the_last_seat() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_duplicate_lookup(&server, client_id, json!([])).await;
    mount_transport_load(&server, 6, 2).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "location_type": "external",
            "transport_status": "pending",
            "has_companion": false,
            "destination_city": "Campina Grande",
            "time": "07:15"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::external_appointment_row(appointment_id, booking_day(), false, "pending", None)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = service_for(&server)
        .book_appointment(request(client_id, Uuid::new_v4(), external_service(), "07:15"), TOKEN)
        .await
        .unwrap();

    assert_eq!(response.appointment.transport_status, Some(TransportStatus::Pending));
    assert!(response.appointment.is_external());
}

#[tokio::test]
async fn insert_failure_is_a_persistence_error() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();

    mount_duplicate_lookup(&server, client_id, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("insert failed", "XX000"),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let result = service_for(&server)
        .book_appointment(request(client_id, Uuid::new_v4(), local_service(), "10:00"), TOKEN)
        .await;

    let err = result.unwrap_err();
    assert_matches!(err, AppointmentError::Database(_));
    assert_eq!(err.user_message(), "Não foi possível concluir a operação. Tente novamente.");
    assert_matches!(AppError::from(err), AppError::Database(_));
}

#[test]
fn capacity_message_names_the_maximum() {
    let message = AppointmentError::CapacityExceeded { capacity: 15, remaining: 1 }.user_message();
    assert!(message.contains("15"));
    assert_matches!(
        AppError::from(AppointmentError::DuplicateBooking),
        AppError::Conflict(_)
    );
}
