use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    Appointment, AppointmentCommand, AppointmentError, AppointmentPatch, AppointmentStatus,
    PaymentMethod, PaymentStatus,
};
use appointment_cell::services::{AppointmentLedger, SupabaseAppointmentLedger};
use shared_models::pagination::PageRequest;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn ledger(mock_server: &MockServer) -> SupabaseAppointmentLedger {
    SupabaseAppointmentLedger::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config())
}

fn row(id: Uuid, status: &str) -> serde_json::Value {
    MockSupabaseResponses::appointment_row(
        &id.to_string(),
        &Uuid::new_v4().to_string(),
        &Uuid::new_v4().to_string(),
        "2030-03-01",
        "10:00:00",
        status,
    )
}

fn sample_appointment() -> Appointment {
    serde_json::from_value(row(Uuid::new_v4(), "scheduled")).unwrap()
}

#[tokio::test]
async fn test_insert_maps_unique_violation_to_slot_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint \"appointments_active_slot_key\"",
            "23505",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = ledger(&mock_server).insert(&sample_appointment()).await;

    assert_matches!(result, Err(AppointmentError::SlotUnavailable));
}

#[tokio::test]
async fn test_insert_returns_stored_row() {
    let mock_server = MockServer::start().await;
    let appointment = sample_appointment();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "id": appointment.id,
            "status": "scheduled",
            "appointment_date": "2030-03-01",
            "appointment_time": "10:00",
            "consultation_fee": 150.0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row(appointment.id, "scheduled")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let stored = ledger(&mock_server).insert(&appointment).await.unwrap();

    assert_eq!(stored.id, appointment.id);
    assert_eq!(stored.appointment_time.to_string(), "10:00");
}

#[tokio::test]
async fn test_other_storage_failures_are_database_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let result = ledger(&mock_server).find_by_id(Uuid::new_v4()).await;

    assert_matches!(result, Err(AppointmentError::Database(_)));
}

#[tokio::test]
async fn test_patient_query_shape_and_total() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "eq.confirmed"))
        .and(query_param("order", "appointment_date.desc,appointment_time.desc,created_at.desc,id.desc"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "20"))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "20-24/25")
                .set_body_json(json!([
                    row(Uuid::new_v4(), "confirmed"),
                    row(Uuid::new_v4(), "confirmed"),
                    row(Uuid::new_v4(), "confirmed"),
                    row(Uuid::new_v4(), "confirmed"),
                    row(Uuid::new_v4(), "confirmed")
                ])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = ledger(&mock_server)
        .query_by_patient(
            patient_id,
            Some(AppointmentStatus::Confirmed),
            PageRequest::new(Some(3), Some(10)).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total, 25);
    assert_eq!(page.pages, 3);
    assert_eq!(page.page, 3);
}

#[tokio::test]
async fn test_doctor_query_orders_ascending() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", "eq.2030-03-01"))
        .and(query_param("order", "appointment_date.asc,appointment_time.asc,created_at.asc,id.asc"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "*/0")
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = ledger(&mock_server)
        .query_by_doctor(
            doctor_id,
            None,
            NaiveDate::from_ymd_opt(2030, 3, 1),
            PageRequest::default(),
        )
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.pages, 0);
}

#[tokio::test]
async fn test_update_is_guarded_by_status() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();
    let cancelled_by = Uuid::new_v4();

    let mut cancelled = row(id, "cancelled");
    cancelled["cancelled_by"] = json!(cancelled_by);
    cancelled["cancellation_reason"] = json!("Feeling better");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "eq.scheduled"))
        .and(body_partial_json(json!({
            "status": "cancelled",
            "cancelled_by": cancelled_by,
            "cancellation_reason": "Feeling better"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patch = AppointmentPatch::Transition(AppointmentCommand::Cancel {
        cancelled_by,
        reason: Some("Feeling better".to_string()),
    });
    let updated = ledger(&mock_server)
        .update(id, AppointmentStatus::Scheduled, &patch)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Cancelled);
    assert_eq!(updated.cancelled_by, Some(cancelled_by));
}

#[tokio::test]
async fn test_update_guard_miss_reports_current_status() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(id, "completed")])))
        .mount(&mock_server)
        .await;

    let patch = AppointmentPatch::Transition(AppointmentCommand::Cancel {
        cancelled_by: Uuid::new_v4(),
        reason: None,
    });
    let result = ledger(&mock_server)
        .update(id, AppointmentStatus::Confirmed, &patch)
        .await;

    assert_matches!(
        result,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Completed,
            to: AppointmentStatus::Cancelled
        })
    );
}

#[tokio::test]
async fn test_update_of_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let patch = AppointmentPatch::Transition(AppointmentCommand::NoShow { notes: None });
    let result = ledger(&mock_server)
        .update(Uuid::new_v4(), AppointmentStatus::Scheduled, &patch)
        .await;

    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_payment_update_guards_payment_status() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    let mut paid = row(id, "completed");
    paid["payment_status"] = json!("paid");
    paid["payment_method"] = json!("insurance");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.completed"))
        .and(query_param("payment_status", "eq.pending"))
        .and(body_partial_json(json!({ "payment_status": "paid", "payment_method": "insurance" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([paid])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patch = AppointmentPatch::Payment {
        expected: PaymentStatus::Pending,
        status: PaymentStatus::Paid,
        method: Some(PaymentMethod::Insurance),
    };
    let updated = ledger(&mock_server)
        .update(id, AppointmentStatus::Completed, &patch)
        .await
        .unwrap();

    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert_eq!(updated.payment_method, Some(PaymentMethod::Insurance));
}

#[tokio::test]
async fn test_stats_combines_counts_and_revenue() {
    let mock_server = MockServer::start().await;

    for (status, count) in [("scheduled", 4), ("confirmed", 3), ("completed", 2), ("cancelled", 1), ("no-show", 0)] {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("status", format!("eq.{}", status)))
            .and(query_param("limit", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-range", format!("*/{}", count).as_str())
                    .set_body_json(json!([])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("payment_status", "eq.paid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "consultation_fee": 100.0 },
            { "consultation_fee": 50.5 }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let stats = ledger(&mock_server).stats().await.unwrap();

    assert_eq!(stats.total, 10);
    assert_eq!(stats.scheduled, 4);
    assert_eq!(stats.no_show, 0);
    assert_eq!(stats.paid_revenue, 150.5);
}
