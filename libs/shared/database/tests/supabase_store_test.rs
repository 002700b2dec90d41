use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::{ClinicStore, StoreError, SupabaseStore};
use shared_models::scheduling::{Appointment, AppointmentStatus, DayAvailability, Slot};
use shared_utils::test_utils::{ClinicFixtures, TestConfig};

fn store(server: &MockServer) -> SupabaseStore {
    SupabaseStore::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config())
}

fn slot(start: &str, end: &str) -> Slot {
    Slot::parse(start, end).unwrap()
}

#[tokio::test]
async fn test_get_doctor_sends_api_key_and_filters_by_id() {
    let server = MockServer::start().await;
    let doctor = ClinicFixtures::doctor("Dr. Sarah Reynolds", "Cardiology");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor.id)))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .expect(1)
        .mount(&server)
        .await;

    let found = store(&server).get_doctor(doctor.id).await.unwrap();
    assert_eq!(found, Some(doctor));
}

#[tokio::test]
async fn test_missing_rows_are_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let patient = ClinicFixtures::patient("Jamie Lee");
    assert_eq!(store(&server).get_patient(patient.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_specialization_lookup_is_case_insensitive_match() {
    let server = MockServer::start().await;
    let doctor = ClinicFixtures::doctor("Dr. Omar Haddad", "General Physician");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialization", "ilike.General Physician"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .mount(&server)
        .await;

    let doctors = store(&server)
        .list_doctors_by_specialization("General Physician")
        .await
        .unwrap();
    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0].name, "Dr. Omar Haddad");
}

#[tokio::test]
async fn test_ledger_update_is_conditional_on_version() {
    let server = MockServer::start().await;
    let doctor = ClinicFixtures::doctor("Dr. Sarah Reynolds", "Cardiology");
    let record = DayAvailability::new(
        doctor.id,
        ClinicFixtures::future_date(2),
        vec![slot("09:00", "09:30")],
    );
    let mut saved = record.clone();
    saved.version += 1;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("id", format!("eq.{}", record.id)))
        .and(query_param("version", format!("eq.{}", record.version)))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([saved])))
        .expect(1)
        .mount(&server)
        .await;

    let updated = store(&server).update_day_availability(&record).await.unwrap();
    assert_eq!(updated.version, record.version + 1);
}

#[tokio::test]
async fn test_stale_ledger_write_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let record = DayAvailability::new(
        uuid::Uuid::new_v4(),
        ClinicFixtures::future_date(2),
        vec![slot("09:00", "09:30")],
    );
    let store = store(&server);

    assert_matches!(
        store.update_day_availability(&record).await,
        Err(StoreError::Conflict(_))
    );
    assert_matches!(
        store.delete_day_availability(&record).await,
        Err(StoreError::Conflict(_))
    );
}

#[tokio::test]
async fn test_duplicate_appointment_insert_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let appointment = Appointment::pending(
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
        ClinicFixtures::future_date(2),
        &slot("09:00", "09:30"),
    );

    assert_matches!(
        store(&server).insert_appointment(&appointment).await,
        Err(StoreError::Conflict(_))
    );
}

#[tokio::test]
async fn test_active_appointments_exclude_cancelled() {
    let server = MockServer::start().await;
    let doctor_id = uuid::Uuid::new_v4();
    let date = ClinicFixtures::future_date(2);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", format!("eq.{}", date)))
        .and(query_param("status", "neq.CANCELLED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let active = store(&server)
        .list_active_appointments_on(doctor_id, date)
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_status_write_is_conditional_on_expected_status() {
    let server = MockServer::start().await;
    let mut appointment = Appointment::pending(
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
        ClinicFixtures::future_date(2),
        &slot("09:00", "09:30"),
    );
    appointment.status = AppointmentStatus::Confirmed;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.PENDING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(
        store(&server)
            .update_appointment(&appointment, AppointmentStatus::Pending)
            .await,
        Err(StoreError::Conflict(_))
    );
}

#[tokio::test]
async fn test_server_errors_are_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    assert_matches!(
        store(&server).list_availability(uuid::Uuid::new_v4()).await,
        Err(StoreError::Backend(_))
    );
}
