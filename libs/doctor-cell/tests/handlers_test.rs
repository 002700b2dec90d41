use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use doctor_cell::router::{doctor_routes, DoctorCellState};
use doctor_cell::services::AvailabilityService;
use shared_database::InMemoryStore;
use shared_utils::test_utils::{ClinicFixtures, JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    doctor_id: Uuid,
    secret: String,
}

async fn create_test_app() -> TestApp {
    let config = TestConfig::default();
    let store = Arc::new(InMemoryStore::new());
    let doctor = ClinicFixtures::doctor("Dr. Sarah Reynolds", "Cardiology");
    let doctor_id = doctor.id;
    store.add_doctor(doctor).await;

    let availability = Arc::new(AvailabilityService::new(store));
    let state = DoctorCellState::new(config.to_arc(), availability);
    TestApp {
        router: doctor_routes(state),
        doctor_id,
        secret: config.jwt_secret,
    }
}

impl TestApp {
    fn doctor_auth(&self) -> String {
        JwtTestUtils::bearer(&TestUser::with_id(self.doctor_id, "doctor"), &self.secret)
    }

    fn patient_auth(&self) -> String {
        JwtTestUtils::bearer(&TestUser::patient("patient@example.com"), &self.secret)
    }

    async fn send(&self, method: Method, uri: &str, auth: Option<String>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

#[tokio::test]
async fn test_requires_authentication() {
    let app = create_test_app().await;
    let (status, body) = app.send(Method::GET, "/doctor/availability", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_patients_cannot_manage_availability() {
    let app = create_test_app().await;
    let date = ClinicFixtures::future_date(2).to_string();
    let (status, _) = app
        .send(
            Method::POST,
            "/doctor/availability",
            Some(app.patient_auth()),
            Some(json!({ "date": date, "slots": [{ "start": "09:00", "end": "09:30" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_set_list_and_delete_availability() {
    let app = create_test_app().await;
    let date = ClinicFixtures::future_date(2).to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/doctor/availability",
            Some(app.doctor_auth()),
            Some(json!({
                "date": date,
                "slots": [
                    { "start": "09:30", "end": "10:00" },
                    { "start": "09:00", "end": "09:30" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"]["slots"][0]["start"], "09:00");
    assert_eq!(body["availability"]["slots"][1]["start"], "09:30");

    let (status, body) = app
        .send(Method::GET, "/doctor/availability", Some(app.doctor_auth()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"].as_array().unwrap().len(), 1);
    assert_eq!(body["availability"][0]["date"], date);

    let (status, _) = app
        .send(
            Method::DELETE,
            "/doctor/availability",
            Some(app.doctor_auth()),
            Some(json!({ "date": date, "slots": [{ "start": "09:00", "end": "09:30" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::DELETE,
            "/doctor/availability",
            Some(app.doctor_auth()),
            Some(json!({ "date": date, "slots": [{ "start": "09:00", "end": "09:30" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_overlap_is_a_conflict() {
    let app = create_test_app().await;
    let date = ClinicFixtures::future_date(2).to_string();

    app.send(
        Method::POST,
        "/doctor/availability",
        Some(app.doctor_auth()),
        Some(json!({ "date": date, "slots": [{ "start": "09:00", "end": "09:30" }] })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/doctor/availability",
            Some(app.doctor_auth()),
            Some(json!({ "date": date, "slots": [{ "start": "09:15", "end": "09:45" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("09:00-09:30"));
}

#[tokio::test]
async fn test_malformed_input_is_a_validation_error() {
    let app = create_test_app().await;
    let date = ClinicFixtures::future_date(2).to_string();

    for body in [
        json!({ "date": date, "slots": [{ "start": "9:00", "end": "09:30" }] }),
        json!({ "date": date, "slots": [{ "start": "10:00", "end": "09:30" }] }),
        json!({ "date": date, "slots": [] }),
        json!({ "date": "04/10/2024", "slots": [{ "start": "09:00", "end": "09:30" }] }),
    ] {
        let (status, body) = app
            .send(Method::POST, "/doctor/availability", Some(app.doctor_auth()), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }

    let past = ClinicFixtures::past_date(1).to_string();
    let (status, body) = app
        .send(
            Method::POST,
            "/doctor/availability",
            Some(app.doctor_auth()),
            Some(json!({ "date": past, "slots": [{ "start": "09:00", "end": "09:30" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_empty_availability_is_not_found() {
    let app = create_test_app().await;
    let (status, _) = app
        .send(Method::GET, "/doctor/availability", Some(app.doctor_auth()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patient_lookups() {
    let app = create_test_app().await;
    let date = ClinicFixtures::future_date(4).to_string();

    app.send(
        Method::POST,
        "/doctor/availability",
        Some(app.doctor_auth()),
        Some(json!({ "date": date, "slots": [{ "start": "11:00", "end": "11:30" }] })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/user/getDoctorsBySpecialization",
            Some(app.patient_auth()),
            Some(json!({ "specialization": "Cardiology" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctors"][0]["id"], app.doctor_id.to_string());
    assert_eq!(body["doctors"][0]["name"], "Dr. Sarah Reynolds");

    let uri = format!("/user/getDoctorSlots?doctorId={}&date={}", app.doctor_id, date);
    let (status, body) = app.send(Method::GET, &uri, Some(app.patient_auth()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"], json!([{ "start": "11:00", "end": "11:30" }]));

    let uri = format!("/user/getDoctorSlots?doctorId={}&date={}", Uuid::new_v4(), date);
    let (status, body) = app.send(Method::GET, &uri, Some(app.patient_auth()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"], json!([]));
}
