mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::models::AppointmentError;
use common::{day, slot, Clinic};
use shared_database::ClinicStore;
use shared_models::scheduling::{AppointmentStatus, SlotTime};
use shared_utils::test_utils::ClinicFixtures;

#[tokio::test]
async fn booking_claims_the_slot_and_notifies_both_parties() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:00", "09:30"), ("09:30", "10:00")]).await;

    let appointment = clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "09:00")
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.booked_slot(), Some(slot("09:00", "09:30")));
    assert_eq!(
        clinic.availability.open_slots(clinic.doctor.id, day()).await.unwrap(),
        vec![slot("09:30", "10:00")]
    );

    let emails = clinic.wait_for_emails(2).await;
    let mut recipients: Vec<&str> = emails.iter().map(|m| m.to.as_str()).collect();
    recipients.sort();
    let mut expected = vec![clinic.patient.email.as_str(), clinic.doctor.email.as_str()];
    expected.sort();
    assert_eq!(recipients, expected);
}

#[tokio::test]
async fn twelve_hour_labels_resolve_to_the_stored_slot() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:30", "10:00"), ("14:00", "14:30")]).await;

    let morning = clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "9:30 AM")
        .await
        .unwrap();
    assert_eq!(morning.slot, SlotTime::parse("09:30").unwrap());

    let afternoon = clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "2:00 PM - 2:30 PM")
        .await
        .unwrap();
    assert_eq!(afternoon.slot, SlotTime::parse("14:00").unwrap());
}

#[tokio::test]
async fn booking_failures_are_classified() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:00", "09:30")]).await;
    let patient = clinic.patient.id;
    let doctor = clinic.doctor.id;

    assert_matches!(
        clinic.booking.book_appointment(patient, doctor, ClinicFixtures::future_date(10), "09:00").await,
        Err(AppointmentError::NoAvailability(_))
    );
    assert_matches!(
        clinic.booking.book_appointment(patient, doctor, day(), "11:00").await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    assert_matches!(
        clinic.booking.book_appointment(patient, doctor, ClinicFixtures::past_date(1), "09:00").await,
        Err(AppointmentError::PastDate(_))
    );
    assert_matches!(
        clinic.booking.book_appointment(patient, Uuid::new_v4(), day(), "09:00").await,
        Err(AppointmentError::DoctorNotFound)
    );
    assert_matches!(
        clinic.booking.book_appointment(Uuid::new_v4(), doctor, day(), "09:00").await,
        Err(AppointmentError::PatientNotFound)
    );
    assert_matches!(
        clinic.booking.book_appointment(patient, doctor, day(), "quarter past nine").await,
        Err(AppointmentError::Validation(_))
    );

    // None of the failures consumed the slot.
    assert_eq!(
        clinic.availability.open_slots(doctor, day()).await.unwrap(),
        vec![slot("09:00", "09:30")]
    );
}

#[tokio::test]
async fn concurrent_bookings_for_one_slot_yield_exactly_one_appointment() {
    let clinic = Arc::new(Clinic::new().await);
    clinic.open(&[("09:00", "09:30"), ("09:30", "10:00")]).await;

    let mut patients = Vec::new();
    for i in 0..8 {
        patients.push(clinic.add_patient(&format!("Patient {}", i)).await);
    }

    let tasks: Vec<_> = patients
        .into_iter()
        .map(|patient| {
            let clinic = clinic.clone();
            tokio::spawn(async move {
                clinic
                    .booking
                    .book_appointment(patient.id, clinic.doctor.id, day(), "09:00")
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(AppointmentError::SlotUnavailable(_)));
    }

    let booked = clinic
        .store
        .list_active_appointments_on(clinic.doctor.id, day())
        .await
        .unwrap();
    assert_eq!(booked.len(), 1);
    assert_eq!(
        clinic.availability.open_slots(clinic.doctor.id, day()).await.unwrap(),
        vec![slot("09:30", "10:00")]
    );
}

#[tokio::test]
async fn status_follows_the_lifecycle() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:00", "09:30")]).await;
    let appointment = clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "09:00")
        .await
        .unwrap();

    assert_matches!(
        clinic
            .booking
            .update_appointment_status(clinic.doctor.id, appointment.id, AppointmentStatus::Completed)
            .await,
        Err(AppointmentError::InvalidStatusTransition {
            from: AppointmentStatus::Pending,
            to: AppointmentStatus::Completed
        })
    );

    let confirmed = clinic
        .booking
        .update_appointment_status(clinic.doctor.id, appointment.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert!(confirmed.meeting_id.is_some());

    let completed = clinic
        .booking
        .update_appointment_status(clinic.doctor.id, appointment.id, AppointmentStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.meeting_id, confirmed.meeting_id);

    assert_matches!(
        clinic
            .booking
            .update_appointment_status(clinic.doctor.id, appointment.id, AppointmentStatus::Cancelled)
            .await,
        Err(AppointmentError::InvalidStatusTransition { .. })
    );
}

#[tokio::test]
async fn only_the_owning_doctor_can_update() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:00", "09:30")]).await;
    let appointment = clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "09:00")
        .await
        .unwrap();

    assert_matches!(
        clinic
            .booking
            .update_appointment_status(Uuid::new_v4(), appointment.id, AppointmentStatus::Confirmed)
            .await,
        Err(AppointmentError::Forbidden)
    );
    assert_matches!(
        clinic
            .booking
            .update_appointment_status(clinic.doctor.id, Uuid::new_v4(), AppointmentStatus::Confirmed)
            .await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn cancellation_reopens_the_slot_for_others() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:00", "09:30")]).await;
    let first = clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "09:00")
        .await
        .unwrap();
    assert!(clinic.availability.open_slots(clinic.doctor.id, day()).await.unwrap().is_empty());

    clinic
        .booking
        .update_appointment_status(clinic.doctor.id, first.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(
        clinic.availability.open_slots(clinic.doctor.id, day()).await.unwrap(),
        vec![slot("09:00", "09:30")]
    );

    let other = clinic.add_patient("Riley Chen").await;
    let second = clinic
        .booking
        .book_appointment(other.id, clinic.doctor.id, day(), "09:00")
        .await
        .unwrap();
    assert_ne!(second.id, first.id);
}

#[tokio::test]
async fn listings_join_display_names() {
    let clinic = Clinic::new().await;
    clinic.open(&[("09:00", "09:30"), ("10:00", "10:30")]).await;
    clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "10:00")
        .await
        .unwrap();
    clinic
        .booking
        .book_appointment(clinic.patient.id, clinic.doctor.id, day(), "09:00")
        .await
        .unwrap();

    let mine = clinic.booking.list_user_appointments(clinic.patient.id).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].time, SlotTime::parse("09:00").unwrap());
    assert_eq!(mine[0].doctor, "Dr. Sarah Reynolds");
    assert_eq!(mine[0].department, "Cardiology");

    let theirs = clinic.booking.list_doctor_appointments(clinic.doctor.id).await.unwrap();
    assert_eq!(theirs.len(), 2);
    assert_eq!(theirs[1].patient, "Jamie Lee");
    assert_eq!(theirs[1].patient_email.as_deref(), Some("jamie.lee@example.com"));
}
