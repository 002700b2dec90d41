use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, AppointmentCellState};
use appointment_cell::services::BookingService;
use doctor_cell::router::{doctor_routes, DoctorCellState};
use doctor_cell::services::AvailabilityService;
use phone_booking_cell::router::{phone_booking_routes, PhoneBookingState};
use phone_booking_cell::services::PhoneBookingFlow;
use shared_config::AppConfig;

pub struct Services {
    pub config: Arc<AppConfig>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<BookingService>,
    pub phone: Arc<PhoneBookingFlow>,
}

pub fn create_router(services: Services) -> Router {
    let Services {
        config,
        availability,
        booking,
        phone,
    } = services;

    let api = Router::new()
        .merge(doctor_routes(DoctorCellState::new(config.clone(), availability)))
        .merge(appointment_routes(AppointmentCellState {
            config: config.clone(),
            booking,
        }))
        .merge(phone_booking_routes(PhoneBookingState {
            config,
            flow: phone,
        }));

    Router::new()
        .route("/", get(|| async { "EquiHealth API is running!" }))
        .nest("/api/v1", api)
}
