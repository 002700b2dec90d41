use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::BookingService;

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingService>,
}

pub fn appointment_routes(state: AppointmentCellState) -> Router {
    Router::new()
        .route("/user/bookAppointment", post(handlers::book_appointment))
        .route("/user/getAppointments", get(handlers::get_user_appointments))
        .route("/doctor/appointments", get(handlers::get_doctor_appointments))
        .route(
            "/doctor/appointments/update-status",
            patch(handlers::update_appointment_status),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
