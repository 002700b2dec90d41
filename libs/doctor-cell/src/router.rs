use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{AvailabilityService, DoctorDirectory};

#[derive(Clone)]
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub availability: Arc<AvailabilityService>,
    pub directory: Arc<DoctorDirectory>,
}

impl DoctorCellState {
    /// Shares `availability` so every writer goes through one lock registry.
    pub fn new(config: Arc<AppConfig>, availability: Arc<AvailabilityService>) -> Self {
        let directory = DoctorDirectory::new(availability.store().clone());
        Self {
            config,
            availability,
            directory: Arc::new(directory),
        }
    }
}

pub fn doctor_routes(state: DoctorCellState) -> Router {
    Router::new()
        .route(
            "/doctor/availability",
            post(handlers::set_availability)
                .delete(handlers::delete_slots)
                .get(handlers::list_availability),
        )
        .route(
            "/user/getDoctorsBySpecialization",
            post(handlers::get_doctors_by_specialization),
        )
        .route("/user/getDoctorSlots", get(handlers::get_doctor_slots))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
