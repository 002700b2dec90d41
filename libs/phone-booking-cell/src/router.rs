use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::PhoneBookingFlow;

#[derive(Clone)]
pub struct PhoneBookingState {
    pub config: Arc<AppConfig>,
    pub flow: Arc<PhoneBookingFlow>,
}

/// Starting a call needs a signed-in user; the webhooks are called by the
/// telephony provider and carry only the call id.
pub fn phone_booking_routes(state: PhoneBookingState) -> Router {
    let protected = Router::new()
        .route(
            "/user/initiate-phone-booking",
            post(handlers::initiate_phone_booking),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    let webhooks = Router::new()
        .route(
            "/user/handle-specialization-choice",
            post(handlers::handle_specialization_choice),
        )
        .route("/user/handle-doctor-choice", post(handlers::handle_doctor_choice))
        .route("/user/handle-date-choice", post(handlers::handle_date_choice))
        .route("/user/handle-slot-choice", post(handlers::handle_slot_choice))
        .route("/user/confirm-appointment", post(handlers::confirm_appointment));

    protected.merge(webhooks).with_state(state)
}
