use axum::{
    extract::{Extension, Form, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::WebhookForm;
use crate::router::PhoneBookingState;
use crate::services::flow::unidentified_call;
use crate::services::VoiceResponse;

#[axum::debug_handler]
pub async fn initiate_phone_booking(
    State(state): State<PhoneBookingState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.uuid()?;

    let call_sid = state.flow.initiate(user_id).await?;

    Ok(Json(json!({
        "message": "Call initiated",
        "callSid": call_sid
    })))
}

// ==============================================================================
// TELEPHONY WEBHOOKS
// ==============================================================================

#[axum::debug_handler]
pub async fn handle_specialization_choice(
    State(state): State<PhoneBookingState>,
    Form(form): Form<WebhookForm>,
) -> VoiceResponse {
    let Some(call_sid) = form.call_sid else {
        return unidentified_call("specialization");
    };
    state
        .flow
        .handle_specialization(&call_sid, form.digits.as_deref())
        .await
}

#[axum::debug_handler]
pub async fn handle_doctor_choice(
    State(state): State<PhoneBookingState>,
    Form(form): Form<WebhookForm>,
) -> VoiceResponse {
    let Some(call_sid) = form.call_sid else {
        return unidentified_call("doctor");
    };
    state
        .flow
        .handle_doctor(&call_sid, form.digits.as_deref())
        .await
}

#[axum::debug_handler]
pub async fn handle_date_choice(
    State(state): State<PhoneBookingState>,
    Form(form): Form<WebhookForm>,
) -> VoiceResponse {
    let Some(call_sid) = form.call_sid else {
        return unidentified_call("date");
    };
    state
        .flow
        .handle_date(&call_sid, form.digits.as_deref())
        .await
}

#[axum::debug_handler]
pub async fn handle_slot_choice(
    State(state): State<PhoneBookingState>,
    Form(form): Form<WebhookForm>,
) -> VoiceResponse {
    let Some(call_sid) = form.call_sid else {
        return unidentified_call("slot");
    };
    state
        .flow
        .handle_slot(&call_sid, form.digits.as_deref())
        .await
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<PhoneBookingState>,
    Form(form): Form<WebhookForm>,
) -> VoiceResponse {
    let Some(call_sid) = form.call_sid else {
        return unidentified_call("confirm");
    };
    state
        .flow
        .confirm(&call_sid, form.digits.as_deref())
        .await
}
