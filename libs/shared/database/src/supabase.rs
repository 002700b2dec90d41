use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::scheduling::{Appointment, AppointmentStatus, DayAvailability, Doctor, Patient};

use crate::store::{ClinicStore, StoreError, StoreResult};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|_| DatabaseError::InvalidHeader("apikey".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| DatabaseError::InvalidHeader("authorization".to_string()))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => DatabaseError::Auth(error_text),
                404 => DatabaseError::NotFound(error_text),
                409 => DatabaseError::Conflict(error_text),
                code => DatabaseError::Api { status: code, message: error_text },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn first_row<T: DeserializeOwned>(rows: Vec<Value>) -> StoreResult<Option<T>> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

fn all_rows<T: DeserializeOwned>(rows: Vec<Value>) -> StoreResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

/// `ClinicStore` over Supabase's PostgREST API.
///
/// Expects tables `doctors`, `users`, `doctor_availability` (unique on
/// `doctor_id, date`, `slots` as jsonb) and `appointments` (partial unique
/// index on `doctor_id, date, slot` where status is not `CANCELLED`).
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn get_rows(&self, path: &str) -> StoreResult<Vec<Value>> {
        Ok(self.supabase.request(Method::GET, path, None, None).await?)
    }

    async fn write_rows(&self, method: Method, path: &str, body: Option<Value>) -> StoreResult<Vec<Value>> {
        Ok(self
            .supabase
            .request_with_headers(method, path, None, body, Some(representation()))
            .await?)
    }
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    async fn get_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>> {
        let path = format!("/rest/v1/doctors?id=eq.{}&limit=1", doctor_id);
        first_row(self.get_rows(&path).await?)
    }

    async fn list_doctors_by_specialization(&self, specialization: &str) -> StoreResult<Vec<Doctor>> {
        let path = format!(
            "/rest/v1/doctors?specialization=ilike.{}&order=name.asc",
            urlencoding::encode(specialization)
        );
        all_rows(self.get_rows(&path).await?)
    }

    async fn get_patient(&self, user_id: Uuid) -> StoreResult<Option<Patient>> {
        let path = format!("/rest/v1/users?id=eq.{}&limit=1", user_id);
        first_row(self.get_rows(&path).await?)
    }

    async fn get_day_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<DayAvailability>> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&date=eq.{}&limit=1",
            doctor_id, date
        );
        first_row(self.get_rows(&path).await?)
    }

    async fn list_availability(&self, doctor_id: Uuid) -> StoreResult<Vec<DayAvailability>> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&order=date.asc",
            doctor_id
        );
        all_rows(self.get_rows(&path).await?)
    }

    async fn insert_day_availability(&self, record: &DayAvailability) -> StoreResult<DayAvailability> {
        let rows = self
            .write_rows(
                Method::POST,
                "/rest/v1/doctor_availability",
                Some(serde_json::to_value(record)?),
            )
            .await?;
        first_row(rows)?.ok_or_else(|| StoreError::Backend("Insert returned no row".to_string()))
    }

    async fn update_day_availability(&self, record: &DayAvailability) -> StoreResult<DayAvailability> {
        let path = format!(
            "/rest/v1/doctor_availability?id=eq.{}&version=eq.{}",
            record.id, record.version
        );
        let body = json!({
            "slots": record.slots,
            "version": record.version + 1,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let rows = self.write_rows(Method::PATCH, &path, Some(body)).await?;
        first_row(rows)?.ok_or_else(|| {
            StoreError::Conflict(format!(
                "availability {} changed since version {}",
                record.id, record.version
            ))
        })
    }

    async fn delete_day_availability(&self, record: &DayAvailability) -> StoreResult<()> {
        let path = format!(
            "/rest/v1/doctor_availability?id=eq.{}&version=eq.{}",
            record.id, record.version
        );
        let rows = self.write_rows(Method::DELETE, &path, None).await?;
        if rows.is_empty() {
            return Err(StoreError::Conflict(format!(
                "availability {} changed since version {}",
                record.id, record.version
            )));
        }
        Ok(())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<Appointment> {
        let rows = self
            .write_rows(
                Method::POST,
                "/rest/v1/appointments",
                Some(serde_json::to_value(appointment)?),
            )
            .await?;
        first_row(rows)?.ok_or_else(|| StoreError::Backend("Insert returned no row".to_string()))
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        let path = format!("/rest/v1/appointments?id=eq.{}&limit=1", appointment_id);
        first_row(self.get_rows(&path).await?)
    }

    async fn list_appointments_for_patient(&self, user_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?user_id=eq.{}&order=date.asc,slot.asc",
            user_id
        );
        all_rows(self.get_rows(&path).await?)
    }

    async fn list_appointments_for_doctor(&self, doctor_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=date.asc,slot.asc",
            doctor_id
        );
        all_rows(self.get_rows(&path).await?)
    }

    async fn list_active_appointments_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&status=neq.{}&order=slot.asc",
            doctor_id,
            date,
            AppointmentStatus::Cancelled
        );
        all_rows(self.get_rows(&path).await?)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment.id, expected
        );
        let body = json!({
            "status": appointment.status,
            "meeting_id": appointment.meeting_id,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let rows = self.write_rows(Method::PATCH, &path, Some(body)).await?;
        first_row(rows)?.ok_or_else(|| {
            StoreError::Conflict(format!(
                "appointment {} is no longer {}",
                appointment.id, expected
            ))
        })
    }
}
