use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Days, Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, DataBackend};
use shared_models::auth::User;
use shared_models::scheduling::{Doctor, Patient};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub public_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            public_base_url: "https://equihealth.test".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            data_backend: DataBackend::Memory,
            email_api_url: String::new(),
            email_api_key: String::new(),
            email_from: "EquiHealth <no-reply@equihealth.test>".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_from_number: String::new(),
            twilio_api_base_url: String::new(),
            public_base_url: self.public_base_url.clone(),
            phone_session_ttl_seconds: 900,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(id: Uuid, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{}@example.com", role),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn bearer(user: &TestUser, secret: &str) -> String {
        format!("Bearer {}", Self::create_test_token(user, secret, Some(1)))
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Clinic fixtures shared by the cell test suites.
pub struct ClinicFixtures;

impl ClinicFixtures {
    pub fn doctor(name: &str, specialization: &str) -> Doctor {
        let slug = name.to_lowercase().replace(['.', ' '], "");
        Doctor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@equihealth.test", slug),
            specialization: specialization.to_string(),
            phone: Some("+15550001111".to_string()),
        }
    }

    pub fn patient(name: &str) -> Patient {
        let slug = name.to_lowercase().replace(' ', ".");
        Patient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", slug),
            phone: Some("+15550002222".to_string()),
        }
    }

    /// A date `days` ahead of today, so past-date guards never trip.
    pub fn future_date(days: u64) -> NaiveDate {
        Utc::now().date_naive() + Days::new(days)
    }

    pub fn past_date(days: u64) -> NaiveDate {
        Utc::now().date_naive() - Days::new(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let app_config = TestConfig::default().to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.data_backend, DataBackend::Memory);
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        let user_model = user.to_user();
        assert_eq!(user_model.role.as_deref(), Some("doctor"));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn fixtures_produce_future_dates() {
        assert!(ClinicFixtures::future_date(1) > Utc::now().date_naive());
        assert!(ClinicFixtures::past_date(1) < Utc::now().date_naive());
        let doctor = ClinicFixtures::doctor("Dr. Sarah Reynolds", "Cardiology");
        assert_eq!(doctor.email, "drsarahreynolds@equihealth.test");
    }
}
