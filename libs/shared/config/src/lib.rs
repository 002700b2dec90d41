use std::env;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub redis_url: Option<String>,
    pub data_backend: DataBackend,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub twilio_api_base_url: String,
    pub public_base_url: String,
    pub phone_session_ttl_seconds: u64,
    pub port: u16,
}

fn var_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn var_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using default", key);
        default.to_string()
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = var_or_empty("SUPABASE_URL");
        let supabase_anon_key = var_or_empty("SUPABASE_ANON_PUBLIC_KEY");

        let data_backend = match env::var("DATA_BACKEND").ok().as_deref() {
            Some("memory") => DataBackend::Memory,
            Some("supabase") => DataBackend::Supabase,
            Some(other) => {
                warn!("Unknown DATA_BACKEND '{}', falling back to detection", other);
                Self::detect_backend(&supabase_url, &supabase_anon_key)
            }
            None => Self::detect_backend(&supabase_url, &supabase_anon_key),
        };

        let phone_session_ttl_seconds = env::var("PHONE_SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(900);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret: var_or_empty("SUPABASE_JWT_SECRET"),
            redis_url: env::var("REDIS_URL").ok(),
            data_backend,
            email_api_url: var_or_empty("EMAIL_API_URL"),
            email_api_key: var_or_empty("EMAIL_API_KEY"),
            email_from: var_or_default("EMAIL_FROM", "EquiHealth <no-reply@equihealth.app>"),
            twilio_account_sid: var_or_empty("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: var_or_empty("TWILIO_AUTH_TOKEN"),
            twilio_from_number: var_or_empty("TWILIO_FROM_NUMBER"),
            twilio_api_base_url: var_or_default("TWILIO_API_BASE_URL", "https://api.twilio.com"),
            public_base_url: var_or_default("PUBLIC_BASE_URL", "http://localhost:3000"),
            phone_session_ttl_seconds,
            port,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    fn detect_backend(url: &str, key: &str) -> DataBackend {
        if url.is_empty() || key.is_empty() {
            warn!("Supabase not configured, using in-memory data backend");
            DataBackend::Memory
        } else {
            DataBackend::Supabase
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.data_backend == DataBackend::Memory
                || (!self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()))
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_api_key.is_empty()
    }

    pub fn is_telephony_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
    }

    /// Absolute URL of a route under the public API prefix.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1{}",
            self.public_base_url.trim_end_matches('/'),
            path
        )
    }
}
