use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::TelephonyError;

/// Places outbound calls that run the given TwiML once answered.
#[async_trait]
pub trait TelephonyGateway: Send + Sync {
    /// Returns the provider's call id.
    async fn place_call(&self, to: &str, twiml: &str) -> Result<String, TelephonyError>;
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

/// Twilio Programmable Voice REST client.
pub struct TwilioGateway {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

// Manual impl so the auth token never ends up in `{:?}` output.
impl std::fmt::Debug for TwilioGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioGateway")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TwilioGateway {
    pub fn new(config: &AppConfig) -> Result<Self, TelephonyError> {
        if !config.is_telephony_configured() {
            return Err(TelephonyError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            base_url: config.twilio_api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TelephonyGateway for TwilioGateway {
    async fn place_call(&self, to: &str, twiml: &str) -> Result<String, TelephonyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.base_url, self.account_sid
        );
        debug!("Placing call to {} via {}", to, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Twiml", twiml)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Twilio call creation failed: {} - {}", status, body);
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let call: CallResource = serde_json::from_str(&body)
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))?;

        info!("Outbound call {} placed", call.sid);
        Ok(call.sid)
    }
}
