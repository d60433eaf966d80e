use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

use letgo_core::{Delivery, NotifierError, OtpNotifier};
use letgo_shared::MaskedPhone;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Development notifier: prints the code to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl OtpNotifier for LogNotifier {
    async fn send(&self, phone_number: &str, code: &str) -> Result<Delivery, NotifierError> {
        info!("[DEV] OTP for {}: {}", phone_number, code);
        Ok(Delivery::Simulated)
    }
}

/// Sends codes through Twilio's Messages API.
pub struct TwilioNotifier {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioNotifier {
    pub fn new(account_sid: &str, auth_token: &str, from_number: &str) -> Result<Self, NotifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: TWILIO_API_BASE.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        })
    }

    /// Points the client at another host, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }
}

#[async_trait]
impl OtpNotifier for TwilioNotifier {
    async fn send(&self, phone_number: &str, code: &str) -> Result<Delivery, NotifierError> {
        let body = format!("Your verification code is {}", code);
        let form = [("To", phone_number), ("From", self.from_number.as_str()), ("Body", body.as_str())];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(phone = %MaskedPhone(phone_number), "OTP SMS accepted by Twilio");
            return Ok(Delivery::Delivered);
        }

        let detail = response.text().await.unwrap_or_default();
        error!(phone = %MaskedPhone(phone_number), %status, "Twilio rejected OTP SMS");
        Err(NotifierError::Rejected(format!("{}: {}", status, detail)))
    }
}
