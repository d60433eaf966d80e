use serde::Deserialize;
use std::env;

const MAX_OTP_TTL_SECONDS: u64 = 24 * 60 * 60;
const MAX_JWT_EXPIRATION_SECONDS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

/// Absent URL disables per-IP rate limiting.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_seconds: u64,
}

fn default_jwt_expiration() -> u64 { 3600 }

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    pub ttl_seconds: u64,
    pub resend_cooldown_seconds: u64,
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { ttl_seconds: 300, resend_cooldown_seconds: 60, max_attempts: 5 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmsMode {
    #[default]
    Log,
    Twilio,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SmsConfig {
    #[serde(default)]
    pub mode: SmsMode,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
}

impl SmsConfig {
    /// `(account_sid, auth_token, from_number)` when Twilio is selected and fully configured.
    pub fn twilio_credentials(&self) -> Option<(&str, &str, &str)> {
        if self.mode != SmsMode::Twilio {
            return None;
        }
        match (&self.twilio_account_sid, &self.twilio_auth_token, &self.twilio_from_number) {
            (Some(sid), Some(token), Some(from)) if !sid.is_empty() && !token.is_empty() && !from.is_empty() => {
                Some((sid, token, from))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_window: 100, window_seconds: 60 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer-local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `LETGO__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("LETGO").separator("__"))
            // Bare OTP_* names win over everything else
            .set_override_option("otp.ttl_seconds", env::var("OTP_TTL_SECONDS").ok())?
            .set_override_option(
                "otp.resend_cooldown_seconds",
                env::var("OTP_RESEND_COOLDOWN_SECONDS").ok(),
            )?
            .set_override_option("otp.max_attempts", env::var("OTP_MAX_ATTEMPTS").ok())?
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Lifetimes end up as `chrono::Duration`s, so they are held to sane ranges here.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_OTP_TTL_SECONDS).contains(&self.otp.ttl_seconds) {
            return Err(config::ConfigError::Message(format!(
                "otp.ttl_seconds must be between 1 and {}, got {}",
                MAX_OTP_TTL_SECONDS, self.otp.ttl_seconds
            )));
        }
        if !(1..=MAX_JWT_EXPIRATION_SECONDS).contains(&self.auth.jwt_expiration_seconds) {
            return Err(config::ConfigError::Message(format!(
                "auth.jwt_expiration_seconds must be between 1 and {}, got {}",
                MAX_JWT_EXPIRATION_SECONDS, self.auth.jwt_expiration_seconds
            )));
        }
        Ok(())
    }
}
