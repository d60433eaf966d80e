use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use letgo_api::{app, middleware::RedisRateLimiter, AppState};
use letgo_auth::{LogNotifier, OtpPolicy, TokenIssuer, TwilioNotifier};
use letgo_core::{OtpNotifier, SystemClock};
use letgo_store::{app_config::{Config, SmsMode}, DbClient, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "letgo_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting LetGo API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let notifier = build_notifier(&config)?;

    let policy = OtpPolicy {
        ttl_seconds: config.otp.ttl_seconds,
        resend_cooldown_seconds: config.otp.resend_cooldown_seconds,
        max_attempts: config.otp.max_attempts,
    };
    let tokens = TokenIssuer::new(config.auth.jwt_secret.clone(), config.auth.jwt_expiration_seconds);

    let mut app_state = AppState::new(db.repositories(), notifier, Arc::new(SystemClock), policy, tokens);

    // Redis is optional; without it there is no per-IP limiting
    match &config.redis.url {
        Some(url) => {
            let redis = RedisClient::new(url).context("Invalid Redis URL")?;
            app_state = app_state.with_rate_limiter(Arc::new(RedisRateLimiter::new(
                redis,
                config.rate_limit.requests_per_window,
                config.rate_limit.window_seconds,
            )));
        }
        None => tracing::warn!("No redis.url configured, per-IP rate limiting disabled"),
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn OtpNotifier>> {
    match config.sms.twilio_credentials() {
        Some((sid, token, from)) => {
            tracing::info!("OTP delivery via Twilio");
            Ok(Arc::new(TwilioNotifier::new(sid, token, from)?))
        }
        None => {
            if config.sms.mode == SmsMode::Twilio {
                tracing::warn!("Twilio credentials incomplete, falling back to log delivery");
            }
            Ok(Arc::new(LogNotifier))
        }
    }
}
