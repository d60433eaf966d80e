//! Creates the first administrator. Admin accounts cannot be self-registered.
//!
//! ```text
//! ADMIN_PHONE_NUMBER=+27820000000 cargo run -p letgo-api --bin bootstrap-admin
//! ```

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use std::env;

use letgo_core::identity::normalize_phone;
use letgo_core::repository::IdentityInsert;
use letgo_core::{NewIdentity, Role};
use letgo_shared::MaskedPhone;
use letgo_store::{app_config::Config, DbClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let phone = env::var("ADMIN_PHONE_NUMBER").context("ADMIN_PHONE_NUMBER must be set")?;
    let first_name = env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "Admin".to_string());
    let last_name = env::var("ADMIN_LAST_NAME").unwrap_or_else(|_| "User".to_string());
    let phone = normalize_phone(&phone).context("ADMIN_PHONE_NUMBER is not a valid E.164 number")?;

    let config = Config::load().context("Failed to load config")?;
    let db = DbClient::new(&config.database.url, 1)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let identities = db.repositories().identities;

    if let Some(existing) = identities
        .find_by_phone(&phone)
        .await
        .map_err(|e| anyhow!("Identity lookup failed: {}", e))?
    {
        if existing.role != Role::Admin {
            bail!(
                "{} already belongs to a {} account; roles cannot be changed",
                MaskedPhone(&phone),
                existing.role
            );
        }
        tracing::info!(id = %existing.id, "Admin already exists, nothing to do");
        return Ok(());
    }

    let admin = NewIdentity::administrator(&first_name, &last_name, &phone)?.into_identity(Utc::now());
    match identities
        .create_identity(&admin)
        .await
        .map_err(|e| anyhow!("Identity insert failed: {}", e))?
    {
        IdentityInsert::Created => {
            tracing::info!(id = %admin.id, phone = %MaskedPhone(&phone), "Admin created");
            Ok(())
        }
        IdentityInsert::DuplicatePhone => bail!("{} was registered concurrently", MaskedPhone(&phone)),
    }
}
