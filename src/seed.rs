use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::{
    auth::credentials::CredentialStore,
    config::{Config, DEFAULT_ADMIN_PASSWORD},
    error::AppError,
    model::role::Role,
};

const SAMPLE_PASSWORD: &str = "1234";
const SAMPLE_USERS: [(&str, Role); 3] = [
    ("attachee1", Role::Attachee),
    ("intern1", Role::Intern),
    ("staff1", Role::Staff),
];

/// Creates the account unless the username is taken. Returns whether it was
/// created.
async fn ensure_account(
    credentials: &CredentialStore,
    username: &str,
    password: &str,
    role: Role,
) -> Result<bool> {
    match credentials.register(username, password, role.as_ref()).await {
        Ok(user_id) => {
            info!(user_id, username, role = %role, "Seeded account");
            Ok(true)
        }
        Err(AppError::DuplicateUsername) => {
            debug!(username, "Seed account already exists");
            Ok(false)
        }
        Err(e) => Err(anyhow!("failed to seed account {}: {}", username, e)),
    }
}

/// Provisions the default HR account, and the sample accounts when enabled.
/// Safe to run on every boot.
pub async fn seed_default_accounts(credentials: &CredentialStore, config: &Config) -> Result<()> {
    let created = ensure_account(
        credentials,
        &config.seed_admin_username,
        &config.seed_admin_password,
        Role::Hr,
    )
    .await?;

    if created && config.seed_admin_password == DEFAULT_ADMIN_PASSWORD {
        warn!(
            username = %config.seed_admin_username,
            "Default HR account created with the built-in password, change it or set SEED_ADMIN_PASSWORD"
        );
    }

    if config.seed_sample_users {
        for (username, role) in SAMPLE_USERS {
            ensure_account(credentials, username, SAMPLE_PASSWORD, role).await?;
        }
    }

    Ok(())
}
