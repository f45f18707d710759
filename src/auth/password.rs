use std::sync::Arc;

use actix_web::web;
use anyhow::anyhow;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tracing::error;

use crate::config::HashingConfig;
use crate::error::{AppError, AppResult};

const DUMMY_SECRET: &str = "dummy-secret-for-unknown-users";

/// Argon2id hashing kept off the request threads.
///
/// Every hash runs on the blocking pool, and at most `workers` of them run at
/// once, so a burst of logins cannot starve check-in traffic.
#[derive(Clone)]
pub struct SecretHasher {
    params: Params,
    permits: Arc<Semaphore>,
    dummy_hash: Arc<OnceCell<String>>,
}

impl SecretHasher {
    pub fn new(config: &HashingConfig) -> anyhow::Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| anyhow!("invalid argon2 parameters: {}", e))?;

        Ok(Self {
            params,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    pub async fn hash(&self, secret: &str) -> AppResult<String> {
        let params = self.params.clone();
        let secret = secret.to_owned();
        self.run(move || hash_password(&params, &secret)).await
    }

    pub async fn verify(&self, secret: &str, stored_hash: &str) -> AppResult<bool> {
        let params = self.params.clone();
        let secret = secret.to_owned();
        let stored_hash = stored_hash.to_owned();
        self.run(move || verify_password(&params, &secret, &stored_hash))
            .await
    }

    /// Spends the same work as `verify` when the username does not exist.
    pub async fn verify_dummy(&self, secret: &str) -> AppResult<()> {
        let params = self.params.clone();
        let secret = secret.to_owned();
        let dummy_hash = self.dummy_hash.clone();
        self.run(move || {
            let hash = dummy_hash.get_or_try_init(|| hash_password(&params, DUMMY_SECRET))?;
            verify_password(&params, &secret, hash).map(|_| ())
        })
        .await
    }

    async fn run<T, F>(&self, job: F) -> AppResult<T>
    where
        F: FnOnce() -> Result<T, password_hash::Error> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.permits.acquire().await.map_err(|e| {
            error!(error = %e, "Hashing pool closed");
            AppError::Internal
        })?;

        web::block(job)
            .await
            .map_err(|e| {
                error!(error = %e, "Hashing task failed");
                AppError::Internal
            })?
            .map_err(|e| {
                error!(error = %e, "Password hashing error");
                AppError::Internal
            })
    }
}

fn argon2(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_password(params: &Params, password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    argon2(params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
/// Cost parameters are taken from the stored hash itself.
fn verify_password(
    params: &Params,
    password: &str,
    hashed: &str,
) -> Result<bool, password_hash::Error> {
    let parsed = PasswordHash::new(hashed)?;

    match argon2(params).verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> SecretHasher {
    SecretHasher::new(&HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
        workers: 2,
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn hash_is_salted_and_verifiable() {
        let hasher = test_hasher();

        let first = hasher.hash("pw1").await.unwrap();
        let second = hasher.hash("pw1").await.unwrap();

        assert_ne!(first, second);
        assert!(!first.contains("pw1"));
        assert!(first.starts_with("$argon2id$"));
        assert!(hasher.verify("pw1", &first).await.unwrap());
        assert!(!hasher.verify("pw2", &first).await.unwrap());
    }

    #[actix_web::test]
    async fn unreadable_stored_hash_is_an_error() {
        let hasher = test_hasher();
        assert!(hasher.verify("pw1", "plaintext").await.is_err());
    }

    #[actix_web::test]
    async fn dummy_verification_succeeds_repeatedly() {
        let hasher = test_hasher();
        hasher.verify_dummy("anything").await.unwrap();
        hasher.verify_dummy("anything else").await.unwrap();
    }
}
