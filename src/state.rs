use std::time::Duration;

use actix_web::web::{self, Data};
use anyhow::Result;
use sqlx::SqlitePool;

use crate::{
    attendance::{AttendanceLedger, policy::StatusPolicy},
    auth::{credentials::CredentialStore, password::SecretHasher, session::SessionGate},
    config::Config,
    error::json_error_handler,
};

/// The components every worker shares. Cloning is cheap: each component
/// holds reference-counted handles to the same pool and caches.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
    pub credentials: CredentialStore,
    pub ledger: AttendanceLedger,
    pub sessions: SessionGate,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self> {
        let hasher = SecretHasher::new(&config.hashing)?;
        let credentials = CredentialStore::new(pool.clone(), hasher);
        let ledger = AttendanceLedger::new(pool.clone(), StatusPolicy::from_cutoff(config.late_cutoff));
        let sessions = SessionGate::new(
            credentials.clone(),
            Duration::from_secs(config.session_ttl_secs),
            config.session_max_capacity,
        );

        Ok(Self {
            config,
            pool,
            credentials,
            ledger,
            sessions,
        })
    }

    pub fn register_data(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(Data::new(self.config.clone()))
            .app_data(Data::new(self.credentials.clone()))
            .app_data(Data::new(self.ledger.clone()))
            .app_data(Data::new(self.sessions.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler));
    }
}
