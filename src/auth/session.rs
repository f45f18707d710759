use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::credentials::CredentialStore;
use crate::error::{AppError, AppResult};
use crate::model::user::{Identity, UserId};

/// Server-held identity claim behind an opaque session token.
#[derive(Debug, Clone)]
pub struct SessionClaim {
    pub identity: Identity,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Mints, resolves and destroys session tokens.
///
/// Claims expire a fixed `ttl` after login (absolute, not sliding). Expiry is
/// checked on every `resolve`; the cache also drops expired entries on its
/// own so memory is reclaimed without a sweeper task.
///
/// The cache itself is unbounded so it never evicts a live claim. The
/// session limit is enforced at login instead.
#[derive(Clone)]
pub struct SessionGate {
    credentials: CredentialStore,
    claims: Cache<String, SessionClaim>,
    ttl: Duration,
    max_sessions: u64,
}

fn new_token() -> String {
    // 244 random bits, hex encoded
    format!(
        "{}{}",
        Uuid::new_v4().to_simple(),
        Uuid::new_v4().to_simple()
    )
}

impl SessionGate {
    pub fn new(credentials: CredentialStore, ttl: Duration, max_sessions: u64) -> Self {
        let claims = Cache::builder().time_to_live(ttl).build();

        Self {
            credentials,
            claims,
            ttl,
            max_sessions,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verifies credentials and opens a session for them. Fails with
    /// `SessionLimitReached` rather than handing out a token when the gate
    /// already holds `max_sessions` live claims.
    pub async fn authenticate(
        &self,
        username: &str,
        secret: &str,
    ) -> AppResult<(String, SessionClaim)> {
        let identity = self.credentials.verify(username, secret).await?;

        // flush expirations and invalidations so the count is current
        self.claims.run_pending_tasks().await;
        if self.claims.entry_count() >= self.max_sessions {
            warn!(limit = self.max_sessions, "Session limit reached, login refused");
            return Err(AppError::SessionLimitReached);
        }

        let issued_at = Utc::now();
        let claim = SessionClaim {
            identity,
            issued_at,
            expires_at: issued_at + chrono::Duration::seconds(self.ttl.as_secs() as i64),
        };

        let token = new_token();
        self.claims.insert(token.clone(), claim.clone()).await;

        // the account may have been deleted, and its sessions revoked,
        // between verify and insert
        if !self.credentials.exists(claim.identity.id).await? {
            self.claims.invalidate(&token).await;
            debug!(user_id = claim.identity.id, "Account deleted during login");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = claim.identity.id, "Session opened");
        Ok((token, claim))
    }

    /// Returns the live identity behind `token`, or `Unauthenticated` when
    /// the token is missing, unknown or expired.
    pub async fn resolve(&self, token: Option<&str>) -> AppResult<Identity> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let claim = self
            .claims
            .get(token)
            .await
            .ok_or(AppError::Unauthenticated)?;

        if claim.expires_at <= Utc::now() {
            debug!(user_id = claim.identity.id, "Session expired");
            self.claims.invalidate(token).await;
            return Err(AppError::Unauthenticated);
        }

        Ok(claim.identity)
    }

    /// Destroys a session. Unknown tokens are ignored.
    pub async fn invalidate(&self, token: &str) {
        self.claims.invalidate(token).await;
    }

    /// Destroys every session of a user, e.g. after the account is deleted.
    pub async fn invalidate_user(&self, user_id: UserId) -> usize {
        let stale: Vec<_> = self
            .claims
            .iter()
            .filter(|(_, claim)| claim.identity.id == user_id)
            .map(|(token, _)| token)
            .collect();

        for token in &stale {
            self.claims.invalidate(token.as_str()).await;
        }

        if !stale.is_empty() {
            info!(user_id, sessions = stale.len(), "Sessions revoked");
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::test_store;
    use crate::model::role::Role;

    async fn gate(ttl: Duration, max_sessions: u64) -> SessionGate {
        let store = test_store().await;
        store.register("alice", "pw1", "intern").await.unwrap();
        store.register("root", "1234", "hr").await.unwrap();
        SessionGate::new(store, ttl, max_sessions)
    }

    async fn gate_with_ttl(ttl: Duration) -> SessionGate {
        gate(ttl, 1_000).await
    }

    #[actix_web::test]
    async fn login_yields_a_resolvable_token() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;

        let (token, claim) = gate.authenticate("alice", "pw1").await.unwrap();
        assert_eq!(claim.expires_at - claim.issued_at, chrono::Duration::seconds(3600));

        let identity = gate.resolve(Some(&token)).await.unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::Intern);
    }

    #[actix_web::test]
    async fn bad_credentials_open_no_session() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;

        assert!(matches!(
            gate.authenticate("alice", "nope").await,
            Err(AppError::InvalidCredentials)
        ));
        assert_eq!(gate.claims.iter().count(), 0);
    }

    #[actix_web::test]
    async fn missing_or_unknown_tokens_are_unauthenticated() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;

        assert!(matches!(gate.resolve(None).await, Err(AppError::Unauthenticated)));
        assert!(matches!(gate.resolve(Some("")).await, Err(AppError::Unauthenticated)));
        assert!(matches!(
            gate.resolve(Some("not-a-token")).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[actix_web::test]
    async fn tokens_are_unique_per_login() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;

        let (first, _) = gate.authenticate("alice", "pw1").await.unwrap();
        let (second, _) = gate.authenticate("alice", "pw1").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[actix_web::test]
    async fn invalidate_is_idempotent() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;
        let (token, _) = gate.authenticate("alice", "pw1").await.unwrap();

        gate.invalidate(&token).await;
        gate.invalidate(&token).await;

        assert!(matches!(
            gate.resolve(Some(&token)).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[actix_web::test]
    async fn sessions_expire_after_the_ttl() {
        let gate = gate_with_ttl(Duration::from_secs(1)).await;
        let (token, _) = gate.authenticate("alice", "pw1").await.unwrap();
        assert!(gate.resolve(Some(&token)).await.is_ok());

        actix_web::rt::time::sleep(Duration::from_millis(1_200)).await;

        assert!(matches!(
            gate.resolve(Some(&token)).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[actix_web::test]
    async fn invalidate_user_only_drops_that_users_sessions() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;
        let (alice_1, claim) = gate.authenticate("alice", "pw1").await.unwrap();
        let (alice_2, _) = gate.authenticate("alice", "pw1").await.unwrap();
        let (root, _) = gate.authenticate("root", "1234").await.unwrap();

        assert_eq!(gate.invalidate_user(claim.identity.id).await, 2);

        assert!(gate.resolve(Some(&alice_1)).await.is_err());
        assert!(gate.resolve(Some(&alice_2)).await.is_err());
        assert!(gate.resolve(Some(&root)).await.is_ok());
    }

    #[actix_web::test]
    async fn every_issued_token_resolves_up_to_the_limit() {
        let gate = gate(Duration::from_secs(3600), 3).await;

        let mut tokens = Vec::new();
        for _ in 0..3 {
            let (token, _) = gate.authenticate("alice", "pw1").await.unwrap();
            assert!(gate.resolve(Some(&token)).await.is_ok());
            tokens.push(token);
        }

        assert!(matches!(
            gate.authenticate("root", "1234").await,
            Err(AppError::SessionLimitReached)
        ));
        for token in &tokens {
            assert!(gate.resolve(Some(token)).await.is_ok());
        }

        gate.invalidate(&tokens[0]).await;
        let (newest, _) = gate.authenticate("root", "1234").await.unwrap();
        assert!(gate.resolve(Some(&newest)).await.is_ok());
        assert!(gate.resolve(Some(&tokens[2])).await.is_ok());
    }

    #[actix_web::test]
    async fn expired_sessions_free_their_slot() {
        let gate = gate(Duration::from_secs(1), 1).await;
        gate.authenticate("alice", "pw1").await.unwrap();

        actix_web::rt::time::sleep(Duration::from_millis(1_200)).await;

        let (token, _) = gate.authenticate("root", "1234").await.unwrap();
        assert!(gate.resolve(Some(&token)).await.is_ok());
    }

    #[actix_web::test]
    async fn login_racing_account_deletion_leaves_no_live_session() {
        let gate = gate_with_ttl(Duration::from_secs(3600)).await;

        for i in 0..10 {
            let name = format!("temp{}", i);
            let id = gate.credentials.register(&name, "pw", "staff").await.unwrap();

            let remove = async {
                gate.credentials.delete_user(id).await.unwrap();
                gate.invalidate_user(id).await;
            };
            let (login, _) = futures::join!(gate.authenticate(&name, "pw"), remove);

            if let Ok((token, _)) = login {
                assert!(gate.resolve(Some(&token)).await.is_err());
            }
            assert_eq!(
                gate.claims.iter().filter(|(_, c)| c.identity.id == id).count(),
                0
            );
        }
    }
}
