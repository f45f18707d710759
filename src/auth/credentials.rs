use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::auth::password::SecretHasher;
use crate::error::{AppError, AppResult};
use crate::model::{
    role::Role,
    user::{Identity, UserId, UserRow, UserSummary, UserSummaryRow},
};
use crate::utils::username_filter::UsernameFilter;

const WARMUP_BATCH_SIZE: usize = 100;

/// Owner of the `users` table: registration, credential checks, listing and
/// deletion. Nothing else writes to `users`.
#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
    hasher: SecretHasher,
    usernames: UsernameFilter,
}

fn validate<'a>(username: &'a str, secret: &str, role: &str) -> AppResult<(&'a str, Role)> {
    let username = username.trim();
    if username.is_empty() || secret.is_empty() || role.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Username, password and role are required".to_string(),
        ));
    }

    let role = Role::parse(role.trim()).ok_or_else(|| {
        AppError::InvalidInput("Role must be one of attachee, intern, staff, hr".to_string())
    })?;

    Ok((username, role))
}

impl CredentialStore {
    pub fn new(pool: SqlitePool, hasher: SecretHasher) -> Self {
        Self {
            pool,
            hasher,
            usernames: UsernameFilter::default(),
        }
    }

    /// Loads existing usernames into the in-memory filter.
    pub async fn warmup(&self) -> anyhow::Result<usize> {
        self.usernames.warmup(&self.pool, WARMUP_BATCH_SIZE).await
    }

    /// true  => username AVAILABLE
    /// false => username TAKEN
    async fn is_username_available(&self, username: &str) -> AppResult<bool> {
        // filter says no: definitely not in the table
        if !self.usernames.might_exist(username) {
            return Ok(true);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(!exists)
    }

    /// Creates a user. Input is validated, then the username checked, then
    /// the secret hashed, then the row inserted. The unique index on
    /// `username` settles races between concurrent registrations.
    #[instrument(name = "register_user", skip(self, secret))]
    pub async fn register(&self, username: &str, secret: &str, role: &str) -> AppResult<UserId> {
        let (username, role) = validate(username, secret, role)?;

        if !self.is_username_available(username).await? {
            debug!("Username already taken");
            return Err(AppError::DuplicateUsername);
        }

        let password_hash = self.hasher.hash(secret).await?;

        let result = sqlx::query_scalar::<_, UserId>(
            r#"
            INSERT INTO users (username, password_hash, role, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(role.as_ref())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => {
                self.usernames.insert(username);
                info!(user_id = id, role = %role, "User registered");
                Ok(id)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Username taken by a concurrent registration");
                Err(AppError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Checks a username/secret pair. Unknown usernames and wrong secrets
    /// fail identically, and both cost one hash verification. The username is
    /// trimmed the same way `register` trims it.
    pub async fn verify(&self, username: &str, secret: &str) -> AppResult<Identity> {
        let username = username.trim();
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            self.hasher.verify_dummy(secret).await?;
            debug!("Invalid credentials: user not found");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(secret, &user.password_hash).await? {
            debug!(user_id = user.id, "Invalid credentials: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        Identity::try_from(&user)
    }

    pub async fn exists(&self, id: UserId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            "SELECT id, username, role, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserSummary::try_from).collect()
    }

    /// Removes a user. Their attendance rows go with them through the
    /// `ON DELETE CASCADE` foreign key, in the same statement.
    ///
    /// The name stays in the username filter: removing a cuckoo fingerprint
    /// can also drop a different name sharing it, and a stale positive only
    /// costs one table lookup.
    pub async fn delete_user(&self, id: UserId) -> AppResult<()> {
        let deleted = sqlx::query_scalar::<_, UserId>("DELETE FROM users WHERE id = ? RETURNING id")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match deleted {
            Some(_) => {
                info!(user_id = id, "User deleted");
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> CredentialStore {
    CredentialStore::new(
        crate::db::test_pool().await,
        crate::auth::password::test_hasher(),
    )
}
