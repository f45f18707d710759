use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use dotenvy::dotenv;

/// Argon2 cost parameters and the size of the hashing worker pool.
#[derive(Clone, Debug)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Maximum number of hashes computed at the same time.
    pub workers: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        // argon2id defaults recommended by OWASP
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
            workers: 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server_addr: String,

    pub session_ttl_secs: u64,
    /// Live sessions allowed at once; logins beyond it are refused.
    pub session_max_capacity: u64,

    pub hashing: HashingConfig,

    /// Check-ins strictly after this UTC time of day are marked `Late`.
    pub late_cutoff: Option<NaiveTime>,

    pub seed_admin_username: String,
    pub seed_admin_password: String,
    pub seed_sample_users: bool,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
}

pub const DEFAULT_ADMIN_PASSWORD: &str = "1234";

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://attendance.db".to_string(),
            db_max_connections: 5,
            server_addr: "127.0.0.1:3000".to_string(),
            session_ttl_secs: 3600, // 1 hour
            session_max_capacity: 100_000,
            hashing: HashingConfig::default(),
            late_cutoff: None,
            seed_admin_username: "root".to_string(),
            seed_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            seed_sample_users: false,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn parse_cutoff(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("LATE_CUTOFF must be HH:MM, got {:?}", raw))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let d = Config::default();

        let late_cutoff = match env::var("LATE_CUTOFF") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_cutoff(&raw)?),
            _ => None,
        };

        Ok(Self {
            database_url: var_or("DATABASE_URL", d.database_url)?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", d.db_max_connections)?,
            server_addr: var_or("SERVER_ADDR", d.server_addr)?,

            session_ttl_secs: var_or("SESSION_TTL_SECS", d.session_ttl_secs)?,
            session_max_capacity: var_or("SESSION_MAX_CAPACITY", d.session_max_capacity)?,

            hashing: HashingConfig {
                memory_kib: var_or("HASH_MEMORY_KIB", d.hashing.memory_kib)?,
                iterations: var_or("HASH_ITERATIONS", d.hashing.iterations)?,
                parallelism: var_or("HASH_PARALLELISM", d.hashing.parallelism)?,
                workers: var_or("HASH_WORKERS", d.hashing.workers)?,
            },

            late_cutoff,

            seed_admin_username: var_or("SEED_ADMIN_USERNAME", d.seed_admin_username)?,
            seed_admin_password: var_or("SEED_ADMIN_PASSWORD", d.seed_admin_password)?,
            seed_sample_users: var_or("SEED_SAMPLE_USERS", d.seed_sample_users)?,

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", d.rate_login_per_min)?,
            rate_register_per_min: var_or("RATE_REGISTER_PER_MIN", d.rate_register_per_min)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", d.rate_protected_per_min)?,

            api_prefix: var_or("API_PREFIX", d.api_prefix)?,
            log_dir: var_or("LOG_DIR", d.log_dir)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_one_hour_sessions() {
        let config = Config::default();
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.api_prefix, "/api");
        assert!(config.late_cutoff.is_none());
    }

    #[test]
    fn cutoff_parses_hours_and_minutes() {
        let cutoff = parse_cutoff("09:15").unwrap();
        assert_eq!(cutoff, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert!(parse_cutoff("9am").is_err());
    }
}
