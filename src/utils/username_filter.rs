use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use sqlx::SqlitePool;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Probabilistic set of usernames already taken.
///
/// `might_exist == false` is definitive, so registration can skip the
/// database lookup. A positive answer must be confirmed against the table.
/// Usernames are case-sensitive and stored as given.
#[derive(Clone)]
pub struct UsernameFilter {
    inner: Arc<RwLock<CuckooFilter<String>>>,
}

impl Default for UsernameFilter {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CuckooFilter::new(
                FILTER_CAPACITY,
                FALSE_POSITIVE_RATE,
            ))),
        }
    }
}

impl UsernameFilter {
    fn read(&self) -> RwLockReadGuard<'_, CuckooFilter<String>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CuckooFilter<String>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if a username might exist (false positives possible)
    pub fn might_exist(&self, username: &str) -> bool {
        self.read().contains(&username.to_owned())
    }

    pub fn insert(&self, username: &str) {
        self.write().add(&username.to_owned());
    }

    /// Loads every existing username, streaming the table in batches.
    pub async fn warmup(&self, pool: &SqlitePool, batch_size: usize) -> Result<usize> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

            batch.push(username);
            total += 1;

            if batch.len() == batch_size {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        log::info!("Username filter warmup complete: {} users", total);
        Ok(total)
    }

    fn insert_batch(&self, usernames: &[String]) {
        let mut filter = self.write();
        for username in usernames {
            filter.add(username);
        }
    }
}
