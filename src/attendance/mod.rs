//! Daily check-in/check-out ledger.
//!
//! One record per (user, calendar date), moving NoRecord → CheckedIn →
//! CheckedOut. Calendar dates are always taken in UTC so every process agrees
//! on where a day starts.

pub mod policy;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceRow, DayState, DaySummary},
    user::{Identity, UserId},
};
use policy::StatusPolicy;

/// Partition key of a record: the UTC date of `now`.
pub fn calendar_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Sole writer of the `attendance` table.
#[derive(Clone)]
pub struct AttendanceLedger {
    pool: SqlitePool,
    policy: StatusPolicy,
}

impl AttendanceLedger {
    pub fn new(pool: SqlitePool, policy: StatusPolicy) -> Self {
        Self { pool, policy }
    }

    /// Opens today's record. The `UNIQUE (user_id, date)` constraint makes
    /// the insert the only check, so concurrent check-ins yield exactly one
    /// record.
    pub async fn check_in(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> AppResult<AttendanceRecord> {
        let date = calendar_date(now);
        let status = self.policy.assign(now);

        let result = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO attendance (user_id, date, checkin_time, status)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, date, checkin_time, checkout_time, status
            "#,
        )
        .bind(identity.id)
        .bind(date)
        .bind(now)
        .bind(status.as_ref())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                info!(user_id = identity.id, %date, status = %status, "Checked in");
                row.try_into()
            }
            // Duplicate check-in for same day
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!(user_id = identity.id, %date, "Already checked in");
                Err(AppError::AlreadyCheckedIn)
            }
            // the account was deleted while the session was live
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                warn!(user_id = identity.id, "Check-in for a user that no longer exists");
                Err(AppError::Unauthenticated)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Closes today's record. The update only matches an open record, so of
    /// two concurrent check-outs exactly one wins.
    ///
    /// A `now` earlier than the stored check-in (clock skew) is accepted and
    /// the record comes back with `clock_anomaly` set.
    pub async fn check_out(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> AppResult<AttendanceRecord> {
        let date = calendar_date(now);

        let updated = sqlx::query_as::<_, AttendanceRow>(
            r#"
            UPDATE attendance
            SET checkout_time = ?
            WHERE user_id = ?
            AND date = ?
            AND checkin_time IS NOT NULL
            AND checkout_time IS NULL
            RETURNING id, user_id, date, checkin_time, checkout_time, status
            "#,
        )
        .bind(now)
        .bind(identity.id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            let record = AttendanceRecord::try_from(row)?;
            if record.clock_anomaly {
                warn!(
                    user_id = identity.id,
                    record_id = record.id,
                    checkin = ?record.checkin_time,
                    checkout = %now,
                    "Checkout earlier than checkin, record flagged"
                );
            }
            info!(user_id = identity.id, %date, "Checked out");
            return Ok(record);
        }

        match self.find(identity.id, date).await?.map(|r| r.state()) {
            Some(DayState::CheckedOut) => Err(AppError::AlreadyCheckedOut),
            _ => Err(AppError::NotCheckedIn),
        }
    }

    /// All of the user's records, most recent date first.
    pub async fn history(&self, identity: &Identity) -> AppResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, date, checkin_time, checkout_time, status
            FROM attendance
            WHERE user_id = ?
            ORDER BY date DESC
            "#,
        )
        .bind(identity.id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    pub async fn today(&self, identity: &Identity, now: DateTime<Utc>) -> AppResult<DaySummary> {
        let date = calendar_date(now);
        let record = self.find(identity.id, date).await?;
        let state = record.as_ref().map_or(DayState::NoRecord, |r| r.state());

        Ok(DaySummary {
            date,
            state,
            record,
        })
    }

    async fn find(&self, user_id: UserId, date: NaiveDate) -> AppResult<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, date, checkin_time, checkout_time, status
            FROM attendance
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::model::{attendance::AttendanceStatus, role::Role};
    use chrono::{NaiveTime, TimeZone};
    use futures::future::join_all;

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
    }

    async fn add_user(pool: &SqlitePool, username: &str) -> Identity {
        let id: UserId = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, 'x', 'intern', ?) RETURNING id",
        )
        .bind(username)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .unwrap();

        Identity {
            id,
            username: username.to_string(),
            role: Role::Intern,
        }
    }

    async fn setup() -> (AttendanceLedger, Identity) {
        let pool = test_pool().await;
        let alice = add_user(&pool, "alice").await;
        (AttendanceLedger::new(pool, StatusPolicy::default()), alice)
    }

    #[actix_web::test]
    async fn full_day_cycle() {
        let (ledger, alice) = setup().await;

        let opened = ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        assert_eq!(opened.state(), DayState::CheckedIn);

        let closed = ledger.check_out(&alice, at(10, 17, 0)).await.unwrap();
        assert_eq!(closed.id, opened.id);

        let history = ledger.history(&alice).await.unwrap();
        assert_eq!(history.len(), 1);
        let record = &history[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(record.checkin_time, Some(at(10, 9, 0)));
        assert_eq!(record.checkout_time, Some(at(10, 17, 0)));
        assert_eq!(record.status, AttendanceStatus::Present);
        assert!(!record.clock_anomaly);
    }

    #[actix_web::test]
    async fn second_check_in_same_day_fails() {
        let (ledger, alice) = setup().await;

        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        let again = ledger.check_in(&alice, at(10, 11, 0)).await;

        assert!(matches!(again, Err(AppError::AlreadyCheckedIn)));
        let history = ledger.history(&alice).await.unwrap();
        assert_eq!(history[0].checkin_time, Some(at(10, 9, 0)));
    }

    #[actix_web::test]
    async fn check_out_without_check_in_fails() {
        let (ledger, alice) = setup().await;

        let result = ledger.check_out(&alice, at(10, 17, 0)).await;

        assert!(matches!(result, Err(AppError::NotCheckedIn)));
        assert!(ledger.history(&alice).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn yesterdays_check_in_does_not_open_today() {
        let (ledger, alice) = setup().await;

        ledger.check_in(&alice, at(9, 9, 0)).await.unwrap();

        assert!(matches!(
            ledger.check_out(&alice, at(10, 17, 0)).await,
            Err(AppError::NotCheckedIn)
        ));
    }

    #[actix_web::test]
    async fn second_check_out_fails_and_keeps_first_time() {
        let (ledger, alice) = setup().await;

        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        ledger.check_out(&alice, at(10, 17, 0)).await.unwrap();
        let again = ledger.check_out(&alice, at(10, 18, 0)).await;

        assert!(matches!(again, Err(AppError::AlreadyCheckedOut)));
        let history = ledger.history(&alice).await.unwrap();
        assert_eq!(history[0].checkout_time, Some(at(10, 17, 0)));
    }

    #[actix_web::test]
    async fn checked_out_day_is_terminal() {
        let (ledger, alice) = setup().await;

        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        ledger.check_out(&alice, at(10, 12, 0)).await.unwrap();

        assert!(matches!(
            ledger.check_in(&alice, at(10, 13, 0)).await,
            Err(AppError::AlreadyCheckedIn)
        ));
    }

    #[actix_web::test]
    async fn history_is_most_recent_first() {
        let (ledger, alice) = setup().await;

        for day in [8, 10, 9] {
            ledger.check_in(&alice, at(day, 9, 0)).await.unwrap();
        }

        let dates: Vec<u32> = ledger
            .history(&alice)
            .await
            .unwrap()
            .iter()
            .map(|r| chrono::Datelike::day(&r.date))
            .collect();
        assert_eq!(dates, [10, 9, 8]);
    }

    #[actix_web::test]
    async fn records_are_scoped_to_the_identity() {
        let (ledger, alice) = setup().await;
        let bob = add_user(&ledger.pool, "bob").await;

        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();

        assert!(ledger.history(&bob).await.unwrap().is_empty());
        assert!(matches!(
            ledger.check_out(&bob, at(10, 17, 0)).await,
            Err(AppError::NotCheckedIn)
        ));
        ledger.check_in(&bob, at(10, 9, 30)).await.unwrap();
        ledger.check_out(&alice, at(10, 17, 0)).await.unwrap();
    }

    #[actix_web::test]
    async fn concurrent_check_ins_create_one_record() {
        let (ledger, alice) = setup().await;

        let attempts = (0..16).map(|i| ledger.check_in(&alice, at(10, 9, i)));
        let results = join_all(attempts).await;

        let created = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyCheckedIn)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(rejected, 15);
        assert_eq!(ledger.history(&alice).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn checkout_before_checkin_is_flagged_not_rejected() {
        let (ledger, alice) = setup().await;

        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        let record = ledger.check_out(&alice, at(10, 8, 55)).await.unwrap();

        assert!(record.clock_anomaly);
        assert!(ledger.history(&alice).await.unwrap()[0].clock_anomaly);
    }

    #[actix_web::test]
    async fn late_policy_marks_late_check_ins() {
        let pool = test_pool().await;
        let alice = add_user(&pool, "alice").await;
        let bob = add_user(&pool, "bob").await;
        let ledger = AttendanceLedger::new(
            pool,
            StatusPolicy::LateAfter(NaiveTime::from_hms_opt(9, 15, 0).unwrap()),
        );

        let on_time = ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        let late = ledger.check_in(&bob, at(10, 9, 30)).await.unwrap();

        assert_eq!(on_time.status, AttendanceStatus::Present);
        assert_eq!(late.status, AttendanceStatus::Late);
    }

    #[actix_web::test]
    async fn today_follows_the_state_machine() {
        let (ledger, alice) = setup().await;

        let summary = ledger.today(&alice, at(10, 8, 0)).await.unwrap();
        assert_eq!(summary.state, DayState::NoRecord);
        assert!(summary.record.is_none());

        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();
        assert_eq!(
            ledger.today(&alice, at(10, 10, 0)).await.unwrap().state,
            DayState::CheckedIn
        );

        ledger.check_out(&alice, at(10, 17, 0)).await.unwrap();
        let summary = ledger.today(&alice, at(10, 18, 0)).await.unwrap();
        assert_eq!(summary.state, DayState::CheckedOut);
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[actix_web::test]
    async fn deleting_the_user_cascades_to_records() {
        let (ledger, alice) = setup().await;
        ledger.check_in(&alice, at(10, 9, 0)).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(alice.id)
            .execute(&ledger.pool)
            .await
            .unwrap();

        assert!(ledger.history(&alice).await.unwrap().is_empty());
        assert!(matches!(
            ledger.check_in(&alice, at(11, 9, 0)).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn calendar_date_uses_utc() {
        let late_utc = Utc.with_ymd_and_hms(2024, 1, 10, 23, 30, 0).unwrap();
        assert_eq!(
            calendar_date(late_utc),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
    }
}
