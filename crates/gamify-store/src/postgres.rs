//! `PostgreSQL` storage implementation.
//!
//! The `completions` primary key enforces credit-once. A claim runs as one
//! transaction: `INSERT ... ON CONFLICT DO NOTHING` on the completion, then an
//! `UPDATE ... WHERE revision = $n` on the ledger. Either step coming back
//! empty rolls the whole transaction back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use gamify_core::{
    AggregateMetric, Badge, BadgeSet, CompletionRecord, TargetId, UserId, UserLedger,
};

use crate::error::{Result, StoreError};
use crate::{CommitOutcome, CountQuery, Store};

const LEDGER_COLUMNS: &str = "user_id, total_points, current_streak, longest_streak, \
                              last_activity_date, badges, revision, created_at, updated_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `PostgreSQL` and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("failed to connect postgres: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::Serialization(format!("{field} out of range")))
}

fn to_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Serialization(format!("{field} out of range")))
}

fn from_i64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::Serialization(format!("negative {field}")))
}

fn from_i32(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Serialization(format!("negative {field}")))
}

fn ledger_from_row(row: &PgRow) -> Result<UserLedger> {
    let badges = row
        .try_get::<Vec<String>, _>("badges")?
        .iter()
        .map(|id| {
            id.parse::<Badge>()
                .map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .collect::<Result<BadgeSet>>()?;

    Ok(UserLedger {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        total_points: from_i64(row.try_get("total_points")?, "total_points")?,
        current_streak: from_i32(row.try_get("current_streak")?, "current_streak")?,
        longest_streak: from_i32(row.try_get("longest_streak")?, "longest_streak")?,
        last_activity_date: row.try_get::<Option<NaiveDate>, _>("last_activity_date")?,
        badges,
        revision: from_i64(row.try_get("revision")?, "revision")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Ledger Operations
    // =========================================================================

    async fn get_ledger(&self, user_id: &UserId) -> Result<Option<UserLedger>> {
        let row = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM user_ledgers WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(ledger_from_row).transpose()
    }

    async fn get_or_create_ledger(&self, user_id: &UserId) -> Result<UserLedger> {
        let fresh = UserLedger::new(*user_id);
        sqlx::query(
            r"
            INSERT INTO user_ledgers (user_id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id.as_uuid())
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await?;

        self.get_ledger(user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_ledger(
        &self,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<Option<UserLedger>> {
        let row = update_ledger_row(&self.pool, ledger, expected_revision).await?;
        match row {
            Some(row) => Ok(Some(ledger_from_row(&row)?)),
            None => {
                if self.get_ledger(&ledger.user_id).await?.is_none() {
                    return Err(StoreError::NotFound);
                }
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Completion Operations
    // =========================================================================

    async fn has_completion(
        &self,
        user_id: &UserId,
        target: &TargetId,
        day: NaiveDate,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM completions WHERE user_id = $1 AND target = $2 AND day = $3",
        )
        .bind(user_id.as_uuid())
        .bind(target.as_str())
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn insert_completion_if_absent(&self, record: &CompletionRecord) -> Result<bool> {
        insert_completion(&self.pool, record).await
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn commit_claim(
        &self,
        record: &CompletionRecord,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        if !insert_completion(&mut *tx, record).await? {
            tx.rollback().await?;
            return Ok(CommitOutcome::Duplicate);
        }

        let Some(row) = update_ledger_row(&mut *tx, ledger, expected_revision).await? else {
            tx.rollback().await?;
            if self.get_ledger(&ledger.user_id).await?.is_none() {
                return Err(StoreError::NotFound);
            }
            return Ok(CommitOutcome::Conflict);
        };

        let stored = ledger_from_row(&row)?;
        tx.commit().await?;

        Ok(CommitOutcome::Committed(stored))
    }

    // =========================================================================
    // Aggregate Operations
    // =========================================================================

    async fn count_matching(&self, user_id: &UserId, query: CountQuery) -> Result<u64> {
        let count: i64 = match query {
            CountQuery::Completions(None) => {
                sqlx::query("SELECT COUNT(*) AS n FROM completions WHERE user_id = $1")
                    .bind(user_id.as_uuid())
                    .fetch_one(&self.pool)
                    .await?
                    .try_get("n")?
            }
            CountQuery::Completions(Some(kind)) => sqlx::query(
                "SELECT COUNT(*) AS n FROM completions WHERE user_id = $1 AND kind = $2",
            )
            .bind(user_id.as_uuid())
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?,
            CountQuery::CorrectQuizAnswers => sqlx::query(
                "SELECT COALESCE(SUM(quiz_correct), 0)::BIGINT AS n FROM completions WHERE user_id = $1",
            )
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?,
            CountQuery::Activity(metric) => sqlx::query(
                "SELECT count FROM activity_counters WHERE user_id = $1 AND metric = $2",
            )
            .bind(user_id.as_uuid())
            .bind(metric.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.try_get("count"))
            .transpose()?
            .unwrap_or(0),
        };

        from_i64(count, "count")
    }

    async fn record_activity(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
        amount: u64,
    ) -> Result<u64> {
        let total: i64 = sqlx::query(
            r"
            INSERT INTO activity_counters (user_id, metric, count)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, metric)
            DO UPDATE SET count = activity_counters.count + EXCLUDED.count
            RETURNING count
            ",
        )
        .bind(user_id.as_uuid())
        .bind(metric.as_str())
        .bind(to_i64(amount, "amount")?)
        .fetch_one(&self.pool)
        .await?
        .try_get("count")?;

        from_i64(total, "count")
    }
}

async fn insert_completion<'e, E>(executor: E, record: &CompletionRecord) -> Result<bool>
where
    E: sqlx::PgExecutor<'e>,
{
    let (quiz_correct, quiz_total) = match record.score {
        Some(score) => (
            Some(to_i32(score.correct, "quiz_correct")?),
            Some(to_i32(score.total, "quiz_total")?),
        ),
        None => (None, None),
    };

    let result = sqlx::query(
        r"
        INSERT INTO completions
            (user_id, target, day, kind, quiz_correct, quiz_total, points_awarded, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, target, day) DO NOTHING
        ",
    )
    .bind(record.user_id.as_uuid())
    .bind(record.target.as_str())
    .bind(record.day)
    .bind(record.kind.as_str())
    .bind(quiz_correct)
    .bind(quiz_total)
    .bind(to_i64(record.points_awarded, "points_awarded")?)
    .bind(record.recorded_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn update_ledger_row<'e, E>(
    executor: E,
    ledger: &UserLedger,
    expected_revision: u64,
) -> Result<Option<PgRow>>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query(&format!(
        r"
        UPDATE user_ledgers
           SET total_points = $3,
               current_streak = $4,
               longest_streak = $5,
               last_activity_date = $6,
               badges = $7,
               revision = revision + 1,
               updated_at = $8
         WHERE user_id = $1 AND revision = $2
        RETURNING {LEDGER_COLUMNS}
        "
    ))
    .bind(ledger.user_id.as_uuid())
    .bind(to_i64(expected_revision, "revision")?)
    .bind(to_i64(ledger.total_points, "total_points")?)
    .bind(to_i32(ledger.current_streak, "current_streak")?)
    .bind(to_i32(ledger.longest_streak, "longest_streak")?)
    .bind(ledger.last_activity_date)
    .bind(ledger.badges.to_ids())
    .bind(Utc::now())
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversions_reject_out_of_range() {
        assert_eq!(to_i64(42, "x").unwrap(), 42);
        assert!(to_i64(u64::MAX, "x").is_err());
        assert!(from_i64(-1, "x").is_err());
        assert_eq!(from_i32(7, "x").unwrap(), 7);
        assert!(to_i32(u32::MAX, "x").is_err());
    }

    #[test]
    fn ledger_columns_cover_every_field() {
        for column in [
            "user_id",
            "total_points",
            "current_streak",
            "longest_streak",
            "last_activity_date",
            "badges",
            "revision",
            "created_at",
            "updated_at",
        ] {
            assert!(LEDGER_COLUMNS.contains(column), "missing {column}");
        }
    }
}
