use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqlitePoolOptions, sqlite::SqliteRow, Row, SqlitePool};
use std::path::Path;
use tracing::info;
use vocabcontext_core::{
    repo::ProgressStore, CoreError, ForgottenSet, ProgressSnapshot, ReviewState, ReviewStates,
    StudyHistory, UnlockedSet, MAX_INTERVAL_LEVEL,
};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| CoreError::storage("sqlite connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        info!(path = %path.as_ref().display(), "opened sqlite store");
        Ok(store)
    }

    /// In-memory database. One connection, since each connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn open_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CoreError::storage("sqlite connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS review_states (
          item_id          TEXT PRIMARY KEY,
          interval_level   INTEGER NOT NULL DEFAULT 0,
          ease_factor      REAL    NOT NULL DEFAULT 2.5,
          next_review      INTEGER NOT NULL,
          last_review      INTEGER NOT NULL,
          review_count     INTEGER NOT NULL DEFAULT 0,
          correct_count    INTEGER NOT NULL DEFAULT 0,
          incorrect_count  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS forgotten (
          seq      INTEGER PRIMARY KEY AUTOINCREMENT,
          item_id  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS study_history (
          day    TEXT PRIMARY KEY,
          count  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS achievements (
          id  TEXT PRIMARY KEY
        );

        CREATE INDEX IF NOT EXISTS idx_review_states_next ON review_states (next_review);
        "#;

        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| CoreError::storage("sqlite schema", e))?;
        }
        Ok(())
    }
}

const UPSERT_STATE: &str = "INSERT INTO review_states \
    (item_id,interval_level,ease_factor,next_review,last_review,review_count,correct_count,incorrect_count) \
    VALUES (?,?,?,?,?,?,?,?) \
    ON CONFLICT(item_id) DO UPDATE SET \
      interval_level=excluded.interval_level, ease_factor=excluded.ease_factor, \
      next_review=excluded.next_review, last_review=excluded.last_review, \
      review_count=excluded.review_count, correct_count=excluded.correct_count, \
      incorrect_count=excluded.incorrect_count";

const SELECT_STATE: &str = "SELECT item_id,interval_level,ease_factor,next_review,last_review,\
    review_count,correct_count,incorrect_count FROM review_states";

fn upsert_state<'q>(
    id: &'q str,
    s: &ReviewState,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    sqlx::query(UPSERT_STATE)
        .bind(id)
        .bind(i64::from(s.interval_level))
        .bind(s.ease_factor)
        .bind(s.next_review.timestamp_millis())
        .bind(s.last_review.timestamp_millis())
        .bind(i64::from(s.review_count))
        .bind(i64::from(s.correct_count))
        .bind(i64::from(s.incorrect_count))
}

fn state_from_row(row: &SqliteRow) -> Result<(String, ReviewState), CoreError> {
    Ok((
        row.get::<String, _>("item_id"),
        ReviewState {
            interval_level: count_from_i64(row.get("interval_level")).min(MAX_INTERVAL_LEVEL),
            ease_factor: row.get::<f64, _>("ease_factor"),
            next_review: dt_from_millis(row.get("next_review"))?,
            last_review: dt_from_millis(row.get("last_review"))?,
            review_count: count_from_i64(row.get("review_count")),
            correct_count: count_from_i64(row.get("correct_count")),
            incorrect_count: count_from_i64(row.get("incorrect_count")),
        },
    ))
}

async fn insert_forgotten<'e, E>(exec: E, id: &str) -> Result<bool, CoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let res = sqlx::query("INSERT OR IGNORE INTO forgotten (item_id) VALUES (?)")
        .bind(id)
        .execute(exec)
        .await
        .map_err(|e| CoreError::storage("insert forgotten", e))?;
    Ok(res.rows_affected() > 0)
}

async fn add_study<'e, E>(exec: E, date: NaiveDate, count: u32) -> Result<(), CoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO study_history (day,count) VALUES (?,?) \
         ON CONFLICT(day) DO UPDATE SET count = count + excluded.count",
    )
    .bind(date.to_string())
    .bind(i64::from(count))
    .execute(exec)
    .await
    .map_err(|e| CoreError::storage("record study", e))?;
    Ok(())
}

async fn insert_achievement<'e, E>(exec: E, id: &str) -> Result<(), CoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO achievements (id) VALUES (?)")
        .bind(id)
        .execute(exec)
        .await
        .map_err(|e| CoreError::storage("insert achievement", e))?;
    Ok(())
}

#[async_trait::async_trait]
impl ProgressStore for SqliteStore {
    // ===== Review states =====
    async fn load_states(&self) -> Result<ReviewStates, CoreError> {
        let rows = sqlx::query(SELECT_STATE)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::storage("list states", e))?;
        rows.iter().map(state_from_row).collect()
    }

    async fn get_state(&self, id: &str) -> Result<Option<ReviewState>, CoreError> {
        let row = sqlx::query(&format!("{SELECT_STATE} WHERE item_id=?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::storage("read state", e))?;
        row.as_ref()
            .map(state_from_row)
            .transpose()
            .map(|o| o.map(|(_, s)| s))
    }

    async fn put_state(&self, id: &str, state: &ReviewState) -> Result<(), CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        upsert_state(id, state)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage("upsert state", e))?;
        Ok(())
    }

    async fn save_states(&self, states: &ReviewStates) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage("tx", e))?;
        sqlx::query("DELETE FROM review_states")
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::storage("clear states", e))?;
        for (id, s) in states {
            upsert_state(id, s)
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::storage("upsert state", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| CoreError::storage("tx commit", e))
    }

    async fn remove_state(&self, id: &str) -> Result<(), CoreError> {
        let res = sqlx::query("DELETE FROM review_states WHERE item_id=?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage("delete state", e))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("review state"));
        }
        Ok(())
    }

    // ===== Forgotten =====
    async fn load_forgotten(&self) -> Result<ForgottenSet, CoreError> {
        let rows = sqlx::query("SELECT item_id FROM forgotten ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::storage("list forgotten", e))?;
        Ok(rows
            .iter()
            .map(|r| r.get::<String, _>("item_id"))
            .collect())
    }

    async fn mark_forgotten(&self, id: &str) -> Result<bool, CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        insert_forgotten(&self.pool, id).await
    }

    async fn clear_forgotten(&self, id: &str) -> Result<bool, CoreError> {
        let res = sqlx::query("DELETE FROM forgotten WHERE item_id=?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage("delete forgotten", e))?;
        Ok(res.rows_affected() > 0)
    }

    // ===== Study history =====
    async fn load_history(&self) -> Result<StudyHistory, CoreError> {
        let rows = sqlx::query("SELECT day,count FROM study_history ORDER BY day ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::storage("list history", e))?;
        let mut h = StudyHistory::new();
        for row in rows {
            h.record(
                date_from_str(&row.get::<String, _>("day"))?,
                count_from_i64(row.get("count")),
            );
        }
        Ok(h)
    }

    async fn record_study(&self, date: NaiveDate, count: u32) -> Result<(), CoreError> {
        add_study(&self.pool, date, count).await
    }

    // ===== Achievements =====
    async fn load_achievements(&self) -> Result<UnlockedSet, CoreError> {
        let rows = sqlx::query("SELECT id FROM achievements")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::storage("list achievements", e))?;
        Ok(rows.iter().map(|r| r.get::<String, _>("id")).collect())
    }

    async fn unlock_achievements(&self, ids: &[String]) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage("tx", e))?;
        for id in ids {
            insert_achievement(&mut *tx, id).await?;
        }
        tx.commit()
            .await
            .map_err(|e| CoreError::storage("tx commit", e))
    }

    async fn commit_answer(
        &self,
        id: &str,
        state: &ReviewState,
        day: NaiveDate,
    ) -> Result<(), CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage("tx", e))?;
        upsert_state(id, state)
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::storage("upsert state", e))?;
        sqlx::query("DELETE FROM forgotten WHERE item_id=?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::storage("delete forgotten", e))?;
        add_study(&mut *tx, day, 1).await?;
        tx.commit()
            .await
            .map_err(|e| CoreError::storage("tx commit", e))
    }

    async fn restore(&self, snap: ProgressSnapshot) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage("tx", e))?;
        for table in ["review_states", "forgotten", "study_history", "achievements"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::storage("clear", e))?;
        }
        for (id, s) in &snap.states {
            upsert_state(id, s)
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::storage("upsert state", e))?;
        }
        for id in snap.forgotten.iter() {
            insert_forgotten(&mut *tx, id).await?;
        }
        for (day, count) in snap.history.iter() {
            sqlx::query("INSERT INTO study_history (day,count) VALUES (?,?)")
                .bind(day.to_string())
                .bind(i64::from(*count))
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::storage("insert history", e))?;
        }
        for id in &snap.achievements {
            insert_achievement(&mut *tx, id).await?;
        }
        tx.commit()
            .await
            .map_err(|e| CoreError::storage("tx commit", e))
    }
}

// ===== Helpers =====
fn dt_from_millis(ms: i64) -> Result<DateTime<Utc>, CoreError> {
    DateTime::from_timestamp_millis(ms).ok_or(CoreError::Invalid("timestamp out of range"))
}

fn date_from_str(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CoreError::Invalid("bad study date"))
}

fn count_from_i64(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(count_from_i64(-3), 0);
        assert_eq!(count_from_i64(7), 7);
    }

    #[tokio::test]
    async fn stored_level_out_of_range_is_clamped() {
        let store = SqliteStore::open_memory().await.unwrap();
        for (id, level) in [("neg", -3i64), ("big", 40)] {
            sqlx::query(
                "INSERT INTO review_states (item_id,interval_level,next_review,last_review) \
                 VALUES (?,?,0,0)",
            )
            .bind(id)
            .bind(level)
            .execute(&store.pool)
            .await
            .unwrap();
        }
        let all = store.load_states().await.unwrap();
        assert_eq!(all["neg"].interval_level, 0);
        assert_eq!(all["big"].interval_level, MAX_INTERVAL_LEVEL);
    }

    #[test]
    fn parses_iso_day() {
        assert_eq!(
            date_from_str("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(date_from_str("29/02/2024").is_err());
    }
}
