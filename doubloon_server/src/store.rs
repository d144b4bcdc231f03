use async_trait::async_trait;
use sqlx::SqlitePool;

use doubloon_core::{apply_xp, LeaderboardEntry, Profile, ProfileStore, StoreError};

// Schema lives in migrations/

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    gold: i64,
    xp: i64,
    level: i64,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            gold: row.gold,
            xp: u64::try_from(row.xp).unwrap_or(0),
            level: u32::try_from(row.level).unwrap_or(1).max(1),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GoldRow {
    user_id: String,
    gold: i64,
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

const INSERT_USER: &str =
    "INSERT OR IGNORE INTO users (user_id, gold, xp, level, created_at) VALUES (?, 0, 0, 1, ?)";

#[derive(Clone)]
pub struct SqliteProfileStore {
    db: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }

    /// Admin override, bypasses the wager engine.
    pub async fn set_gold(&self, user_id: &str, gold: i64) -> anyhow::Result<()> {
        self.ensure(user_id).await?;
        sqlx::query("UPDATE users SET gold = ? WHERE user_id = ?")
            .bind(gold)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn ensure(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(INSERT_USER)
            .bind(user_id)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_or_create_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
        self.ensure(user_id).await.map_err(unavailable)?;
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, gold, xp, level FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(unavailable)?;
        Ok(row.into())
    }

    async fn apply_gold_delta(&self, user_id: &str, delta: i64) -> Result<(), StoreError> {
        self.ensure(user_id).await.map_err(unavailable)?;
        sqlx::query("UPDATE users SET gold = gold + ? WHERE user_id = ?")
            .bind(delta)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn apply_xp_delta(&self, user_id: &str, delta: u64) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await.map_err(unavailable)?;
        sqlx::query(INSERT_USER)
            .bind(user_id)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, gold, xp, level FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unavailable)?;
        let current = Profile::from(row);
        let (xp, level) = apply_xp(current.xp, current.level, delta);
        let xp = i64::try_from(xp).map_err(|_| StoreError::Rejected {
            user_id: user_id.to_string(),
            reason: format!("xp {xp} does not fit the users table"),
        })?;
        sqlx::query("UPDATE users SET xp = ?, level = ? WHERE user_id = ?")
            .bind(xp)
            .bind(i64::from(level))
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }

    async fn top_by_gold(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, GoldRow>(
            "SELECT user_id, gold FROM users ORDER BY gold DESC, user_id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(unavailable)?;
        Ok(rows
            .into_iter()
            .map(|r| LeaderboardEntry {
                user_id: r.user_id,
                gold: r.gold,
            })
            .collect())
    }
}
