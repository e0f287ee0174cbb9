//! Durable per-task storage for the watcher cursor.
//!
//! Each task owns one JSON document in `task_storage`. Writes always
//! overwrite the previous document; there is no compare-and-swap.
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

/// Stored document. Older documents used `lastTweetId` for the cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredState {
    #[serde(
        rename = "lastItemId",
        alias = "lastTweetId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_item_id: Option<String>,
}

impl StoredState {
    pub fn with_cursor(id: impl Into<String>) -> Self {
        Self {
            last_item_id: Some(id.into()),
        }
    }
}

#[async_trait]
pub trait TaskStorage: Send + Sync {
    async fn get(&self) -> Result<StoredState>;
    async fn set(&self, state: &StoredState) -> Result<()>;
}

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open {}", normalized))?;
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Expand a leading `~/` in file-backed SQLite URLs and create the parent
/// directory. In-memory and non-sqlite URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{}?{}", path, q),
        None => format!("sqlite://{}", path),
    }
}

/// `TaskStorage` backed by the `task_storage` SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: Pool,
    task: String,
}

impl SqliteStorage {
    pub fn new(pool: Pool, task: impl Into<String>) -> Self {
        Self {
            pool,
            task: task.into(),
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Raw stored document and its last write time, if any.
    pub async fn raw(&self) -> Result<Option<(String, String)>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT data, updated_at FROM task_storage WHERE task = ?")
                .bind(&self.task)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }
}

#[async_trait]
impl TaskStorage for SqliteStorage {
    #[instrument(skip_all, fields(task = %self.task))]
    async fn get(&self) -> Result<StoredState> {
        let data: Option<String> =
            sqlx::query_scalar("SELECT data FROM task_storage WHERE task = ?")
                .bind(&self.task)
                .fetch_optional(&self.pool)
                .await?;
        match data {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt storage document for task {}", self.task)),
            None => {
                debug!("no stored document yet");
                Ok(StoredState::default())
            }
        }
    }

    #[instrument(skip_all, fields(task = %self.task))]
    async fn set(&self, state: &StoredState) -> Result<()> {
        let data = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO task_storage (task, data, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(task) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
        )
        .bind(&self.task)
        .bind(&data)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        debug!(%data, "stored document written");
        Ok(())
    }
}
