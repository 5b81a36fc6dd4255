use async_trait::async_trait;
use chrono::Utc;
use nh_core::{ArticleRecord, ArticleStorage, Error, Result, StoredArticle};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guid TEXT UNIQUE NOT NULL,
        title TEXT,
        description TEXT,
        url TEXT,
        published_at TEXT,
        comments_count INTEGER,
        created_at_utc INTEGER,
        rating REAL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_guid ON articles(guid)",
    "CREATE INDEX IF NOT EXISTS idx_published ON articles(published_at)",
];

/// Databases written before url uniqueness was enforced may hold duplicate
/// urls, in which case this index cannot be built.
const URL_UNIQUE_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_url_unique ON articles(url)";

pub const DEFAULT_DB_PATH: &str = "articles.sqlite";

pub struct SQLiteStorage {
    pool: SqlitePool,
}

impl SQLiteStorage {
    pub async fn new() -> Result<Self> {
        Self::new_with_path(DEFAULT_DB_PATH).await
    }

    pub async fn new_with_path(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }
        if let Err(e) = sqlx::query(URL_UNIQUE_INDEX).execute(&pool).await {
            warn!(path = %db_path.display(), "Unique url index not created: {}", e);
        }
        debug!(path = %db_path.display(), "SQLite storage ready");

        Ok(Self { pool })
    }

    fn row_to_article(row: &SqliteRow) -> Result<StoredArticle> {
        let read = |e: sqlx::Error| Error::Database(format!("Failed to read article row: {}", e));
        let comments_count: Option<i64> = row.try_get("comments_count").map_err(read)?;
        Ok(StoredArticle {
            id: row.try_get("id").map_err(read)?,
            created_at: row.try_get("created_at_utc").map_err(read)?,
            article: ArticleRecord {
                guid: row.try_get("guid").map_err(read)?,
                title: row.try_get("title").map_err(read)?,
                description: row.try_get("description").map_err(read)?,
                url: row.try_get("url").map_err(read)?,
                published_at: row.try_get("published_at").map_err(read)?,
                comments_count: comments_count.and_then(|c| u32::try_from(c).ok()),
                rating: row.try_get("rating").map_err(read)?,
            },
        })
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn exists(&self, url: &str) -> Result<bool> {
        if url.is_empty() {
            return Ok(false);
        }
        let row = sqlx::query("SELECT 1 FROM articles WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to check article: {}", e)))?;
        Ok(row.is_some())
    }

    async fn insert(&self, record: &ArticleRecord) -> Result<Option<i64>> {
        // Both unique indexes are enforced by SQLite; an ignored row means
        // the url or guid is already present.
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles
            (guid, title, description, url, published_at, comments_count, created_at_utc, rating)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.guid)
        .bind(record.title.as_deref())
        .bind(&record.description)
        .bind(&record.url)
        .bind(record.published_at.as_deref())
        .bind(record.comments_count.map(i64::from))
        .bind(Utc::now().timestamp())
        .bind(record.rating)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to store article: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(result.last_insert_rowid()))
        }
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to get article: {}", e)))?;
        row.as_ref().map(Self::row_to_article).transpose()
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count articles: {}", e)))?;
        Ok(count as usize)
    }
}
