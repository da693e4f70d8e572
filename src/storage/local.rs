use std::str::FromStr as _;

use tracing::{error, trace};

use super::ImageUpload;

/// Content-addressed image store backed by SQLite.
pub struct LocalStorage {
    pool: sqlx::SqlitePool,
}

impl LocalStorage {
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)
            .inspect_err(|error| error!(%error, %url, "Failed to open local image store"))?
            .create_if_missing(true);
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .inspect_err(|error| error!(%error, %url, "Failed to open local image store"))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images(
                path TEXT NOT NULL PRIMARY KEY,
                kind TEXT NOT NULL,
                content_type TEXT NOT NULL,
                body BLOB NOT NULL
            );
        "#,
        )
        .execute(&pool)
        .await
        .inspect_err(|error| error!(%error, %url, "Failed to execute DDL to image store"))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }
}

fn stored_path(upload: &ImageUpload) -> String {
    let hash = blake3::hash(&upload.body);
    let ext = upload
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".into());
    format!("/images/{}/{hash}.{ext}", upload.kind)
}

impl super::Client for LocalStorage {
    type Error = sqlx::Error;

    async fn put(&self, upload: ImageUpload) -> Result<String, Self::Error> {
        let path = stored_path(&upload);
        sqlx::query(
            r#"
            INSERT INTO images(path, kind, content_type, body)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path)
            DO UPDATE SET
                content_type = EXCLUDED.content_type,
                body = EXCLUDED.body
        "#,
        )
        .bind(&path)
        .bind(upload.kind.as_str())
        .bind(&upload.content_type)
        .bind(upload.body.as_ref())
        .execute(&self.pool)
        .await?;
        trace!(%path, "stored image");
        Ok(path)
    }
}
