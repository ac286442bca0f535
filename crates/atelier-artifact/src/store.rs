//! Version Store
//!
//! Persistent, append-only version history for artifacts over SQLite.
//! Versions are keyed by (artifact id, index); the index is assigned
//! transactionally so concurrent appends against one artifact can never
//! interleave into a corrupted order. Existing versions are never
//! overwritten or deleted by the append path.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::document::{Artifact, ArtifactKind, ArtifactVersion};
use crate::error::{Error, Result};

/// SQLite-backed artifact and version store
pub struct VersionStore {
    pool: SqlitePool,
}

impl VersionStore {
    /// Create a new store with the given database pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS artifact_versions (
                artifact_id TEXT NOT NULL,
                idx INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (artifact_id, idx)
            );

            CREATE INDEX IF NOT EXISTS idx_artifacts_user_id ON artifacts(user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Connectivity check for health reporting
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Save a new artifact row
    pub async fn create_artifact(&self, artifact: &Artifact) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO artifacts (id, user_id, title, kind, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(artifact.id.to_string())
        .bind(&artifact.user_id)
        .bind(&artifact.title)
        .bind(artifact.kind.as_str())
        .bind(artifact.created_at.to_rfc3339())
        .bind(artifact.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load an artifact by ID
    pub async fn get_artifact(&self, artifact_id: Uuid) -> Result<Option<Artifact>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, kind, created_at, updated_at
            FROM artifacts
            WHERE id = ?
            "#,
        )
        .bind(artifact_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_artifact).transpose()
    }

    /// List a user's artifacts, most recently updated first
    pub async fn list_artifacts(&self, user_id: &str) -> Result<Vec<Artifact>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, kind, created_at, updated_at
            FROM artifacts
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_artifact).collect()
    }

    /// Rename an artifact (the kind is immutable; only titles change)
    pub async fn rename_artifact(&self, artifact_id: Uuid, title: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE artifacts SET title = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(Utc::now().to_rfc3339())
        .bind(artifact_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an artifact and its entire version history
    pub async fn delete_artifact(&self, artifact_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM artifact_versions WHERE artifact_id = ?")
            .bind(artifact_id.to_string())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM artifacts WHERE id = ?")
            .bind(artifact_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Append a new version as the highest index
    ///
    /// Never overwrites an existing version. The index is assigned
    /// inside the transaction so per-artifact appends serialize.
    pub async fn append_version(&self, artifact_id: Uuid, content: &str) -> Result<ArtifactVersion> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM artifacts WHERE id = ?")
            .bind(artifact_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::ArtifactNotFound(artifact_id));
        }

        let row = sqlx::query(
            "SELECT COALESCE(MAX(idx), -1) + 1 AS next_idx FROM artifact_versions WHERE artifact_id = ?",
        )
        .bind(artifact_id.to_string())
        .fetch_one(&mut *tx)
        .await?;
        let next_idx: i64 = row.get("next_idx");

        let created_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO artifact_versions (artifact_id, idx, content, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(artifact_id.to_string())
        .bind(next_idx)
        .bind(content)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE artifacts SET updated_at = ? WHERE id = ?")
            .bind(created_at.to_rfc3339())
            .bind(artifact_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ArtifactVersion {
            artifact_id,
            index: next_idx as usize,
            content: content.to_string(),
            created_at,
        })
    }

    /// Get a version by index; `None` when the index does not exist
    pub async fn get_version(
        &self,
        artifact_id: Uuid,
        index: usize,
    ) -> Result<Option<ArtifactVersion>> {
        let row = sqlx::query(
            r#"
            SELECT artifact_id, idx, content, created_at
            FROM artifact_versions
            WHERE artifact_id = ? AND idx = ?
            "#,
        )
        .bind(artifact_id.to_string())
        .bind(index as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_version).transpose()
    }

    /// Get the current (highest-index) version
    pub async fn latest_version(&self, artifact_id: Uuid) -> Result<Option<ArtifactVersion>> {
        let row = sqlx::query(
            r#"
            SELECT artifact_id, idx, content, created_at
            FROM artifact_versions
            WHERE artifact_id = ?
            ORDER BY idx DESC
            LIMIT 1
            "#,
        )
        .bind(artifact_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_version).transpose()
    }

    /// List all versions in creation order
    pub async fn list_versions(&self, artifact_id: Uuid) -> Result<Vec<ArtifactVersion>> {
        let rows = sqlx::query(
            r#"
            SELECT artifact_id, idx, content, created_at
            FROM artifact_versions
            WHERE artifact_id = ?
            ORDER BY idx ASC
            "#,
        )
        .bind(artifact_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_version).collect()
    }

    /// Number of committed versions for an artifact
    pub async fn version_count(&self, artifact_id: Uuid) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM artifact_versions WHERE artifact_id = ?")
            .bind(artifact_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }
}

fn row_to_artifact(row: sqlx::sqlite::SqliteRow) -> Result<Artifact> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Artifact {
        id: Uuid::parse_str(&id).map_err(|e| Error::Internal(e.to_string()))?,
        user_id: row.get("user_id"),
        title: row.get("title"),
        kind: kind
            .parse::<ArtifactKind>()
            .map_err(Error::Internal)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn row_to_version(row: sqlx::sqlite::SqliteRow) -> Result<ArtifactVersion> {
    let artifact_id: String = row.get("artifact_id");
    let idx: i64 = row.get("idx");
    let created_at: String = row.get("created_at");

    Ok(ArtifactVersion {
        artifact_id: Uuid::parse_str(&artifact_id).map_err(|e| Error::Internal(e.to_string()))?,
        index: idx as usize,
        content: row.get("content"),
        created_at: parse_timestamp(&created_at),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> VersionStore {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let store = VersionStore::new(pool);
        store.init().await.unwrap();
        store
    }

    async fn seed_artifact(store: &VersionStore, kind: ArtifactKind) -> Artifact {
        let artifact = Artifact::new("user1", "Test", kind);
        store.create_artifact(&artifact).await.unwrap();
        artifact
    }

    #[tokio::test]
    async fn test_create_and_get_artifact() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Text).await;

        let loaded = store.get_artifact(artifact.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, artifact.id);
        assert_eq!(loaded.kind, ArtifactKind::Text);
        assert_eq!(loaded.user_id, "user1");
    }

    #[tokio::test]
    async fn test_append_assigns_sequential_indexes() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Text).await;

        let v0 = store.append_version(artifact.id, "first").await.unwrap();
        let v1 = store.append_version(artifact.id, "second").await.unwrap();

        assert_eq!(v0.index, 0);
        assert_eq!(v1.index, 1);

        let versions = store.list_versions(artifact.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].content, "first");
        assert_eq!(versions[1].content, "second");
    }

    #[tokio::test]
    async fn test_append_never_mutates_existing_versions() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Code).await;

        store.append_version(artifact.id, "v0").await.unwrap();
        store.append_version(artifact.id, "v1").await.unwrap();

        let v0 = store.get_version(artifact.id, 0).await.unwrap().unwrap();
        assert_eq!(v0.content, "v0");
    }

    #[tokio::test]
    async fn test_append_to_missing_artifact_fails() {
        let store = setup_test_db().await;
        let err = store.append_version(Uuid::new_v4(), "content").await;
        assert!(matches!(err, Err(Error::ArtifactNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_version_out_of_range_is_none() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Text).await;

        store.append_version(artifact.id, "v0").await.unwrap();
        store.append_version(artifact.id, "v1").await.unwrap();

        let missing = store.get_version(artifact.id, 5).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_latest_version() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Slide).await;

        assert!(store.latest_version(artifact.id).await.unwrap().is_none());

        store.append_version(artifact.id, "a").await.unwrap();
        store.append_version(artifact.id, "b").await.unwrap();

        let latest = store.latest_version(artifact.id).await.unwrap().unwrap();
        assert_eq!(latest.index, 1);
        assert_eq!(latest.content, "b");
    }

    #[tokio::test]
    async fn test_rename_artifact() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Text).await;

        assert!(store.rename_artifact(artifact.id, "Renamed").await.unwrap());
        let loaded = store.get_artifact(artifact.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Renamed");
        assert_eq!(loaded.kind, ArtifactKind::Text);
    }

    #[tokio::test]
    async fn test_delete_artifact_removes_versions() {
        let store = setup_test_db().await;
        let artifact = seed_artifact(&store, ArtifactKind::Chart).await;
        store.append_version(artifact.id, "{}").await.unwrap();

        assert!(store.delete_artifact(artifact.id).await.unwrap());
        assert!(store.get_artifact(artifact.id).await.unwrap().is_none());
        assert_eq!(store.version_count(artifact.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_artifacts_per_user() {
        let store = setup_test_db().await;
        seed_artifact(&store, ArtifactKind::Text).await;
        seed_artifact(&store, ArtifactKind::Code).await;

        let other = Artifact::new("user2", "Other", ArtifactKind::Text);
        store.create_artifact(&other).await.unwrap();

        assert_eq!(store.list_artifacts("user1").await.unwrap().len(), 2);
        assert_eq!(store.list_artifacts("user2").await.unwrap().len(), 1);
    }
}
