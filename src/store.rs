//! SQLite-backed persistence for connections, modules, embeddings and
//! workspace artifacts.
//!
//! [`Store`] owns every SQL statement the pipeline issues. Writes are
//! upserts keyed by each table's natural key, so re-running a stage
//! overwrites rows in place instead of duplicating them:
//!
//! | Table | Natural key |
//! |-------|-------------|
//! | `connections` | `id` (and `(workspace_id, repo_name)`) |
//! | `modules` | `(connection_id, file_path)` |
//! | `embeddings` | `(source_id, source_type, chunk_index)` |
//! | `artifacts` | `workspace_id` for `architecture_summary` |

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{
    ArchitectureSummary, Connection, ConnectionStatus, EmbeddingMatch, EmbeddingRecord, Module,
    ModuleType, NewModule, ARCHITECTURE_ARTIFACT_TYPE, MODULE_SOURCE_TYPE,
};

const MODULE_COLUMNS: &str = "id, connection_id, file_path, module_name, module_type, language, \
     raw_content, dependencies_json, exports_json, functions_json, classes_json, types_json, \
     summary, embedding, updated_at";

const CONNECTION_COLUMNS: &str = "id, workspace_id, repo_name, default_branch, status, file_count, \
     module_count, last_synced_at, error_message, created_at";

/// Filters for [`Store::query_modules`].
#[derive(Debug, Clone, Default)]
pub struct ModuleQuery {
    pub connection_id: String,
    pub module_type: Option<ModuleType>,
    /// Case-insensitive substring matched against path and summary.
    pub text: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ----- connections -----

    pub async fn create_connection(
        &self,
        workspace_id: &str,
        repo_name: &str,
        default_branch: &str,
    ) -> Result<Connection> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO connections (id, workspace_id, repo_name, default_branch, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(repo_name)
        .bind(default_branch)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "Failed to create connection for {} in workspace {}",
                repo_name, workspace_id
            )
        })?;

        self.get_connection(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("connection {} vanished after insert", id))
    }

    pub async fn get_connection(&self, id: &str) -> Result<Option<Connection>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM connections WHERE id = ?",
            CONNECTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(connection_from_row).transpose()
    }

    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM connections ORDER BY workspace_id, repo_name",
            CONNECTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(connection_from_row).collect()
    }

    /// Atomically move a connection into `syncing`, clearing any previous
    /// error. Returns `false` when another run holds it (status already
    /// `syncing`) and `force` is not set, or when the id is unknown.
    pub async fn try_begin_sync(&self, id: &str, force: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET status = 'syncing', error_message = NULL
            WHERE id = ? AND (status != 'syncing' OR ?)
            "#,
        )
        .bind(id)
        .bind(force)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_file_count(&self, id: &str, file_count: i64) -> Result<()> {
        sqlx::query("UPDATE connections SET file_count = ? WHERE id = ?")
            .bind(file_count)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_module_count(&self, id: &str, module_count: i64) -> Result<()> {
        sqlx::query("UPDATE connections SET module_count = ? WHERE id = ?")
            .bind(module_count)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_ready(&self, id: &str, module_count: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE connections
            SET status = 'ready', module_count = ?, last_synced_at = ?, error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(module_count)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_error(&self, id: &str, message: &str) -> Result<()> {
        sqlx::query("UPDATE connections SET status = 'error', error_message = ? WHERE id = ?")
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ----- modules -----

    /// Insert or update the module for `(connection_id, file_path)` and
    /// return its id. An existing row keeps its id, summary and embedding.
    pub async fn upsert_module(&self, module: &NewModule) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let new_id = uuid::Uuid::new_v4().to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO modules (id, connection_id, file_path, module_name, module_type, language,
                                 raw_content, dependencies_json, exports_json, functions_json,
                                 classes_json, types_json, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(connection_id, file_path) DO UPDATE SET
                module_name = excluded.module_name,
                module_type = excluded.module_type,
                language = excluded.language,
                raw_content = excluded.raw_content,
                dependencies_json = excluded.dependencies_json,
                exports_json = excluded.exports_json,
                functions_json = excluded.functions_json,
                classes_json = excluded.classes_json,
                types_json = excluded.types_json,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&new_id)
        .bind(&module.connection_id)
        .bind(&module.file_path)
        .bind(&module.module_name)
        .bind(module.module_type.as_str())
        .bind(module.language.map(|l| l.as_str()))
        .bind(&module.raw_content)
        .bind(serde_json::to_string(&module.dependencies)?)
        .bind(serde_json::to_string(&module.exports)?)
        .bind(serde_json::to_string(&module.functions)?)
        .bind(serde_json::to_string(&module.classes)?)
        .bind(serde_json::to_string(&module.types)?)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to store module {}", module.file_path))?;

        Ok(row.get("id"))
    }

    pub async fn get_module_by_path(
        &self,
        connection_id: &str,
        file_path: &str,
    ) -> Result<Option<Module>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM modules WHERE connection_id = ? AND file_path = ?",
            MODULE_COLUMNS
        ))
        .bind(connection_id)
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(module_from_row).transpose()
    }

    pub async fn module_paths(&self, connection_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT file_path FROM modules WHERE connection_id = ? ORDER BY file_path")
            .bind(connection_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("file_path")).collect())
    }

    pub async fn count_modules(&self, connection_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM modules WHERE connection_id = ?")
            .bind(connection_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("cnt"))
    }

    /// Delete the modules at `paths` together with their embedding records.
    /// Returns the number of modules removed.
    pub async fn delete_modules(&self, connection_id: &str, paths: &[String]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for path in paths {
            sqlx::query(
                r#"
                DELETE FROM embeddings
                WHERE source_type = ?
                  AND source_id IN (SELECT id FROM modules WHERE connection_id = ? AND file_path = ?)
                "#,
            )
            .bind(MODULE_SOURCE_TYPE)
            .bind(connection_id)
            .bind(path)
            .execute(&mut *tx)
            .await?;

            let result = sqlx::query("DELETE FROM modules WHERE connection_id = ? AND file_path = ?")
                .bind(connection_id)
                .bind(path)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }

    pub async fn modules_missing_summary(&self, connection_id: &str) -> Result<Vec<Module>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM modules WHERE connection_id = ? AND summary IS NULL ORDER BY file_path",
            MODULE_COLUMNS
        ))
        .bind(connection_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(module_from_row).collect()
    }

    pub async fn modules_by_ids(&self, ids: &[String]) -> Result<Vec<Module>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM modules WHERE id IN ({}) ORDER BY file_path",
            MODULE_COLUMNS, placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(module_from_row).collect()
    }

    pub async fn set_summary(&self, module_id: &str, summary: &str) -> Result<()> {
        sqlx::query("UPDATE modules SET summary = ? WHERE id = ?")
            .bind(summary)
            .bind(module_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_module_embedding(&self, module_id: &str, vector: &[f32]) -> Result<()> {
        sqlx::query("UPDATE modules SET embedding = ? WHERE id = ?")
            .bind(vec_to_blob(vector))
            .bind(module_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Every summarized module across all connections of a workspace.
    pub async fn summarized_modules_for_workspace(&self, workspace_id: &str) -> Result<Vec<Module>> {
        let columns = MODULE_COLUMNS
            .split(", ")
            .map(|c| format!("m.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM modules m
            JOIN connections c ON c.id = m.connection_id
            WHERE c.workspace_id = ? AND m.summary IS NOT NULL
            ORDER BY c.repo_name, m.file_path
            "#,
            columns
        ))
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(module_from_row).collect()
    }

    pub async fn query_modules(&self, query: &ModuleQuery) -> Result<Vec<Module>> {
        let mut sql = format!(
            "SELECT {} FROM modules WHERE connection_id = ?",
            MODULE_COLUMNS
        );
        if query.module_type.is_some() {
            sql.push_str(" AND module_type = ?");
        }
        if query.text.is_some() {
            sql.push_str(" AND (file_path LIKE ? OR COALESCE(summary, '') LIKE ?)");
        }
        sql.push_str(" ORDER BY file_path LIMIT ?");

        let mut q = sqlx::query(&sql).bind(&query.connection_id);
        if let Some(module_type) = query.module_type {
            q = q.bind(module_type.as_str());
        }
        if let Some(text) = &query.text {
            let pattern = format!("%{}%", text);
            q = q.bind(pattern.clone()).bind(pattern);
        }
        q = q.bind(query.limit.unwrap_or(-1));

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(module_from_row).collect()
    }

    // ----- embeddings -----

    pub async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO embeddings (id, source_id, source_type, chunk_index, content, embedding,
                                    metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_id, source_type, chunk_index) DO UPDATE SET
                content = excluded.content,
                embedding = excluded.embedding,
                metadata_json = excluded.metadata_json,
                created_at = excluded.created_at
            "#,
        )
        .bind(&id)
        .bind(&record.source_id)
        .bind(&record.source_type)
        .bind(record.chunk_index)
        .bind(&record.content)
        .bind(vec_to_blob(&record.vector))
        .bind(record.metadata.to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_embeddings(&self, source_type: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM embeddings WHERE source_type = ?")
            .bind(source_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("cnt"))
    }

    /// Brute-force cosine similarity over stored embedding records.
    pub async fn vector_search(
        &self,
        query_vec: &[f32],
        source_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EmbeddingMatch>> {
        let rows = match source_type {
            Some(source_type) => {
                sqlx::query(
                    "SELECT source_id, source_type, chunk_index, content, embedding, metadata_json \
                     FROM embeddings WHERE source_type = ?",
                )
                .bind(source_type)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT source_id, source_type, chunk_index, content, embedding, metadata_json \
                     FROM embeddings",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut matches: Vec<EmbeddingMatch> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let metadata_json: String = row.get("metadata_json");
                EmbeddingMatch {
                    source_id: row.get("source_id"),
                    source_type: row.get("source_type"),
                    chunk_index: row.get("chunk_index"),
                    content: row.get("content"),
                    metadata: serde_json::from_str(&metadata_json)
                        .unwrap_or(serde_json::json!({})),
                    score: cosine_similarity(query_vec, &blob_to_vec(&blob)),
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);

        Ok(matches)
    }

    // ----- artifacts -----

    /// Create or overwrite the workspace's single architecture summary.
    pub async fn upsert_architecture_summary(
        &self,
        workspace_id: &str,
        title: &str,
        content: &str,
    ) -> Result<ArchitectureSummary> {
        let now = chrono::Utc::now().timestamp();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO artifacts (id, workspace_id, artifact_type, title, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(workspace_id) WHERE artifact_type = 'architecture_summary' DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(ARCHITECTURE_ARTIFACT_TYPE)
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store architecture summary for {}", workspace_id))?;

        self.get_architecture_summary(workspace_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("architecture summary for {} vanished", workspace_id))
    }

    pub async fn get_architecture_summary(
        &self,
        workspace_id: &str,
    ) -> Result<Option<ArchitectureSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, workspace_id, title, content, created_at, updated_at
            FROM artifacts
            WHERE workspace_id = ? AND artifact_type = ?
            "#,
        )
        .bind(workspace_id)
        .bind(ARCHITECTURE_ARTIFACT_TYPE)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ArchitectureSummary {
            id: r.get("id"),
            workspace_id: r.get("workspace_id"),
            title: r.get("title"),
            content: r.get("content"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }
}

fn connection_from_row(row: &SqliteRow) -> Result<Connection> {
    let status: String = row.get("status");
    Ok(Connection {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        repo_name: row.get("repo_name"),
        default_branch: row.get("default_branch"),
        status: status.parse::<ConnectionStatus>()?,
        file_count: row.get("file_count"),
        module_count: row.get("module_count"),
        last_synced_at: row.get("last_synced_at"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
    })
}

fn module_from_row(row: &SqliteRow) -> Result<Module> {
    let module_type: String = row.get("module_type");
    let embedding: Option<Vec<u8>> = row.get("embedding");
    Ok(Module {
        id: row.get("id"),
        connection_id: row.get("connection_id"),
        file_path: row.get("file_path"),
        module_name: row.get("module_name"),
        module_type: module_type.parse().unwrap_or(ModuleType::Unknown),
        language: row.get("language"),
        raw_content: row.get("raw_content"),
        dependencies: json_list(row, "dependencies_json")?,
        exports: json_list(row, "exports_json")?,
        functions: json_list(row, "functions_json")?,
        classes: json_list(row, "classes_json")?,
        types: json_list(row, "types_json")?,
        summary: row.get("summary"),
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
        updated_at: row.get("updated_at"),
    })
}

fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).with_context(|| format!("Corrupt {} column", column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;

    async fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::connect_path(&dir.path().join("test.sqlite"))
            .await
            .unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();
        (dir, Store::new(pool))
    }

    fn new_module(connection_id: &str, path: &str, content: &str) -> NewModule {
        NewModule {
            connection_id: connection_id.to_string(),
            file_path: path.to_string(),
            module_name: crate::filter::module_name(path),
            module_type: ModuleType::Service,
            language: Some(Language::TypeScript),
            raw_content: content.to_string(),
            dependencies: vec!["./db".into()],
            exports: vec!["run".into()],
            functions: vec!["run".into()],
            classes: vec![],
            types: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_module_keeps_id_and_summary() {
        let (_dir, store) = test_store().await;
        let conn = store.create_connection("ws", "acme/web", "main").await.unwrap();

        let first = store
            .upsert_module(&new_module(&conn.id, "src/services/a.ts", "v1"))
            .await
            .unwrap();
        store.set_summary(&first, "Runs things.").await.unwrap();
        let second = store
            .upsert_module(&new_module(&conn.id, "src/services/a.ts", "v2"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count_modules(&conn.id).await.unwrap(), 1);
        let module = store
            .get_module_by_path(&conn.id, "src/services/a.ts")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(module.raw_content, "v2");
        assert_eq!(module.summary.as_deref(), Some("Runs things."));
        assert_eq!(module.language.as_deref(), Some("typescript"));
        assert_eq!(module.dependencies, vec!["./db"]);
    }

    #[tokio::test]
    async fn begin_sync_rejects_a_second_run_unless_forced() {
        let (_dir, store) = test_store().await;
        let conn = store.create_connection("ws", "acme/web", "main").await.unwrap();
        store.mark_error(&conn.id, "boom").await.unwrap();

        assert!(store.try_begin_sync(&conn.id, false).await.unwrap());
        let syncing = store.get_connection(&conn.id).await.unwrap().unwrap();
        assert_eq!(syncing.status, ConnectionStatus::Syncing);
        assert!(syncing.error_message.is_none());

        assert!(!store.try_begin_sync(&conn.id, false).await.unwrap());
        assert!(store.try_begin_sync(&conn.id, true).await.unwrap());
        assert!(!store.try_begin_sync("missing", true).await.unwrap());
    }

    #[tokio::test]
    async fn delete_modules_removes_their_embeddings() {
        let (_dir, store) = test_store().await;
        let conn = store.create_connection("ws", "acme/web", "main").await.unwrap();
        let keep = store
            .upsert_module(&new_module(&conn.id, "src/keep.ts", "x"))
            .await
            .unwrap();
        let gone = store
            .upsert_module(&new_module(&conn.id, "src/gone.ts", "y"))
            .await
            .unwrap();
        for id in [&keep, &gone] {
            store
                .upsert_embedding(&EmbeddingRecord {
                    source_id: id.clone(),
                    source_type: MODULE_SOURCE_TYPE.to_string(),
                    chunk_index: 0,
                    content: "text".into(),
                    vector: vec![1.0, 0.0],
                    metadata: serde_json::json!({}),
                })
                .await
                .unwrap();
        }

        let removed = store
            .delete_modules(&conn.id, &["src/gone.ts".to_string(), "src/never.ts".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.module_paths(&conn.id).await.unwrap(), vec!["src/keep.ts"]);
        assert_eq!(store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedding_upsert_overwrites_same_chunk() {
        let (_dir, store) = test_store().await;
        let mut record = EmbeddingRecord {
            source_id: "m1".into(),
            source_type: MODULE_SOURCE_TYPE.to_string(),
            chunk_index: 0,
            content: "first".into(),
            vector: vec![1.0, 0.0],
            metadata: serde_json::json!({"file_path": "a.ts"}),
        };
        store.upsert_embedding(&record).await.unwrap();
        record.content = "second".into();
        record.vector = vec![0.0, 1.0];
        store.upsert_embedding(&record).await.unwrap();

        assert_eq!(store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 1);
        let hits = store
            .vector_search(&[0.0, 1.0], Some(MODULE_SOURCE_TYPE), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "second");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[0].metadata["file_path"], "a.ts");
    }

    #[tokio::test]
    async fn architecture_summary_is_single_per_workspace() {
        let (_dir, store) = test_store().await;
        let first = store
            .upsert_architecture_summary("ws", "Architecture", "one")
            .await
            .unwrap();
        let second = store
            .upsert_architecture_summary("ws", "Architecture", "two")
            .await
            .unwrap();
        store
            .upsert_architecture_summary("other", "Architecture", "three")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "two");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artifacts WHERE workspace_id = 'ws'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn query_modules_filters_by_type_and_text() {
        let (_dir, store) = test_store().await;
        let conn = store.create_connection("ws", "acme/web", "main").await.unwrap();
        let billing = store
            .upsert_module(&new_module(&conn.id, "src/services/billing.ts", "x"))
            .await
            .unwrap();
        store
            .upsert_module(&NewModule {
                module_type: ModuleType::Component,
                ..new_module(&conn.id, "src/components/Nav.tsx", "y")
            })
            .await
            .unwrap();
        store.set_summary(&billing, "Charges customers via Stripe.").await.unwrap();

        let services = store
            .query_modules(&ModuleQuery {
                connection_id: conn.id.clone(),
                module_type: Some(ModuleType::Service),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(services.len(), 1);

        let stripe = store
            .query_modules(&ModuleQuery {
                connection_id: conn.id.clone(),
                text: Some("stripe".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stripe.len(), 1);
        assert_eq!(stripe[0].file_path, "src/services/billing.ts");

        let limited = store
            .query_modules(&ModuleQuery {
                connection_id: conn.id.clone(),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn workspace_summaries_span_connections() {
        let (_dir, store) = test_store().await;
        let web = store.create_connection("ws", "acme/web", "main").await.unwrap();
        let api = store.create_connection("ws", "acme/api", "main").await.unwrap();
        let elsewhere = store.create_connection("other", "acme/cli", "main").await.unwrap();

        for (conn, path) in [(&web, "src/a.ts"), (&api, "src/b.ts"), (&elsewhere, "src/c.ts")] {
            let id = store.upsert_module(&new_module(&conn.id, path, "x")).await.unwrap();
            store.set_summary(&id, "Does work.").await.unwrap();
        }
        store
            .upsert_module(&new_module(&web.id, "src/unsummarized.ts", "x"))
            .await
            .unwrap();

        let modules = store.summarized_modules_for_workspace("ws").await.unwrap();
        let paths: Vec<_> = modules.iter().map(|m| m.file_path.as_str()).collect();
        assert_eq!(paths, vec!["src/b.ts", "src/a.ts"]);
    }
}
