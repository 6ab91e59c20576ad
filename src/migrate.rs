use anyhow::Result;
use sqlx::SqlitePool;

/// Create every table and index the pipeline needs. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS connections (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            repo_name TEXT NOT NULL,
            default_branch TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            file_count INTEGER NOT NULL DEFAULT 0,
            module_count INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER,
            error_message TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE(workspace_id, repo_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS modules (
            id TEXT PRIMARY KEY,
            connection_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            module_name TEXT NOT NULL,
            module_type TEXT NOT NULL DEFAULT 'unknown',
            language TEXT,
            raw_content TEXT NOT NULL,
            dependencies_json TEXT NOT NULL DEFAULT '[]',
            exports_json TEXT NOT NULL DEFAULT '[]',
            functions_json TEXT NOT NULL DEFAULT '[]',
            classes_json TEXT NOT NULL DEFAULT '[]',
            types_json TEXT NOT NULL DEFAULT '[]',
            summary TEXT,
            embedding BLOB,
            updated_at INTEGER NOT NULL,
            UNIQUE(connection_id, file_path),
            FOREIGN KEY (connection_id) REFERENCES connections(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            source_type TEXT NOT NULL,
            chunk_index INTEGER NOT NULL DEFAULT 0,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            UNIQUE(source_id, source_type, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            artifact_type TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One architecture summary per workspace; other artifact types may repeat.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_artifacts_architecture
        ON artifacts(workspace_id) WHERE artifact_type = 'architecture_summary'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_modules_connection ON modules(connection_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_modules_type ON modules(connection_id, module_type)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_source_type ON embeddings(source_type)")
        .execute(pool)
        .await?;

    Ok(())
}
