//! PostgreSQL schema definitions and migrations.

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Initialize the database schema.
pub async fn initialize_schema(client: &deadpool_postgres::Client) -> StorageResult<()> {
    let current_version = get_schema_version(client).await?;

    if current_version == 0 {
        create_schema_v1(client).await?;
        set_schema_version(client, 1).await?;
        migrate_schema(client, 1).await?;
    } else if current_version < SCHEMA_VERSION {
        migrate_schema(client, current_version).await?;
    }

    tracing::debug!(version = SCHEMA_VERSION, "PostgreSQL schema is current");
    Ok(())
}

/// Get the current schema version.
async fn get_schema_version(client: &deadpool_postgres::Client) -> StorageResult<i32> {
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            )",
            &[],
        )
        .await
        .map_err(|e| migration_error(format!("Failed to create schema_version table: {}", e)))?;

    let row = client
        .query_opt("SELECT version FROM schema_version LIMIT 1", &[])
        .await
        .map_err(|e| migration_error(format!("Failed to query schema version: {}", e)))?;

    Ok(row.map(|r| r.get::<_, i32>(0)).unwrap_or(0))
}

/// Set the schema version.
async fn set_schema_version(client: &deadpool_postgres::Client, version: i32) -> StorageResult<()> {
    client
        .execute("DELETE FROM schema_version", &[])
        .await
        .map_err(|e| migration_error(format!("Failed to clear schema_version: {}", e)))?;

    client
        .execute(
            "INSERT INTO schema_version (version) VALUES ($1)",
            &[&version],
        )
        .await
        .map_err(|e| migration_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

/// Create the initial schema (version 1): entity tables.
async fn create_schema_v1(client: &deadpool_postgres::Client) -> StorageResult<()> {
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price NUMERIC(12, 2) NOT NULL,
                discount_percentage INTEGER NOT NULL DEFAULT 0,
                stock INTEGER NOT NULL DEFAULT 0,
                image_url TEXT NOT NULL DEFAULT '',
                category_id BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            &[],
        )
        .await
        .map_err(|e| migration_error(format!("Failed to create products table: {}", e)))?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS invoices (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                total_amount NUMERIC(12, 2) NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            &[],
        )
        .await
        .map_err(|e| migration_error(format!("Failed to create invoices table: {}", e)))?;

    Ok(())
}

/// Migrate schema from one version to the next.
async fn migrate_schema(
    client: &deadpool_postgres::Client,
    from_version: i32,
) -> StorageResult<()> {
    let mut version = from_version;

    while version < SCHEMA_VERSION {
        match version {
            1 => migrate_v1_to_v2(client).await?,
            2 => migrate_v2_to_v3(client).await?,
            _ => {
                return Err(migration_error(format!(
                    "Unknown schema version: {}",
                    version
                )));
            }
        }
        version += 1;
        set_schema_version(client, version).await?;
        tracing::info!(version = version, "Migrated PostgreSQL schema");
    }

    Ok(())
}

/// v1 -> v2: Add the search outbox.
async fn migrate_v1_to_v2(client: &deadpool_postgres::Client) -> StorageResult<()> {
    let migrations = [
        "CREATE TABLE IF NOT EXISTS search_outbox (
            id BIGSERIAL PRIMARY KEY,
            entity TEXT NOT NULL,
            document_id TEXT NOT NULL,
            op TEXT NOT NULL,
            payload JSONB,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            processed_at TIMESTAMPTZ
        )",
        "CREATE INDEX IF NOT EXISTS idx_search_outbox_pending
            ON search_outbox (entity, id) WHERE processed_at IS NULL",
    ];

    for sql in &migrations {
        client
            .execute(*sql, &[])
            .await
            .map_err(|e| migration_error(format!("Migration v1->v2 failed: {}", e)))?;
    }

    Ok(())
}

/// v2 -> v3: Dead-lettering and retention support for the outbox.
async fn migrate_v2_to_v3(client: &deadpool_postgres::Client) -> StorageResult<()> {
    let migrations = [
        "ALTER TABLE search_outbox ADD COLUMN IF NOT EXISTS dead_at TIMESTAMPTZ",
        "DROP INDEX IF EXISTS idx_search_outbox_pending",
        "CREATE INDEX IF NOT EXISTS idx_search_outbox_pending
            ON search_outbox (entity, id) WHERE processed_at IS NULL AND dead_at IS NULL",
        "CREATE INDEX IF NOT EXISTS idx_search_outbox_processed
            ON search_outbox (entity, processed_at) WHERE processed_at IS NOT NULL",
    ];

    for sql in &migrations {
        client
            .execute(*sql, &[])
            .await
            .map_err(|e| migration_error(format!("Migration v2->v3 failed: {}", e)))?;
    }

    Ok(())
}

fn migration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::MigrationError { message })
}
