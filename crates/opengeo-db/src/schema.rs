//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Free-form JSON (document fields,
//! embedded children, diffs, suggested values) lives in FLEXIBLE object
//! columns.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "review_queue_indexes",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Generic objects (sites)
-- =======================================================================
DEFINE TABLE generic_object SCHEMAFULL;
DEFINE FIELD label ON TABLE generic_object TYPE string;
DEFINE FIELD entity ON TABLE generic_object TYPE string;
DEFINE FIELD authorization ON TABLE generic_object TYPE string \
    ASSERT $value IN ['Reader', 'Contributor', 'Editor', 'Manager'];
DEFINE FIELD color ON TABLE generic_object TYPE option<string>;
DEFINE FIELD description ON TABLE generic_object TYPE option<string>;
DEFINE FIELD body ON TABLE generic_object TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_by ON TABLE generic_object TYPE string;
DEFINE FIELD updated_by ON TABLE generic_object TYPE string;
DEFINE FIELD created_at ON TABLE generic_object TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE generic_object TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_generic_object_entity ON TABLE generic_object \
    COLUMNS entity;

-- =======================================================================
-- Sub-objects (domains)
-- =======================================================================
DEFINE TABLE sub_object SCHEMAFULL;
DEFINE FIELD label ON TABLE sub_object TYPE string;
DEFINE FIELD entity ON TABLE sub_object TYPE string;
DEFINE FIELD authorization ON TABLE sub_object TYPE string \
    ASSERT $value IN ['Reader', 'Contributor', 'Editor', 'Manager'];
DEFINE FIELD color ON TABLE sub_object TYPE option<string>;
DEFINE FIELD description ON TABLE sub_object TYPE option<string>;
DEFINE FIELD body ON TABLE sub_object TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_by ON TABLE sub_object TYPE string;
DEFINE FIELD updated_by ON TABLE sub_object TYPE string;
DEFINE FIELD created_at ON TABLE sub_object TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE sub_object TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_sub_object_entity_label ON TABLE sub_object \
    COLUMNS entity, label UNIQUE;

-- =======================================================================
-- History (append-only)
-- =======================================================================
DEFINE TABLE history SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD object_id ON TABLE history TYPE string;
DEFINE FIELD entity ON TABLE history TYPE string;
DEFINE FIELD action ON TABLE history TYPE string \
    ASSERT $value IN ['Create', 'Update', 'Delete', 'Suggestion'];
DEFINE FIELD author ON TABLE history TYPE string;
DEFINE FIELD diff ON TABLE history TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD affected_count ON TABLE history TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE history TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_history_object_time ON TABLE history \
    COLUMNS object_id, created_at;
DEFINE INDEX idx_history_entity ON TABLE history COLUMNS entity;

-- =======================================================================
-- Suggestions
-- =======================================================================
DEFINE TABLE suggestion SCHEMAFULL;
DEFINE FIELD object_id ON TABLE suggestion TYPE string;
DEFINE FIELD entity ON TABLE suggestion TYPE string;
DEFINE FIELD path ON TABLE suggestion TYPE string;
DEFINE FIELD proposal ON TABLE suggestion TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD comment ON TABLE suggestion TYPE option<string>;
DEFINE FIELD author ON TABLE suggestion TYPE string;
DEFINE FIELD status ON TABLE suggestion TYPE string \
    ASSERT $value IN ['Pending', 'Accepted', 'Rejected'];
DEFINE FIELD created_at ON TABLE suggestion TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD reviewed_at ON TABLE suggestion TYPE option<datetime>;
DEFINE FIELD reviewed_by ON TABLE suggestion TYPE option<string>;
DEFINE INDEX idx_suggestion_object ON TABLE suggestion \
    COLUMNS object_id, status;

-- =======================================================================
-- Habilitations
-- =======================================================================
DEFINE TABLE habilitation SCHEMAFULL;
DEFINE FIELD login ON TABLE habilitation TYPE string;
DEFINE FIELD entity ON TABLE habilitation TYPE string;
DEFINE FIELD level ON TABLE habilitation TYPE string \
    ASSERT $value IN ['Reader', 'Contributor', 'Editor', 'Manager'];
DEFINE FIELD status ON TABLE habilitation TYPE string \
    ASSERT $value IN ['Pending', 'Granted', 'Rejected'];
DEFINE FIELD reason ON TABLE habilitation TYPE option<string>;
DEFINE FIELD requested_at ON TABLE habilitation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD decided_at ON TABLE habilitation TYPE option<datetime>;
DEFINE FIELD decided_by ON TABLE habilitation TYPE option<string>;
DEFINE INDEX idx_habilitation_user ON TABLE habilitation \
    COLUMNS login, entity;
";

// -----------------------------------------------------------------------
// Schema v2: review queues (pending suggestions and habilitations)
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX IF NOT EXISTS idx_suggestion_entity_status \
    ON TABLE suggestion COLUMNS entity, status;
DEFINE INDEX IF NOT EXISTS idx_habilitation_status \
    ON TABLE habilitation COLUMNS status, entity;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current_version = schema_version(db).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Highest applied migration version, `0` on an empty database.
pub async fn schema_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

/// Latest migration version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
