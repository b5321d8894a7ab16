//! Versioned schema upgrades.
//!
//! Each [`Migration`] declares the version it upgrades the schema *to*.
//! Pending steps run one at a time, each in its own transaction together
//! with the update of the `version` row, so a failed step leaves the
//! database at the last fully applied version.

use rusqlite::{Connection, OptionalExtension, Transaction};
use thiserror::Error;
use tracing::info;

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "empty initial schema",
        up: noop,
    },
    Migration {
        version: 2,
        description: "create shortcut table",
        up: create_shortcut_table,
    },
];

fn noop(_tx: &Transaction<'_>) -> rusqlite::Result<()> {
    Ok(())
}

fn create_shortcut_table(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "
        DROP TABLE IF EXISTS shortcut;

        CREATE TABLE shortcut (
            shortcut    TEXT PRIMARY KEY,
            homeserver  TEXT NOT NULL,
            auth_token  BLOB NOT NULL,
            ciphertext  BLOB NOT NULL
        );
        ",
    )
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to create version table: {0}")]
    VersionTable(#[source] rusqlite::Error),
    #[error("failed to query current version: {0}")]
    QueryVersion(#[source] rusqlite::Error),
    #[error("unsupported database schema version v{found} (latest known is v{latest})")]
    UnsupportedVersion { found: u32, latest: u32 },
    #[error("migration #{index} declares v{declared}, expected v{expected}")]
    OutOfOrder {
        index: usize,
        declared: u32,
        expected: u32,
    },
    #[error("failed to begin upgrade transaction: {0}")]
    Begin(#[source] rusqlite::Error),
    #[error("failed to upgrade to v{version}: {source}")]
    Step {
        version: u32,
        source: rusqlite::Error,
    },
    #[error("failed to update version in database to v{version}: {source}")]
    RecordVersion {
        version: u32,
        source: rusqlite::Error,
    },
    #[error("failed to commit upgrade to v{version}: {source}")]
    Commit {
        version: u32,
        source: rusqlite::Error,
    },
}

/// Bring the schema up to the latest known version. Returns that version.
pub fn run(conn: &mut Connection) -> Result<u32, MigrationError> {
    run_steps(conn, MIGRATIONS)
}

pub fn run_steps(conn: &mut Connection, steps: &[Migration]) -> Result<u32, MigrationError> {
    for (index, step) in steps.iter().enumerate() {
        let expected = index as u32 + 1;
        if step.version != expected {
            return Err(MigrationError::OutOfOrder {
                index,
                declared: step.version,
                expected,
            });
        }
    }
    let latest = steps.len() as u32;

    conn.execute_batch("CREATE TABLE IF NOT EXISTS version (version INTEGER PRIMARY KEY);")
        .map_err(MigrationError::VersionTable)?;

    let current = current_version(conn)?;
    if current == latest {
        return Ok(current);
    } else if current > latest {
        return Err(MigrationError::UnsupportedVersion {
            found: current,
            latest,
        });
    }

    for step in &steps[current as usize..] {
        info!(
            "Upgrading database from v{} to v{} ({})",
            step.version - 1,
            step.version,
            step.description
        );
        apply(conn, step)?;
    }

    info!("Database schema is at v{}", latest);
    Ok(latest)
}

/// Recorded schema version; 0 when nothing has been applied yet.
pub fn current_version(conn: &Connection) -> Result<u32, MigrationError> {
    conn.query_row("SELECT version FROM version", [], |row| row.get::<_, u32>(0))
        .optional()
        .map(|v| v.unwrap_or(0))
        .map_err(MigrationError::QueryVersion)
}

// Dropping `tx` on any early return rolls the step back.
fn apply(conn: &mut Connection, step: &Migration) -> Result<(), MigrationError> {
    let version = step.version;
    let tx = conn.transaction().map_err(MigrationError::Begin)?;

    (step.up)(&tx).map_err(|source| MigrationError::Step { version, source })?;

    tx.execute("DELETE FROM version", [])
        .and_then(|_| tx.execute("INSERT INTO version (version) VALUES (?1)", [version]))
        .map_err(|source| MigrationError::RecordVersion { version, source })?;

    tx.commit()
        .map_err(|source| MigrationError::Commit { version, source })
}
