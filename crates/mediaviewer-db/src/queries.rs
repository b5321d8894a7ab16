use crate::Database;
use crate::models::ShortcutRow;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Shortcuts --

    /// Insert a freshly minted shortcut. An id collision surfaces as an
    /// ordinary error; rows are never overwritten.
    pub fn insert_shortcut(&self, row: &ShortcutRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO shortcut (shortcut, homeserver, auth_token, ciphertext) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![row.shortcut, row.homeserver, row.auth_token, row.ciphertext],
            )?;
            Ok(())
        })
    }

    /// `Ok(None)` means no such shortcut; `Err` is reserved for database failures.
    pub fn find_shortcut(&self, shortcut: &str) -> Result<Option<ShortcutRow>> {
        self.with_conn(|conn| query_shortcut(conn, shortcut))
    }
}

fn query_shortcut(conn: &Connection, shortcut: &str) -> Result<Option<ShortcutRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT shortcut, homeserver, auth_token, ciphertext FROM shortcut WHERE shortcut = ?1",
    )?;

    let row = stmt
        .query_row([shortcut], |row| {
            Ok(ShortcutRow {
                shortcut: row.get(0)?,
                homeserver: row.get(1)?,
                auth_token: row.get(2)?,
                ciphertext: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
