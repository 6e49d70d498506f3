//! Standing integrity and audit hooks for the normalized tables.
//!
//! A hook is a small description of a trigger: which table it watches, on
//! which event, under which condition, and what it does. Guards run before an
//! insert and abort it with an `Invalid …ID` message; audits run after a
//! mutation and append to `operation_log`. Because a guard aborts the whole
//! statement, no audit fires for a rejected row.

use rusqlite::Connection;
use std::fmt;

use crate::error::{Result, GUARD_MESSAGE_PREFIX};
use crate::model::Operation;

/// The table event a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    BeforeInsert,
    AfterInsert,
    AfterUpdate,
    AfterDelete,
}

impl HookEvent {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::BeforeInsert => "BEFORE INSERT",
            Self::AfterInsert => "AFTER INSERT",
            Self::AfterUpdate => "AFTER UPDATE",
            Self::AfterDelete => "AFTER DELETE",
        }
    }

    /// The row alias visible to the trigger body.
    const fn row_alias(self) -> &'static str {
        match self {
            Self::AfterDelete => "OLD",
            _ => "NEW",
        }
    }
}

impl From<Operation> for HookEvent {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Insert => Self::AfterInsert,
            Operation::Update => Self::AfterUpdate,
            Operation::Delete => Self::AfterDelete,
        }
    }
}

/// A trigger-backed hook on one table.
pub trait TableHook: fmt::Debug + Send + Sync {
    /// Trigger name; unique within the store.
    fn name(&self) -> String;

    fn table(&self) -> &str;

    fn event(&self) -> HookEvent;

    /// Optional `WHEN` condition.
    fn condition(&self) -> Option<String> {
        None
    }

    /// Statements run by the trigger, each terminated by `;`.
    fn action(&self) -> String;

    /// Full `CREATE TRIGGER IF NOT EXISTS` statement.
    fn to_sql(&self) -> String {
        let when = self
            .condition()
            .map(|c| format!("\nWHEN {c}"))
            .unwrap_or_default();
        format!(
            "CREATE TRIGGER IF NOT EXISTS {name}\n{event} ON {table}{when}\nBEGIN\n    {action}\nEND;",
            name = self.name(),
            event = self.event().as_sql(),
            table = self.table(),
            action = self.action(),
        )
    }
}

/// Rejects inserts whose mandatory foreign key does not resolve.
#[derive(Debug, Clone)]
pub struct ParentExists {
    pub table: &'static str,
    pub column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
    /// Logical parent name used in the rejection message (`Artist` gives
    /// `Invalid ArtistID`).
    pub parent_label: &'static str,
}

impl ParentExists {
    pub fn message(&self) -> String {
        format!("{GUARD_MESSAGE_PREFIX}{}ID", self.parent_label)
    }
}

impl TableHook for ParentExists {
    fn name(&self) -> String {
        format!("guard_{}_{}", self.table, self.column)
    }

    fn table(&self) -> &str {
        self.table
    }

    fn event(&self) -> HookEvent {
        HookEvent::BeforeInsert
    }

    fn condition(&self) -> Option<String> {
        Some(format!(
            "NOT EXISTS (SELECT 1 FROM {} WHERE {} = NEW.{})",
            self.parent_table, self.parent_column, self.column
        ))
    }

    fn action(&self) -> String {
        format!("SELECT RAISE(ABORT, '{}');", self.message())
    }
}

/// Appends one `operation_log` row per mutation of a table.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    pub table: &'static str,
    pub id_column: &'static str,
    /// Table name as written into the log (e.g. `Artists`).
    pub label: &'static str,
    pub operation: Operation,
}

impl TableHook for AuditTrail {
    fn name(&self) -> String {
        format!(
            "audit_{}_{}",
            self.table,
            self.operation.as_str().to_lowercase()
        )
    }

    fn table(&self) -> &str {
        self.table
    }

    fn event(&self) -> HookEvent {
        self.operation.into()
    }

    fn action(&self) -> String {
        format!(
            "INSERT INTO operation_log (operation_type, table_name, record_id) VALUES ('{}', '{}', {}.{});",
            self.operation.as_str(),
            self.label,
            self.event().row_alias(),
            self.id_column
        )
    }
}

/// The hooks installed by the guard stage.
pub fn default_hooks() -> Vec<Box<dyn TableHook>> {
    vec![
        Box::new(ParentExists {
            table: "albums",
            column: "artist_id",
            parent_table: "artists",
            parent_column: "artist_id",
            parent_label: "Artist",
        }),
        Box::new(ParentExists {
            table: "tracks",
            column: "album_id",
            parent_table: "albums",
            parent_column: "album_id",
            parent_label: "Album",
        }),
        Box::new(AuditTrail {
            table: "artists",
            id_column: "artist_id",
            label: "Artists",
            operation: Operation::Insert,
        }),
        Box::new(AuditTrail {
            table: "artists",
            id_column: "artist_id",
            label: "Artists",
            operation: Operation::Update,
        }),
        Box::new(AuditTrail {
            table: "artists",
            id_column: "artist_id",
            label: "Artists",
            operation: Operation::Delete,
        }),
    ]
}

/// Names of all triggers currently defined in the store.
pub fn installed_triggers(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'trigger' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Install `hooks`, skipping any already present. Returns the names of the
/// hooks that were newly created.
pub fn install_hooks(conn: &Connection, hooks: &[Box<dyn TableHook>]) -> Result<Vec<String>> {
    let existing = installed_triggers(conn)?;
    let mut created = Vec::new();

    for hook in hooks {
        let name = hook.name();
        if existing.contains(&name) {
            log::debug!("Hook {} already installed", name);
            continue;
        }
        log::debug!("Installing hook {} on {}", name, hook.table());
        conn.execute_batch(&hook.to_sql())?;
        created.push(name);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE artists (artist_id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE albums (album_id INTEGER PRIMARY KEY, artist_id INTEGER);
             CREATE TABLE tracks (track_id INTEGER PRIMARY KEY, album_id INTEGER);
             CREATE TABLE operation_log (
                 log_id INTEGER PRIMARY KEY AUTOINCREMENT,
                 operation_type TEXT NOT NULL,
                 table_name TEXT NOT NULL,
                 record_id INTEGER NOT NULL,
                 timestamp TEXT NOT NULL DEFAULT (datetime('now'))
             );",
        )
        .unwrap();
        conn
    }

    fn log_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM operation_log", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_parent_exists_sql() {
        let guard = ParentExists {
            table: "albums",
            column: "artist_id",
            parent_table: "artists",
            parent_column: "artist_id",
            parent_label: "Artist",
        };
        let sql = guard.to_sql();
        assert!(sql.starts_with("CREATE TRIGGER IF NOT EXISTS guard_albums_artist_id"));
        assert!(sql.contains("BEFORE INSERT ON albums"));
        assert!(sql.contains("RAISE(ABORT, 'Invalid ArtistID')"));
    }

    #[test]
    fn test_delete_audit_reads_old_row() {
        let audit = AuditTrail {
            table: "artists",
            id_column: "artist_id",
            label: "Artists",
            operation: Operation::Delete,
        };
        assert_eq!(audit.event(), HookEvent::AfterDelete);
        assert!(audit.action().contains("OLD.artist_id"));
    }

    #[test]
    fn test_install_is_idempotent() {
        let conn = store();
        let first = install_hooks(&conn, &default_hooks()).unwrap();
        let second = install_hooks(&conn, &default_hooks()).unwrap();

        assert_eq!(first.len(), 5);
        assert!(second.is_empty());
        assert_eq!(installed_triggers(&conn).unwrap().len(), 5);
    }

    #[test]
    fn test_guard_rejects_orphan_album_without_logging() {
        let conn = store();
        install_hooks(&conn, &default_hooks()).unwrap();

        let err = conn
            .execute("INSERT INTO albums (album_id, artist_id) VALUES (1, 99)", [])
            .unwrap_err();
        match Error::from(err) {
            Error::IntegrityViolation(msg) => assert_eq!(msg, "Invalid ArtistID"),
            other => panic!("unexpected error: {other:?}"),
        }

        let albums: i64 = conn
            .query_row("SELECT COUNT(*) FROM albums", [], |row| row.get(0))
            .unwrap();
        assert_eq!(albums, 0);
        assert_eq!(log_count(&conn), 0);
    }

    #[test]
    fn test_audit_logs_artist_mutations() {
        let conn = store();
        install_hooks(&conn, &default_hooks()).unwrap();

        conn.execute("INSERT INTO artists (artist_id, name) VALUES (5, 'Bob')", [])
            .unwrap();
        assert_eq!(log_count(&conn), 1);

        conn.execute("UPDATE artists SET name = 'Robert' WHERE artist_id = 5", [])
            .unwrap();
        conn.execute("DELETE FROM artists WHERE artist_id = 5", [])
            .unwrap();

        let mut stmt = conn
            .prepare("SELECT operation_type, table_name, record_id FROM operation_log ORDER BY log_id")
            .unwrap();
        let rows: Vec<(String, String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(
            rows,
            vec![
                ("INSERT".to_string(), "Artists".to_string(), 5),
                ("UPDATE".to_string(), "Artists".to_string(), 5),
                ("DELETE".to_string(), "Artists".to_string(), 5),
            ]
        );
    }

    #[test]
    fn test_guard_accepts_track_with_existing_album() {
        let conn = store();
        install_hooks(&conn, &default_hooks()).unwrap();

        conn.execute("INSERT INTO artists (artist_id, name) VALUES (1, 'A')", [])
            .unwrap();
        conn.execute("INSERT INTO albums (album_id, artist_id) VALUES (2, 1)", [])
            .unwrap();
        conn.execute("INSERT INTO tracks (track_id, album_id) VALUES (3, 2)", [])
            .unwrap();

        let err = conn
            .execute("INSERT INTO tracks (track_id, album_id) VALUES (4, 77)", [])
            .unwrap_err();
        assert!(matches!(Error::from(err), Error::IntegrityViolation(m) if m == "Invalid AlbumID"));
    }
}
