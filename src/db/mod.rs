pub mod coefficients;
pub mod connection;
pub mod history;
pub mod prices;
pub mod settings;

use crate::errors::CatalogError;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

pub use connection::{init_db, Database};

/// Outcome of an insert-or-update keyed on a natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created(i64),
    Existing(i64),
}

impl Upserted {
    pub fn id(self) -> i64 {
        match self {
            Upserted::Created(id) | Upserted::Existing(id) => id,
        }
    }

    pub fn was_created(self) -> bool {
        matches!(self, Upserted::Created(_))
    }
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// `update <table> set a = ?, b = ?, updated_at = ? where id = ?`
pub(crate) fn execute_update(
    conn: &Connection,
    table: &str,
    id: i64,
    mut sets: Vec<(&str, Value)>,
) -> Result<usize, CatalogError> {
    sets.push(("updated_at", Utc::now().naive_utc().to_string().into()));

    let assignments: Vec<String> = sets.iter().map(|(col, _)| format!("{col} = ?")).collect();
    let sql = format!(
        "update {table} set {} where id = ?",
        assignments.join(", ")
    );

    let mut values: Vec<Value> = sets.into_iter().map(|(_, v)| v).collect();
    values.push(id.into());

    Ok(conn.execute(&sql, params_from_iter(values))?)
}
