//! Table layout for exported project annotation datasets.
//!
//! Every project gets its own table, named exactly after the project. The
//! column list mirrors [`DATASET_COLUMNS`].

use rusqlite::Connection;

use crate::errors::AnnotatorResult;
use crate::models::DATASET_COLUMNS;

/// SQL type of each dataset column, in column order.
const COLUMN_TYPES: [&str; 10] = [
    "TEXT",
    "TEXT",
    "TEXT",
    "INTEGER",
    "TEXT",
    "INTEGER",
    "TEXT",
    "INTEGER",
    "TEXT NOT NULL",
    "TEXT NOT NULL",
];

/// Quote an identifier so arbitrary project names (and `case`) are safe.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn column_list() -> String {
    DATASET_COLUMNS
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_table_sql(table: &str) -> String {
    let columns = DATASET_COLUMNS
        .iter()
        .zip(COLUMN_TYPES)
        .map(|(name, ty)| format!("{} {ty}", quote_identifier(name)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({columns});", quote_identifier(table))
}

pub fn insert_sql(table: &str) -> String {
    let placeholders = (1..=DATASET_COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        quote_identifier(table),
        column_list()
    )
}

/// Drop any prior table for `table` and create a fresh one.
pub fn replace_table(conn: &Connection, table: &str) -> AnnotatorResult<()> {
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {};",
        quote_identifier(table)
    ))?;
    conn.execute_batch(&create_table_sql(table))?;
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> AnnotatorResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_identifier("plain"), "\"plain\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn create_table_quotes_case_column() {
        let sql = create_table_sql("proj");
        assert!(sql.starts_with("CREATE TABLE \"proj\" (\"path\" TEXT"));
        assert!(sql.contains("\"case\" TEXT NOT NULL"));
    }

    #[test]
    fn replace_table_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        replace_table(&conn, "my-project").unwrap();
        conn.execute_batch("INSERT INTO \"my-project\" (projectname, \"case\") VALUES ('p', 'success');")
            .unwrap();
        replace_table(&conn, "my-project").unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"my-project\";", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 0);
        assert!(table_exists(&conn, "my-project").unwrap());
        assert!(!table_exists(&conn, "other").unwrap());
    }

    #[test]
    fn insert_has_one_placeholder_per_column() {
        let sql = insert_sql("t");
        assert!(sql.contains("?10"));
        assert!(!sql.contains("?11"));
    }
}
