//! SQLite sink for project annotation datasets.
//!
//! Each write opens its own connection and replaces the project's table in a
//! single transaction. Writes through one sink are serialised so two
//! aggregations never interleave rows in the same database.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::models::{AggregationCase, ComponentRecord, FileRecord, ProjectAnnotationDataset};
use crate::store::schema;
use crate::store::AnnotationSink;

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if path.len() > 2 {
                expanded.push(&path[2..]);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}

/// Relational store holding one table per project.
pub struct SqliteSink {
    db_path: PathBuf,
    write_lock: Mutex<()>,
}

impl SqliteSink {
    /// Create a sink. The path is expanded and parent directories are created.
    pub fn new(db_path: &Path) -> AnnotatorResult<Self> {
        let expanded = expand_tilde(&db_path.to_string_lossy());
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()?.join(&expanded)
        };
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            db_path: resolved,
            write_lock: Mutex::new(()),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> AnnotatorResult<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Read a project's table back into a dataset.
    pub fn read_dataset(&self, project: &str) -> AnnotatorResult<ProjectAnnotationDataset> {
        let conn = self.connect()?;
        if !schema::table_exists(&conn, project)? {
            return Err(AnnotatorError::IllegalState(format!(
                "no exported table for project '{project}'"
            )));
        }

        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid;",
            schema::column_list(),
            schema::quote_identifier(project)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<bool>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<bool>>(7)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let Some(first) = rows.first() else {
            return Err(AnnotatorError::IllegalState(format!(
                "exported table for project '{project}' is empty"
            )));
        };
        let case = AggregationCase::parse(&first.8).ok_or_else(|| {
            AnnotatorError::IllegalState(format!("unknown case '{}'", first.8))
        })?;
        if case != AggregationCase::Success {
            return Ok(ProjectAnnotationDataset::degenerate(project, case));
        }

        let mut records = Vec::with_capacity(rows.len());
        for (path, package, distribution, unannotated, label, component, componentlabel, mismatch, _) in rows {
            let component = component
                .and_then(|c| usize::try_from(c).ok())
                .ok_or_else(|| {
                    AnnotatorError::IllegalState(format!(
                        "project '{project}': row has invalid component {component:?}"
                    ))
                })?;
            let distribution = match distribution {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            };
            records.push(ComponentRecord {
                file: FileRecord {
                    path: path.unwrap_or_default(),
                    package: package.unwrap_or_default(),
                    distribution,
                    unannotated: unannotated.unwrap_or(false),
                    label: label.unwrap_or_default(),
                },
                component,
                componentlabel: componentlabel.unwrap_or_default(),
                mismatch: mismatch.unwrap_or(false),
            });
        }
        Ok(ProjectAnnotationDataset::success(project, records))
    }
}

impl AnnotationSink for SqliteSink {
    fn write(&self, dataset: &ProjectAnnotationDataset) -> AnnotatorResult<()> {
        let rows = dataset.export_rows()?;
        let table = dataset.project_name();

        let _guard = self.write_lock.lock();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        schema::replace_table(&tx, table)?;
        {
            let mut stmt = tx.prepare(&schema::insert_sql(table))?;
            for row in &rows {
                stmt.execute(params![
                    row.path,
                    row.package,
                    row.distribution,
                    row.unannotated,
                    row.label,
                    row.component,
                    row.componentlabel,
                    row.mismatch,
                    row.projectname,
                    row.case,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Wrote {} rows to table {}", rows.len(), table);
        info!(
            "Exported project {} ({}) to {}",
            table,
            dataset.case(),
            self.db_path.display()
        );
        Ok(())
    }
}
