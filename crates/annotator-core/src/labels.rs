//! Weak-label collaborator boundary.
//!
//! The classifier itself runs elsewhere. Implementations of [`WeakLabeler`]
//! hand back its per-file table; an empty table is a valid answer and is left
//! for the caller to judge.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::models::WeakLabelTable;

pub trait WeakLabeler {
    fn annotate_project(
        &self,
        name: &str,
        url: &str,
        languages: &[String],
    ) -> AnnotatorResult<WeakLabelTable>;
}

/// Serves pre-computed tables keyed by project name.
#[derive(Clone, Debug, Default)]
pub struct StaticLabeler {
    tables: HashMap<String, WeakLabelTable>,
}

impl StaticLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, project: impl Into<String>, table: WeakLabelTable) -> Self {
        self.tables.insert(project.into(), table);
        self
    }
}

impl WeakLabeler for StaticLabeler {
    fn annotate_project(
        &self,
        name: &str,
        _url: &str,
        _languages: &[String],
    ) -> AnnotatorResult<WeakLabelTable> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| AnnotatorError::Classification(format!("no labels for project '{name}'")))
    }
}

/// Reads `<dir>/<project>.json` or `<dir>/<project>.csv` exported by the classifier.
#[derive(Clone, Debug)]
pub struct DirectoryLabeler {
    dir: PathBuf,
}

impl DirectoryLabeler {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl WeakLabeler for DirectoryLabeler {
    fn annotate_project(
        &self,
        name: &str,
        _url: &str,
        languages: &[String],
    ) -> AnnotatorResult<WeakLabelTable> {
        let json = self.dir.join(format!("{name}.json"));
        let csv = self.dir.join(format!("{name}.csv"));
        let table = if json.is_file() {
            WeakLabelTable::from_json_file(&json)?
        } else if csv.is_file() {
            WeakLabelTable::from_csv_path(&csv)?
        } else {
            return Err(AnnotatorError::Classification(format!(
                "no label export for '{name}' in {}",
                self.dir.display()
            )));
        };
        if table.is_empty() {
            warn!("Classifier returned no files for {name} ({languages:?})");
        } else {
            debug!("Loaded {} weak labels for {name}", table.len());
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRecord;

    #[test]
    fn static_labeler_serves_known_projects() {
        let labeler = StaticLabeler::new().with_table(
            "demo",
            WeakLabelTable::new(vec![FileRecord::new("/A", "p", "L1")]),
        );
        assert_eq!(labeler.annotate_project("demo", "", &[]).unwrap().len(), 1);
        assert!(matches!(
            labeler.annotate_project("other", "", &[]),
            Err(AnnotatorError::Classification(_))
        ));
    }

    #[test]
    fn directory_labeler_prefers_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demo.json"),
            r#"[{"path":"/A","package":"p","distribution":[],"unannotated":true,"label":"L1"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("demo.csv"),
            "path,package,distribution,unannotated,label\n",
        )
        .unwrap();
        let table = DirectoryLabeler::new(dir.path())
            .annotate_project("demo", "", &["java".to_string()])
            .unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.rows()[0].unannotated);
    }

    #[test]
    fn directory_labeler_reads_csv_and_allows_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demo.csv"),
            "path,package,distribution,unannotated,label\n",
        )
        .unwrap();
        let table = DirectoryLabeler::new(dir.path())
            .annotate_project("demo", "", &[])
            .unwrap();
        assert!(table.is_empty());
        assert!(DirectoryLabeler::new(dir.path())
            .annotate_project("missing", "", &[])
            .is_err());
    }
}
