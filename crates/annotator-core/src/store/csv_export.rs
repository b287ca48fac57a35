//! Delimited text export of project annotation datasets.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::errors::AnnotatorResult;
use crate::guards::DELIMITED_EXTENSION;
use crate::models::ProjectAnnotationDataset;
use crate::store::AnnotationSink;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Deterministic export file name for a project.
///
/// Names that survive sanitising unchanged map to `<name>.csv`. Any other
/// name gets the CRC32 of the original appended to its stem, so two projects
/// never share a file.
pub fn export_file_name(project: &str) -> String {
    let stem = UNSAFE_FILE_CHARS.replace_all(project.trim(), "_");
    let stem = if stem.is_empty() { "project".into() } else { stem };
    if stem == project {
        format!("{stem}.{DELIMITED_EXTENSION}")
    } else {
        let crc = crc32fast::hash(project.as_bytes());
        format!("{stem}-{crc:08x}.{DELIMITED_EXTENSION}")
    }
}

/// Writes `<project>.csv` files with a header row into one directory.
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: &Path) -> AnnotatorResult<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, project: &str) -> PathBuf {
        self.output_dir.join(export_file_name(project))
    }
}

impl AnnotationSink for CsvSink {
    fn write(&self, dataset: &ProjectAnnotationDataset) -> AnnotatorResult<()> {
        let path = self.path_for(dataset.project_name());
        let mut writer = csv::Writer::from_path(&path)?;
        let rows = dataset.export_rows()?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Exported {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}
