//! Runtime configuration for the annotation pipeline.
//!
//! Values come from built-in defaults, optionally a JSON file, and finally
//! `ANNOTATOR_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::store::{CsvSink, MultiSink, SqliteSink};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Script that clones a repository and runs the dependency analysis.
    pub tool_script: PathBuf,
    /// Installation directory of the analysis tool.
    pub tool_path: PathBuf,
    /// Where repositories are cloned.
    pub repository_path: PathBuf,
    /// Root under which the tool writes `arcanOutput/<project>/`.
    pub output_root: PathBuf,
    pub logs_path: PathBuf,
    pub export_dir: PathBuf,
    pub db_path: PathBuf,
    pub language: String,
    pub export_csv: bool,
    pub export_sql: bool,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            tool_script: PathBuf::from("/component-annotator/src/arcan/run-arcan.sh"),
            tool_path: PathBuf::from("/component-annotator/src/arcan"),
            repository_path: PathBuf::from("/component-annotator/data/repository"),
            output_root: PathBuf::from("/component-annotator/data"),
            logs_path: PathBuf::from("/component-annotator/data/arcan-log"),
            export_dir: PathBuf::from("/component-annotator/data/annotations"),
            db_path: PathBuf::from("/component-annotator/data/annotations.db"),
            language: "java".to_string(),
            export_csv: true,
            export_sql: true,
        }
    }
}

/// A flag is on unless set to `0`, `false`, `no` or `off`.
fn flag_value(raw: &str) -> bool {
    !matches!(raw.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
}

impl AnnotatorConfig {
    pub fn from_json_str(json: &str) -> AnnotatorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> AnnotatorResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnnotatorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, slot: &mut PathBuf| {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = PathBuf::from(v);
            }
        };
        path("ANNOTATOR_TOOL_SCRIPT", &mut self.tool_script);
        path("ANNOTATOR_TOOL_PATH", &mut self.tool_path);
        path("ANNOTATOR_REPOSITORY_PATH", &mut self.repository_path);
        path("ANNOTATOR_OUTPUT_ROOT", &mut self.output_root);
        path("ANNOTATOR_LOGS_PATH", &mut self.logs_path);
        path("ANNOTATOR_OUTPUT_DIR", &mut self.export_dir);
        path("ANNOTATOR_DB_PATH", &mut self.db_path);

        if let Some(v) = lookup("ANNOTATOR_LANGUAGE").filter(|v| !v.trim().is_empty()) {
            self.language = v.trim().to_string();
        }
        if let Some(v) = lookup("ANNOTATOR_EXPORT_CSV") {
            self.export_csv = flag_value(&v);
        }
        if let Some(v) = lookup("ANNOTATOR_EXPORT_SQL") {
            self.export_sql = flag_value(&v);
        }
        self
    }

    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Sinks enabled by this configuration.
    pub fn build_sink(&self) -> AnnotatorResult<MultiSink> {
        let mut sink = MultiSink::new();
        if self.export_sql {
            sink = sink.with(SqliteSink::new(&self.db_path)?);
        }
        if self.export_csv {
            sink = sink.with(CsvSink::new(&self.export_dir)?);
        }
        Ok(sink)
    }
}
