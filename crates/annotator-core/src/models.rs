//! Shared typed models used across the graph, aggregation, and store layers.

use std::fmt;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{AnnotatorError, AnnotatorResult};

// ---------------------------------------------------------------------------
// Schema / contract constants
// ---------------------------------------------------------------------------

/// Column order shared by every export of a project annotation dataset.
pub const DATASET_COLUMNS: [&str; 10] = [
    "path",
    "package",
    "distribution",
    "unannotated",
    "label",
    "component",
    "componentlabel",
    "mismatch",
    "projectname",
    "case",
];

/// Columns a weak-label table must carry.
pub const WEAK_LABEL_COLUMNS: [&str; 5] = ["path", "package", "distribution", "unannotated", "label"];

// ---------------------------------------------------------------------------
// 1. FileRecord
// ---------------------------------------------------------------------------

/// One row of the weak-label table produced by the external classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub package: String,
    pub distribution: Vec<f64>,
    pub unannotated: bool,
    pub label: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, package: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
            distribution: Vec::new(),
            unannotated: false,
            label: label.into(),
        }
    }

    pub fn with_distribution(mut self, distribution: Vec<f64>) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_unannotated(mut self, unannotated: bool) -> Self {
        self.unannotated = unannotated;
        self
    }
}

// ---------------------------------------------------------------------------
// 2. WeakLabelTable
// ---------------------------------------------------------------------------

/// Row-per-file weak-label table, indexed by exact path.
///
/// Rows keep their table order. Lookups return every row whose `path` is
/// byte-for-byte equal to the query; no normalisation is applied.
#[derive(Clone, Debug, Default)]
pub struct WeakLabelTable {
    rows: Vec<FileRecord>,
    by_path: IndexMap<String, Vec<usize>>,
}

impl WeakLabelTable {
    pub fn new(rows: Vec<FileRecord>) -> Self {
        let mut by_path: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (idx, row) in rows.iter().enumerate() {
            by_path.entry(row.path.clone()).or_default().push(idx);
        }
        Self { rows, by_path }
    }

    pub fn rows(&self) -> &[FileRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows whose path equals `path` exactly, in table order.
    pub fn lookup<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a FileRecord> + 'a {
        self.by_path
            .get(path)
            .into_iter()
            .flat_map(move |indices| indices.iter().map(move |&i| &self.rows[i]))
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Parse a JSON array of records.
    pub fn from_json_str(json: &str) -> AnnotatorResult<Self> {
        let rows: Vec<FileRecord> = serde_json::from_str(json)?;
        Ok(Self::new(rows))
    }

    pub fn from_json_file(path: &Path) -> AnnotatorResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Read a delimited table with the five weak-label columns.
    ///
    /// `distribution` is a JSON array literal (an empty cell is an empty
    /// vector). `unannotated` accepts `true/false/1/0` in any case.
    pub fn from_csv_reader<R: Read>(reader: R) -> AnnotatorResult<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut positions = [0usize; 5];
        for (slot, column) in positions.iter_mut().zip(WEAK_LABEL_COLUMNS) {
            *slot = headers.iter().position(|h| h == column).ok_or_else(|| {
                AnnotatorError::Classification(format!("weak-label table is missing column '{column}'"))
            })?;
        }
        let [path_col, package_col, dist_col, unannotated_col, label_col] = positions;

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row = result?;
            let cell = |col: usize| row.get(col).unwrap_or("").to_string();

            let raw_dist = cell(dist_col);
            let distribution = if raw_dist.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw_dist)?
            };
            let unannotated = parse_flag(&cell(unannotated_col)).ok_or_else(|| {
                AnnotatorError::Classification(format!(
                    "row {}: invalid unannotated value '{}'",
                    idx + 1,
                    cell(unannotated_col)
                ))
            })?;

            rows.push(FileRecord {
                path: cell(path_col),
                package: cell(package_col),
                distribution,
                unannotated,
                label: cell(label_col),
            });
        }

        Ok(Self::new(rows))
    }

    pub fn from_csv_path(path: &Path) -> AnnotatorResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" | "" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// 3. ComponentRecord
// ---------------------------------------------------------------------------

/// A weak-label row stamped with its community and the community consensus.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentRecord {
    pub file: FileRecord,
    pub component: usize,
    pub componentlabel: String,
    pub mismatch: bool,
}

impl ComponentRecord {
    pub fn stamp(file: FileRecord, component: usize, componentlabel: &str) -> Self {
        let mismatch = file.label != componentlabel;
        Self {
            file,
            component,
            componentlabel: componentlabel.to_string(),
            mismatch,
        }
    }
}

// ---------------------------------------------------------------------------
// 4. AggregationCase
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationCase {
    Success,
    NoCommunitiesFound,
    NoFileMatches,
}

impl AggregationCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationCase::Success => "success",
            AggregationCase::NoCommunitiesFound => "no_communities_found",
            AggregationCase::NoFileMatches => "no_file_matches",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(AggregationCase::Success),
            "no_communities_found" => Some(AggregationCase::NoCommunitiesFound),
            "no_file_matches" => Some(AggregationCase::NoFileMatches),
            _ => None,
        }
    }
}

impl fmt::Display for AggregationCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// 5. ExportRow
// ---------------------------------------------------------------------------

/// Flat, column-ordered view of one dataset row as written to the sinks.
///
/// File-level fields are `None` on degenerate rows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportRow {
    pub path: Option<String>,
    pub package: Option<String>,
    pub distribution: Option<String>,
    pub unannotated: Option<bool>,
    pub label: Option<String>,
    pub component: Option<i64>,
    pub componentlabel: Option<String>,
    pub mismatch: Option<bool>,
    pub projectname: String,
    pub case: String,
}

// ---------------------------------------------------------------------------
// 6. ProjectAnnotationDataset
// ---------------------------------------------------------------------------

/// The per-project output of an aggregation.
///
/// A successful dataset holds one record per matched (node, file) pair. A
/// degenerate dataset holds no records and counts as exactly one row that
/// carries only the project name and the case.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectAnnotationDataset {
    project_name: String,
    case: AggregationCase,
    records: Vec<ComponentRecord>,
}

impl ProjectAnnotationDataset {
    pub fn success(project_name: impl Into<String>, records: Vec<ComponentRecord>) -> Self {
        Self {
            project_name: project_name.into(),
            case: AggregationCase::Success,
            records,
        }
    }

    pub fn degenerate(project_name: impl Into<String>, case: AggregationCase) -> Self {
        Self {
            project_name: project_name.into(),
            case,
            records: Vec::new(),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn case(&self) -> AggregationCase {
        self.case
    }

    pub fn records(&self) -> &[ComponentRecord] {
        &self.records
    }

    pub fn is_degenerate(&self) -> bool {
        self.case != AggregationCase::Success
    }

    /// Number of exported rows (a degenerate dataset is one row).
    pub fn len(&self) -> usize {
        if self.is_degenerate() {
            1
        } else {
            self.records.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> &'static [&'static str] {
        &DATASET_COLUMNS
    }

    /// Majority label assigned to `component`, if any row belongs to it.
    pub fn component_label(&self, component: usize) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.component == component)
            .map(|r| r.componentlabel.as_str())
    }

    /// Records grouped by component id, in order of first appearance.
    pub fn by_component(&self) -> IndexMap<usize, Vec<&ComponentRecord>> {
        let mut grouped: IndexMap<usize, Vec<&ComponentRecord>> = IndexMap::new();
        for record in &self.records {
            grouped.entry(record.component).or_default().push(record);
        }
        grouped
    }

    pub fn mismatch_count(&self) -> usize {
        self.records.iter().filter(|r| r.mismatch).count()
    }

    /// Flatten the dataset into export rows, stamping project name and case.
    pub fn export_rows(&self) -> AnnotatorResult<Vec<ExportRow>> {
        if self.is_degenerate() {
            return Ok(vec![ExportRow {
                path: None,
                package: None,
                distribution: None,
                unannotated: None,
                label: None,
                component: None,
                componentlabel: None,
                mismatch: None,
                projectname: self.project_name.clone(),
                case: self.case.as_str().to_string(),
            }]);
        }

        self.records
            .iter()
            .map(|r| -> AnnotatorResult<ExportRow> {
                Ok(ExportRow {
                    path: Some(r.file.path.clone()),
                    package: Some(r.file.package.clone()),
                    distribution: Some(serde_json::to_string(&r.file.distribution)?),
                    unannotated: Some(r.file.unannotated),
                    label: Some(r.file.label.clone()),
                    component: Some(r.component as i64),
                    componentlabel: Some(r.componentlabel.clone()),
                    mismatch: Some(r.mismatch),
                    projectname: self.project_name.clone(),
                    case: self.case.as_str().to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> WeakLabelTable {
        WeakLabelTable::new(vec![
            FileRecord::new("/A", "pkg", "L1"),
            FileRecord::new("/B", "pkg", "L2"),
            FileRecord::new("/A", "other", "L3"),
        ])
    }

    #[test]
    fn lookup_returns_all_rows_in_table_order() {
        let t = table();
        let labels: Vec<&str> = t.lookup("/A").map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["L1", "L3"]);
        assert_eq!(t.lookup("/missing").count(), 0);
    }

    #[test]
    fn lookup_is_exact() {
        let t = table();
        assert_eq!(t.lookup("A").count(), 0);
        assert_eq!(t.lookup("/a").count(), 0);
        assert_eq!(t.lookup("/A ").count(), 0);
    }

    #[test]
    fn csv_table_parses_distribution_and_flags() {
        let raw = "path,package,distribution,unannotated,label\n\
                   /A,pkg1,\"[0.1,0.9]\",True,L1\n\
                   /B,pkg2,,false,L2\n";
        let t = WeakLabelTable::from_csv_reader(raw.as_bytes()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[0].distribution, vec![0.1, 0.9]);
        assert!(t.rows()[0].unannotated);
        assert!(t.rows()[1].distribution.is_empty());
        assert!(!t.rows()[1].unannotated);
    }

    #[test]
    fn csv_table_requires_label_column() {
        let raw = "path,package,distribution,unannotated\n/A,p,[],false\n";
        let err = WeakLabelTable::from_csv_reader(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, AnnotatorError::Classification(_)));
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn json_table_round_trips_records() {
        let raw = r#"[{"path":"/A","package":"p","distribution":[1.0],"unannotated":false,"label":"L1"}]"#;
        let t = WeakLabelTable::from_json_str(raw).unwrap();
        assert_eq!(t.rows()[0], FileRecord::new("/A", "p", "L1").with_distribution(vec![1.0]));
    }

    #[test]
    fn degenerate_dataset_is_a_single_row() {
        let ds = ProjectAnnotationDataset::degenerate("proj", AggregationCase::NoFileMatches);
        assert_eq!(ds.len(), 1);
        let rows = ds.export_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].case, "no_file_matches");
        assert_eq!(rows[0].projectname, "proj");
        assert!(rows[0].path.is_none());
        assert!(rows[0].componentlabel.is_none());
    }

    #[test]
    fn stamp_sets_mismatch() {
        let rec = ComponentRecord::stamp(FileRecord::new("/B", "p", "L2"), 0, "L1");
        assert!(rec.mismatch);
        let rec = ComponentRecord::stamp(FileRecord::new("/A", "p", "L1"), 0, "L1");
        assert!(!rec.mismatch);
    }

    #[test]
    fn case_strings_are_stable() {
        for case in [
            AggregationCase::Success,
            AggregationCase::NoCommunitiesFound,
            AggregationCase::NoFileMatches,
        ] {
            assert_eq!(AggregationCase::parse(case.as_str()), Some(case));
        }
        assert_eq!(
            serde_json::to_string(&AggregationCase::NoCommunitiesFound).unwrap(),
            "\"no_communities_found\""
        );
    }
}
