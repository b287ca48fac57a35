pub mod csv_export;
pub mod database;
pub mod schema;

use crate::errors::AnnotatorResult;
use crate::models::ProjectAnnotationDataset;

pub use csv_export::CsvSink;
pub use database::SqliteSink;

/// Destination for finished project datasets.
pub trait AnnotationSink: Send + Sync {
    fn write(&self, dataset: &ProjectAnnotationDataset) -> AnnotatorResult<()>;
}

/// Writes to each inner sink in order, stopping at the first failure.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn AnnotationSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl AnnotationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AnnotationSink for MultiSink {
    fn write(&self, dataset: &ProjectAnnotationDataset) -> AnnotatorResult<()> {
        for sink in &self.sinks {
            sink.write(dataset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregationCase;

    #[test]
    fn multi_sink_writes_every_sink() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MultiSink::new()
            .with(CsvSink::new(&dir.path().join("csv")).unwrap())
            .with(SqliteSink::new(&dir.path().join("db/annotations.db")).unwrap());
        assert_eq!(sink.len(), 2);

        let ds = ProjectAnnotationDataset::degenerate("proj", AggregationCase::NoFileMatches);
        sink.write(&ds).unwrap();

        assert!(dir.path().join("csv/proj.csv").exists());
        let db = SqliteSink::new(&dir.path().join("db/annotations.db")).unwrap();
        assert_eq!(db.read_dataset("proj").unwrap(), ds);
    }
}
