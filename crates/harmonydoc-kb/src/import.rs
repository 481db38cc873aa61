//! Batch import of `{context, terms}` records.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KbError, Result};
use crate::knowledge::KnowledgeBase;

/// Outcome counters of a batch import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub added: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Deserialize)]
struct ImportRecord {
    context: String,
    terms: BTreeMap<String, String>,
}

enum RecordOutcome {
    Added,
    Skipped,
}

impl KnowledgeBase {
    /// Import a JSON file holding an array of `{context, terms}` records.
    pub fn batch_import(&mut self, path: &Path) -> Result<ImportStats> {
        let text = fs::read_to_string(path).map_err(|e| KbError::io(path, e))?;
        let value: Value = serde_json::from_str(&text)?;
        let stats = self.import_value(value)?;
        tracing::info!(
            path = %path.display(),
            added = stats.added,
            skipped = stats.skipped,
            errors = stats.errors,
            "batch import finished"
        );
        Ok(stats)
    }

    /// Import already-parsed records. Only a non-array top level is an
    /// error; bad records are counted and skipped.
    pub fn import_value(&mut self, value: Value) -> Result<ImportStats> {
        let Value::Array(records) = value else {
            return Err(KbError::Format(
                "import file must contain a JSON array of {context, terms} records".to_string(),
            ));
        };

        let mut stats = ImportStats::default();
        for (position, record) in records.into_iter().enumerate() {
            match self.import_record(record) {
                Ok(RecordOutcome::Added) => stats.added += 1,
                Ok(RecordOutcome::Skipped) => stats.skipped += 1,
                Err(err) => {
                    tracing::warn!(record = position + 1, error = %err, "skipping import record");
                    stats.errors += 1;
                }
            }
        }
        Ok(stats)
    }

    fn import_record(&mut self, record: Value) -> Result<RecordOutcome> {
        let record: ImportRecord = serde_json::from_value(record)
            .map_err(|e| KbError::Format(format!("malformed record: {e}")))?;
        if self.contains_context(&record.context) {
            return Ok(RecordOutcome::Skipped);
        }
        self.add_entry(&record.context, record.terms)?;
        Ok(RecordOutcome::Added)
    }
}
