//! Full-snapshot JSON persistence.
//!
//! ```text
//! {
//!   "knowledge": [
//!     { "context": "...", "terms": { "src": "tgt" },
//!       "vector_data": [0.0, 0.57, ...], "vector_shape": [1, V] }
//!   ],
//!   "term_index": { "src": [0, 3] },
//!   "vectorizer_params": { "ngram_range": [1, 1], "tokenizer": null, ... }
//! }
//! ```
//!
//! Vectors are stored dense. A `[0, 0]` shape means the entry has no
//! vector; `[1, 0]` is a vector over an empty vocabulary. `save` overwrites the whole file; there is no
//! protection against a crash mid-write.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};
use crate::knowledge::{Entry, KbConfig, KnowledgeBase};
use crate::sparse::SparseVector;
use crate::vectorizer::{ParamValue, TfidfVectorizer, VectorizerParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub context: String,
    pub terms: BTreeMap<String, String>,
    #[serde(default)]
    pub vector_data: Vec<f64>,
    #[serde(default)]
    pub vector_shape: [usize; 2],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    pub knowledge: Vec<EntrySnapshot>,
    #[serde(default)]
    pub term_index: BTreeMap<String, Vec<usize>>,
    #[serde(default)]
    pub vectorizer_params: BTreeMap<String, ParamValue>,
}

impl EntrySnapshot {
    fn from_entry(entry: &Entry) -> Self {
        let (vector_data, vector_shape) = match &entry.vector {
            Some(v) => (v.to_dense(), [1, v.dim()]),
            None => (Vec::new(), [0, 0]),
        };
        Self {
            context: entry.context.clone(),
            terms: entry.terms.clone(),
            vector_data,
            vector_shape,
        }
    }

    fn into_entry(self) -> Result<Entry> {
        let vector = match self.vector_shape {
            [0, _] if self.vector_data.is_empty() => None,
            [1, cols] if cols == self.vector_data.len() => Some(SparseVector::from_dense(&self.vector_data)),
            [rows, cols] => {
                return Err(KbError::Format(format!(
                    "entry {:?}: vector_data has {} values but vector_shape is [{rows}, {cols}]",
                    self.context,
                    self.vector_data.len()
                )));
            }
        };
        Ok(Entry {
            context: self.context,
            terms: self.terms,
            vector,
        })
    }
}

impl KnowledgeBase {
    /// Capture the current state, rebuilding stale vectors first.
    pub fn snapshot(&mut self) -> Result<KnowledgeSnapshot> {
        if self.dirty {
            self.rebuild()?;
        }
        Ok(KnowledgeSnapshot {
            knowledge: self.entries.iter().map(EntrySnapshot::from_entry).collect(),
            term_index: self
                .term_index
                .iter()
                .map(|(term, positions)| (term.clone(), positions.iter().copied().collect()))
                .collect(),
            vectorizer_params: self.vectorizer.params().to_params(),
        })
    }

    /// Write a snapshot to `path`, or to the configured path.
    pub fn save(&mut self, path: Option<&Path>) -> Result<()> {
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self.config.path.clone().ok_or_else(|| {
                KbError::Configuration("no snapshot path given or configured".to_string())
            })?,
        };

        let snapshot = self.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| KbError::io(parent, e))?;
        }
        fs::write(&target, json).map_err(|e| KbError::io(&target, e))?;

        tracing::info!(
            path = %target.display(),
            entries = snapshot.knowledge.len(),
            terms = snapshot.term_index.len(),
            "saved knowledge base snapshot"
        );
        Ok(())
    }

    /// Read a snapshot file. The result remembers `path` for `save(None)`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| KbError::io(path, e))?;
        let snapshot: KnowledgeSnapshot = serde_json::from_str(&text)?;
        let config = KbConfig {
            path: Some(path.to_path_buf()),
            ..KbConfig::default()
        };
        let kb = Self::from_snapshot(snapshot, config)?;
        tracing::info!(
            path = %path.display(),
            entries = kb.len(),
            "loaded knowledge base snapshot"
        );
        Ok(kb)
    }

    /// Restore from an in-memory snapshot. The result is marked dirty so the
    /// next search re-vectorizes against a freshly fitted vocabulary.
    pub fn from_snapshot(snapshot: KnowledgeSnapshot, config: KbConfig) -> Result<Self> {
        let params = VectorizerParams::from_params(&snapshot.vectorizer_params)?;
        let vectorizer = TfidfVectorizer::new(params)?;

        let entries = snapshot
            .knowledge
            .into_iter()
            .map(EntrySnapshot::into_entry)
            .collect::<Result<Vec<_>>>()?;

        let term_index: BTreeMap<String, BTreeSet<usize>> = snapshot
            .term_index
            .into_iter()
            .map(|(term, positions)| (term, positions.into_iter().collect::<BTreeSet<_>>()))
            .filter(|(_, positions)| !positions.is_empty())
            .collect();

        let mut kb = Self {
            entries,
            term_index,
            vectorizer,
            config,
            dirty: true,
        };
        if !kb.index_is_consistent() {
            tracing::warn!("snapshot term index disagrees with its entries; rebuilding it");
            kb.reindex();
        }
        Ok(kb)
    }
}
