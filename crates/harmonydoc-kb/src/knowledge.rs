//! The context-aware term knowledge base.
//!
//! Retrieval is two-stage:
//!
//! 1. **Candidates**: known terms that fuzzily match the query
//!    (see [`crate::tokenize`]) select the entries that mention them.
//! 2. **Ranking**: candidate entries are ranked by cosine similarity between
//!    their TF-IDF context vector and the query vector.
//!
//! The best-ranked translation per candidate source term is returned.
//!
//! Vectors are rebuilt lazily: every mutation sets a dirty flag, and the next
//! `search`/`save` rebuilds all entry vectors at once.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};
use crate::sparse::SparseVector;
use crate::tokenize::{fuzzy_term_match, has_word_char};
use crate::vectorizer::{TfidfVectorizer, VectorizerParams};

pub const DEFAULT_TOP_N: usize = 9;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.0;

/// When the TF-IDF vocabulary is recomputed during a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefitPolicy {
    /// Refit on all current contexts at every rebuild.
    #[default]
    EveryRebuild,
    /// Fit once; refit only while the vocabulary is missing or empty.
    /// Tokens first seen in later contexts are not represented.
    FitOnce,
}

/// Knowledge base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Snapshot path used by `save(None)`.
    pub path: Option<PathBuf>,
    pub refit: RefitPolicy,
    pub top_n: usize,
    pub similarity_threshold: f64,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            path: None,
            refit: RefitPolicy::default(),
            top_n: DEFAULT_TOP_N,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// One `(context, term-mapping)` unit of retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub context: String,
    /// source term -> target term
    pub terms: BTreeMap<String, String>,
    /// `None` until the first rebuild.
    pub vector: Option<SparseVector>,
}

/// A retrieved translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMatch {
    pub source_term: String,
    pub target_term: String,
}

/// Ranked candidate entry, exposed for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub index: usize,
    pub similarity: f64,
}

pub struct KnowledgeBase {
    pub(crate) entries: Vec<Entry>,
    pub(crate) term_index: BTreeMap<String, BTreeSet<usize>>,
    pub(crate) vectorizer: TfidfVectorizer,
    pub(crate) config: KbConfig,
    pub(crate) dirty: bool,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(KbConfig::default())
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("entries", &self.entries.len())
            .field("terms", &self.term_index.len())
            .field("vocabulary", &self.vectorizer.vocabulary_len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl KnowledgeBase {
    pub fn new(config: KbConfig) -> Self {
        Self {
            entries: Vec::new(),
            term_index: BTreeMap::new(),
            vectorizer: TfidfVectorizer::default(),
            config,
            dirty: true,
        }
    }

    pub fn with_vectorizer(config: KbConfig, params: VectorizerParams) -> Result<Self> {
        let mut kb = Self::new(config);
        kb.vectorizer = TfidfVectorizer::new(params)?;
        Ok(kb)
    }

    /// Knowledge base bound to `path`: loaded from it when the file exists,
    /// empty otherwise. `save(None)` writes back to `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = KbConfig {
            path: Some(path.clone()),
            ..KbConfig::default()
        };
        if path.exists() {
            let mut kb = Self::load(&path)?;
            kb.config = config;
            Ok(kb)
        } else {
            Ok(Self::new(config))
        }
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut KbConfig {
        &mut self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn term_index(&self) -> &BTreeMap<String, BTreeSet<usize>> {
        &self.term_index
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains_context(&self, context: &str) -> bool {
        self.entries.iter().any(|e| e.context == context)
    }

    /// Add an entry. Returns `Ok(false)` when the context already exists
    /// (the first entry for a context wins).
    pub fn add_entry<I, S, T>(&mut self, context: &str, terms: I) -> Result<bool>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        if !has_word_char(context) {
            return Err(KbError::Validation(
                "context must contain at least one word character".to_string(),
            ));
        }
        if self.contains_context(context) {
            return Ok(false);
        }

        let terms: BTreeMap<String, String> = terms
            .into_iter()
            .map(|(s, t)| (s.into(), t.into()))
            .collect();

        let position = self.entries.len();
        for term in terms.keys() {
            self.term_index
                .entry(term.clone())
                .or_default()
                .insert(position);
        }
        self.entries.push(Entry {
            context: context.to_string(),
            terms,
            vector: None,
        });
        self.dirty = true;
        Ok(true)
    }

    /// Remove every entry whose context equals `context`; returns how many.
    pub fn delete_entries(&mut self, context: &str) -> usize {
        let mut deleted = 0;
        for i in (0..self.entries.len()).rev() {
            if self.entries[i].context != context {
                continue;
            }
            let removed = self.entries.remove(i);
            for term in removed.terms.keys() {
                if let Some(positions) = self.term_index.get_mut(term) {
                    positions.remove(&i);
                }
            }
            self.shift_positions_after(i);
            deleted += 1;
        }
        if deleted > 0 {
            self.term_index.retain(|_, positions| !positions.is_empty());
            self.dirty = true;
        }
        deleted
    }

    /// Decrement every indexed position greater than `removed`.
    fn shift_positions_after(&mut self, removed: usize) {
        for positions in self.term_index.values_mut() {
            if positions.range(removed + 1..).next().is_none() {
                continue;
            }
            *positions = positions
                .iter()
                .map(|&p| if p > removed { p - 1 } else { p })
                .collect();
        }
    }

    /// Recompute every entry vector now, regardless of the dirty flag.
    pub fn rebuild(&mut self) -> Result<()> {
        if self.entries.is_empty() {
            self.dirty = false;
            return Ok(());
        }

        let contexts: Vec<&str> = self.entries.iter().map(|e| e.context.as_str()).collect();
        let refit = match self.config.refit {
            RefitPolicy::EveryRebuild => true,
            RefitPolicy::FitOnce => self.vectorizer.vocabulary_len() == 0,
        };
        if refit {
            self.vectorizer.fit(&contexts)?;
        }

        let vectors = self.vectorizer.transform_many(&contexts)?;
        for (entry, vector) in self.entries.iter_mut().zip(vectors) {
            entry.vector = Some(vector);
        }

        tracing::debug!(
            entries = self.entries.len(),
            vocabulary = self.vectorizer.vocabulary_len(),
            refit,
            "rebuilt knowledge base vectors"
        );
        self.dirty = false;
        Ok(())
    }

    fn ensure_fresh(&mut self) -> Result<()> {
        if self.dirty || self.vectorizer.vocabulary_len() == 0 {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Query vector; an unvectorizable query becomes a zero row.
    fn query_vector(&self, query: &str) -> SparseVector {
        match self.vectorizer.transform(query) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!(error = %err, "query not vectorizable, using zero vector");
                SparseVector::zeros(self.vectorizer.vocabulary_len())
            }
        }
    }

    /// Search with the configured `top_n` and threshold.
    pub fn search(&mut self, query: &str) -> Result<Vec<TermMatch>> {
        let (top_n, threshold) = (self.config.top_n, self.config.similarity_threshold);
        self.search_with(query, top_n, threshold)
    }

    /// Retrieve translations for the terms `query` mentions.
    pub fn search_with(
        &mut self,
        query: &str,
        top_n: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<TermMatch>> {
        let candidate_terms = self.candidate_terms(query);
        let ranked = self.rank_candidates(query, &candidate_terms, top_n, similarity_threshold)?;

        // source term -> (target, similarity); the first highest score wins.
        let mut best: HashMap<&str, (&str, f64)> = HashMap::new();
        for scored in &ranked {
            let entry = &self.entries[scored.index];
            for (source, target) in &entry.terms {
                if !candidate_terms.contains(source) {
                    continue;
                }
                match best.get(source.as_str()) {
                    Some((_, sim)) if *sim >= scored.similarity => {}
                    _ => {
                        best.insert(source.as_str(), (target.as_str(), scored.similarity));
                    }
                }
            }
        }

        let mut pooled: Vec<(&str, &str, f64)> = best
            .into_iter()
            .map(|(source, (target, sim))| (source, target, sim))
            .collect();
        pooled.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));

        Ok(pooled
            .into_iter()
            .map(|(source, target, _)| TermMatch {
                source_term: source.to_string(),
                target_term: target.to_string(),
            })
            .collect())
    }

    /// Terms from the index that fuzzily match `query`.
    pub fn candidate_terms(&self, query: &str) -> BTreeSet<String> {
        fuzzy_term_match(self.term_index.keys(), query)
    }

    /// Candidate entries for `candidate_terms`, ranked by descending
    /// similarity to `query` (ties by position), filtered and truncated.
    pub fn rank_candidates(
        &mut self,
        query: &str,
        candidate_terms: &BTreeSet<String>,
        top_n: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<ScoredEntry>> {
        self.ensure_fresh()?;
        let query_vec = self.query_vector(query);

        let mut candidates: BTreeSet<usize> = BTreeSet::new();
        for term in candidate_terms {
            if let Some(positions) = self.term_index.get(term) {
                candidates.extend(positions.iter().copied());
            }
        }

        let mut scored: Vec<ScoredEntry> = candidates
            .into_iter()
            .filter_map(|index| {
                let entry = self.entries.get(index)?;
                let similarity = entry
                    .vector
                    .as_ref()
                    .map_or(0.0, |v| v.cosine(&query_vec));
                (similarity >= similarity_threshold).then_some(ScoredEntry { index, similarity })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.index.cmp(&b.index))
        });
        scored.truncate(top_n);
        Ok(scored)
    }

    /// Rebuild `term_index` from the entries.
    pub(crate) fn reindex(&mut self) {
        self.term_index.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            for term in entry.terms.keys() {
                self.term_index
                    .entry(term.clone())
                    .or_default()
                    .insert(position);
            }
        }
    }

    /// Whether `term_index` agrees with the entries in both directions.
    pub fn index_is_consistent(&self) -> bool {
        for (position, entry) in self.entries.iter().enumerate() {
            for term in entry.terms.keys() {
                let indexed = self
                    .term_index
                    .get(term)
                    .is_some_and(|positions| positions.contains(&position));
                if !indexed {
                    return false;
                }
            }
        }
        self.term_index.iter().all(|(term, positions)| {
            positions.iter().all(|&p| {
                self.entries
                    .get(p)
                    .is_some_and(|entry| entry.terms.contains_key(term))
            })
        })
    }
}
