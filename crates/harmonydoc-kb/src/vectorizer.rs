//! TF-IDF vectorizer over knowledge-base contexts.
//!
//! Vocabulary columns are assigned in alphabetical token order. Weights are
//! `tf * idf` with `idf = ln((1 + n) / (1 + df)) + 1` (smoothed) or
//! `ln(n / df) + 1`, and each row is normalized (L2 by default).
//!
//! Constructor parameters round-trip through [`ParamValue`] maps so snapshots
//! can record how the vocabulary was built. Parameters that are functions or
//! types are recorded as `FUNCTION:<name>` / `CLASS:<path>` tags only.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};
use crate::sparse::SparseVector;

pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

const CLASS_TAG: &str = "CLASS:";
const FUNCTION_TAG: &str = "FUNCTION:";

/// A primitive parameter value as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// The `CLASS:`/`FUNCTION:` tag, if this value is one.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) if s.starts_with(CLASS_TAG) || s.starts_with(FUNCTION_TAG) => {
                Some(s)
            }
            _ => None,
        }
    }
}

/// Document-frequency bound: an absolute count or a proportion of documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocFrequency {
    Count(usize),
    Proportion(f64),
}

impl DocFrequency {
    fn resolve(self, n_docs: usize) -> f64 {
        match self {
            DocFrequency::Count(c) => c as f64,
            DocFrequency::Proportion(p) => p * n_docs as f64,
        }
    }

    fn to_param(self) -> ParamValue {
        match self {
            DocFrequency::Count(c) => ParamValue::Int(c as i64),
            DocFrequency::Proportion(p) => ParamValue::Float(p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Norm {
    L1,
    L2,
}

/// A custom tokenizer. Only its name survives a snapshot.
#[derive(Clone, Copy)]
pub struct NamedTokenizer {
    pub name: &'static str,
    pub func: fn(&str) -> Vec<String>,
}

impl std::fmt::Debug for NamedTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedTokenizer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct VectorizerParams {
    pub lowercase: bool,
    pub token_pattern: String,
    pub ngram_range: (usize, usize),
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
    pub max_features: Option<usize>,
    pub stop_words: Option<Vec<String>>,
    pub binary: bool,
    pub norm: Option<Norm>,
    pub use_idf: bool,
    pub smooth_idf: bool,
    pub sublinear_tf: bool,
    /// Replaces `token_pattern` when set.
    pub tokenizer: Option<NamedTokenizer>,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            lowercase: true,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            ngram_range: (1, 1),
            min_df: DocFrequency::Count(1),
            max_df: DocFrequency::Proportion(1.0),
            max_features: None,
            stop_words: None,
            binary: false,
            norm: Some(Norm::L2),
            use_idf: true,
            smooth_idf: true,
            sublinear_tf: false,
            tokenizer: None,
        }
    }
}

impl VectorizerParams {
    /// Flatten into the snapshot representation.
    pub fn to_params(&self) -> BTreeMap<String, ParamValue> {
        let mut out = BTreeMap::new();
        out.insert("binary".into(), ParamValue::Bool(self.binary));
        out.insert(
            "dtype".into(),
            ParamValue::Str(format!("{CLASS_TAG}core.{}", std::any::type_name::<f64>())),
        );
        out.insert("lowercase".into(), ParamValue::Bool(self.lowercase));
        out.insert("max_df".into(), self.max_df.to_param());
        out.insert(
            "max_features".into(),
            self.max_features
                .map(|m| ParamValue::Int(m as i64))
                .unwrap_or(ParamValue::Null),
        );
        out.insert("min_df".into(), self.min_df.to_param());
        out.insert(
            "ngram_range".into(),
            ParamValue::List(vec![
                ParamValue::Int(self.ngram_range.0 as i64),
                ParamValue::Int(self.ngram_range.1 as i64),
            ]),
        );
        out.insert(
            "norm".into(),
            match self.norm {
                Some(Norm::L1) => ParamValue::Str("l1".into()),
                Some(Norm::L2) => ParamValue::Str("l2".into()),
                None => ParamValue::Null,
            },
        );
        out.insert("smooth_idf".into(), ParamValue::Bool(self.smooth_idf));
        out.insert(
            "stop_words".into(),
            match &self.stop_words {
                Some(words) => {
                    ParamValue::List(words.iter().cloned().map(ParamValue::Str).collect())
                }
                None => ParamValue::Null,
            },
        );
        out.insert("sublinear_tf".into(), ParamValue::Bool(self.sublinear_tf));
        out.insert(
            "token_pattern".into(),
            ParamValue::Str(self.token_pattern.clone()),
        );
        out.insert(
            "tokenizer".into(),
            match &self.tokenizer {
                Some(t) => ParamValue::Str(format!("{FUNCTION_TAG}{}", t.name)),
                None => ParamValue::Null,
            },
        );
        out.insert("use_idf".into(), ParamValue::Bool(self.use_idf));
        out
    }

    /// Rebuild parameters from a snapshot map. Missing keys keep defaults.
    ///
    /// Fails with [`KbError::UnrestorableParameter`] for any tagged value that
    /// would change vectorization (a custom tokenizer or preprocessor), and
    /// with [`KbError::InvalidParameter`] for a non-word `analyzer`, accent
    /// stripping or a fixed vocabulary. Input-decoding keys are ignored.
    pub fn from_params(params: &BTreeMap<String, ParamValue>) -> Result<Self> {
        let mut out = Self::default();
        for (name, value) in params {
            match name.as_str() {
                "binary" => out.binary = expect_bool(name, value)?,
                "lowercase" => out.lowercase = expect_bool(name, value)?,
                "use_idf" => out.use_idf = expect_bool(name, value)?,
                "smooth_idf" => out.smooth_idf = expect_bool(name, value)?,
                "sublinear_tf" => out.sublinear_tf = expect_bool(name, value)?,
                "min_df" => out.min_df = expect_doc_frequency(name, value)?,
                "max_df" => out.max_df = expect_doc_frequency(name, value)?,
                "max_features" => {
                    out.max_features = match value {
                        ParamValue::Null => None,
                        other => Some(expect_usize(name, other)?),
                    }
                }
                "ngram_range" => out.ngram_range = expect_pair(name, value)?,
                "token_pattern" => match value {
                    ParamValue::Str(s) if value.as_tag().is_none() => {
                        out.token_pattern = s.clone()
                    }
                    ParamValue::Null => {}
                    other => return Err(reject(name, other, "expected a regex string")),
                },
                "norm" => {
                    out.norm = match value {
                        ParamValue::Null => None,
                        ParamValue::Str(s) if s == "l2" => Some(Norm::L2),
                        ParamValue::Str(s) if s == "l1" => Some(Norm::L1),
                        other => return Err(reject(name, other, "expected \"l1\", \"l2\" or null")),
                    }
                }
                "stop_words" => {
                    out.stop_words = match value {
                        ParamValue::Null => None,
                        ParamValue::List(items) => Some(
                            items
                                .iter()
                                .map(|item| match item {
                                    ParamValue::Str(s) => Ok(s.clone()),
                                    other => Err(reject(name, other, "expected strings")),
                                })
                                .collect::<Result<Vec<_>>>()?,
                        ),
                        other => return Err(reject(name, other, "expected a list of words")),
                    }
                }
                "dtype" => match value {
                    ParamValue::Null => {}
                    ParamValue::Str(s) if is_float64_name(s) => {}
                    other => {
                        return Err(KbError::UnrestorableParameter {
                            name: name.clone(),
                            tag: describe(other),
                        })
                    }
                },
                "tokenizer" => match value {
                    ParamValue::Null => out.tokenizer = None,
                    other => {
                        return Err(KbError::UnrestorableParameter {
                            name: name.clone(),
                            tag: describe(other),
                        })
                    }
                },
                // Only the word analyzer without accent stripping is supported.
                "analyzer" => match value {
                    ParamValue::Null => {}
                    ParamValue::Str(s) if s == "word" => {}
                    other => return Err(unsupported(name, other, "only \"word\" is supported")),
                },
                "strip_accents" | "preprocessor" | "vocabulary" => match value {
                    ParamValue::Null | ParamValue::Bool(false) => {}
                    other => return Err(unsupported(name, other, "only null is supported")),
                },
                "input" | "encoding" | "decode_error" => {
                    tracing::debug!(parameter = %name, "ignoring input-decoding parameter");
                }
                _ => {
                    if let Some(tag) = value.as_tag() {
                        return Err(KbError::UnrestorableParameter {
                            name: name.clone(),
                            tag: tag.to_string(),
                        });
                    }
                    tracing::warn!(parameter = %name, "ignoring unknown vectorizer parameter");
                }
            }
        }
        Ok(out)
    }
}

fn is_float64_name(s: &str) -> bool {
    let bare = s.strip_prefix(CLASS_TAG).unwrap_or(s);
    bare.ends_with("f64") || bare.ends_with("float64")
}

fn describe(value: &ParamValue) -> String {
    match value.as_tag() {
        Some(tag) => tag.to_string(),
        None => format!("{value:?}"),
    }
}

/// Tagged values are unrestorable; plain values are just unsupported.
fn unsupported(name: &str, value: &ParamValue, reason: &str) -> KbError {
    match value.as_tag() {
        Some(tag) => KbError::UnrestorableParameter {
            name: name.to_string(),
            tag: tag.to_string(),
        },
        None => reject(name, value, reason),
    }
}

fn reject(name: &str, value: &ParamValue, reason: &str) -> KbError {
    KbError::InvalidParameter {
        name: name.to_string(),
        reason: format!("{reason}, got {value:?}"),
    }
}

fn expect_bool(name: &str, value: &ParamValue) -> Result<bool> {
    match value {
        ParamValue::Bool(b) => Ok(*b),
        other => Err(reject(name, other, "expected a boolean")),
    }
}

fn expect_usize(name: &str, value: &ParamValue) -> Result<usize> {
    match value {
        ParamValue::Int(i) if *i >= 0 => Ok(*i as usize),
        other => Err(reject(name, other, "expected a non-negative integer")),
    }
}

fn expect_doc_frequency(name: &str, value: &ParamValue) -> Result<DocFrequency> {
    match value {
        ParamValue::Int(i) if *i >= 0 => Ok(DocFrequency::Count(*i as usize)),
        ParamValue::Float(f) if (0.0..=1.0).contains(f) => Ok(DocFrequency::Proportion(*f)),
        other => Err(reject(name, other, "expected a count or a proportion in [0, 1]")),
    }
}

/// Snapshots store pairs as two-element sequences.
fn expect_pair(name: &str, value: &ParamValue) -> Result<(usize, usize)> {
    match value {
        ParamValue::List(items) if items.len() == 2 => {
            let lo = expect_usize(name, &items[0])?;
            let hi = expect_usize(name, &items[1])?;
            if lo == 0 || lo > hi {
                return Err(reject(name, value, "expected 1 <= min <= max"));
            }
            Ok((lo, hi))
        }
        other => Err(reject(name, other, "expected [min, max]")),
    }
}

#[derive(Debug, Clone, Default)]
struct Fitted {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

/// Bag-of-words TF-IDF vectorizer.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    pattern: Regex,
    fitted: Option<Fitted>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(VectorizerParams::default()).expect("default token pattern compiles")
    }
}

impl TfidfVectorizer {
    pub fn new(params: VectorizerParams) -> Result<Self> {
        let (lo, hi) = params.ngram_range;
        if lo == 0 || lo > hi {
            return Err(KbError::InvalidParameter {
                name: "ngram_range".into(),
                reason: format!("expected 1 <= min <= max, got ({lo}, {hi})"),
            });
        }
        let pattern = Regex::new(&params.token_pattern)?;
        Ok(Self {
            params,
            pattern,
            fitted: None,
        })
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fitted vocabulary (token -> column), if any.
    pub fn vocabulary(&self) -> Option<&BTreeMap<String, usize>> {
        self.fitted.as_ref().map(|f| &f.vocabulary)
    }

    pub fn vocabulary_len(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.vocabulary.len())
    }

    pub fn idf(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.idf.as_slice())
    }

    /// Forget the fitted vocabulary.
    pub fn reset(&mut self) {
        self.fitted = None;
    }

    /// Split a document into the features the vocabulary is built from.
    pub fn analyze(&self, doc: &str) -> Vec<String> {
        let text = if self.params.lowercase {
            doc.to_lowercase()
        } else {
            doc.to_string()
        };

        let mut tokens: Vec<String> = match &self.params.tokenizer {
            Some(t) => (t.func)(&text),
            None => self
                .pattern
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .collect(),
        };

        if let Some(stop) = &self.params.stop_words {
            let stop: HashSet<&str> = stop.iter().map(String::as_str).collect();
            tokens.retain(|t| !stop.contains(t.as_str()));
        }

        let (lo, hi) = self.params.ngram_range;
        if (lo, hi) == (1, 1) {
            return tokens;
        }

        let mut features = Vec::new();
        for n in lo..=hi {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                features.push(window.join(" "));
            }
        }
        features
    }

    /// Learn vocabulary and idf weights from `docs`.
    ///
    /// An empty resulting vocabulary is not an error: every row produced by
    /// [`Self::transform`] is then the empty vector.
    pub fn fit<S: AsRef<str>>(&mut self, docs: &[S]) -> Result<()> {
        let n_docs = docs.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_freq: HashMap<String, usize> = HashMap::new();

        for doc in docs {
            let features = self.analyze(doc.as_ref());
            let mut seen: HashSet<&str> = HashSet::new();
            for feature in &features {
                *total_freq.entry(feature.clone()).or_insert(0) += 1;
                if seen.insert(feature.as_str()) {
                    *doc_freq.entry(feature.clone()).or_insert(0) += 1;
                }
            }
        }

        let max_count = self.params.max_df.resolve(n_docs);
        let min_count = self.params.min_df.resolve(n_docs);
        if max_count < min_count {
            return Err(KbError::InvalidParameter {
                name: "max_df".into(),
                reason: "max_df corresponds to fewer documents than min_df".into(),
            });
        }

        let mut kept: Vec<String> = doc_freq
            .iter()
            .filter(|(_, &df)| (df as f64) >= min_count && (df as f64) <= max_count)
            .map(|(term, _)| term.clone())
            .collect();

        if let Some(limit) = self.params.max_features {
            kept.sort_by(|a, b| {
                total_freq[b]
                    .cmp(&total_freq[a])
                    .then_with(|| a.cmp(b))
            });
            kept.truncate(limit);
        }
        kept.sort();

        let n = n_docs as f64 + if self.params.smooth_idf { 1.0 } else { 0.0 };
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (col, term) in kept.into_iter().enumerate() {
            let df = doc_freq[&term] as f64 + if self.params.smooth_idf { 1.0 } else { 0.0 };
            idf.push((n / df).ln() + 1.0);
            vocabulary.insert(term, col);
        }

        tracing::debug!(
            documents = n_docs,
            vocabulary = vocabulary.len(),
            "fitted tf-idf vocabulary"
        );
        self.fitted = Some(Fitted { vocabulary, idf });
        Ok(())
    }

    /// Vectorize one document against the fitted vocabulary.
    pub fn transform(&self, doc: &str) -> Result<SparseVector> {
        let fitted = self.fitted.as_ref().ok_or(KbError::NotFitted)?;
        let dim = fitted.vocabulary.len();

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for feature in self.analyze(doc) {
            if let Some(&col) = fitted.vocabulary.get(&feature) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let pairs: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, count)| {
                let mut tf = if self.params.binary { 1.0 } else { count };
                if self.params.sublinear_tf {
                    tf = 1.0 + tf.ln();
                }
                let weight = if self.params.use_idf {
                    tf * fitted.idf[col]
                } else {
                    tf
                };
                (col, weight)
            })
            .collect();

        let mut row = SparseVector::from_pairs(dim, pairs);
        match self.params.norm {
            Some(Norm::L2) => row.normalize_l2(),
            Some(Norm::L1) => row.normalize_l1(),
            None => {}
        }
        Ok(row)
    }

    pub fn transform_many<S: AsRef<str>>(&self, docs: &[S]) -> Result<Vec<SparseVector>> {
        docs.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, docs: &[S]) -> Result<Vec<SparseVector>> {
        self.fit(docs)?;
        self.transform_many(docs)
    }
}
