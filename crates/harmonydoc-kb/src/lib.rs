//! Harmonydoc term knowledge base
//!
//! Stores `(context, term-mapping)` entries and answers "which term
//! translations apply to this text?" for the comment generation pipeline:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     TERM KNOWLEDGE BASE                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   query ──► fuzzy term match ──► candidate entries               │
//! │                                        │                         │
//! │                                        ▼                         │
//! │              TF-IDF cosine ranking (top_n, threshold)            │
//! │                                        │                         │
//! │                                        ▼                         │
//! │            best target per source term ──► [TermMatch]           │
//! │                                                                  │
//! │   entries ◄── add_entry / batch_import / delete_entries          │
//! │   snapshot.json ◄──► save / load                                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-process, single-caller: `search` takes `&mut self` because it may
//! rebuild stale vectors.

pub mod error;
pub mod import;
pub mod knowledge;
pub mod snapshot;
pub mod sparse;
pub mod tokenize;
pub mod vectorizer;

#[cfg(test)]
mod tests;

pub use error::{KbError, Result};
pub use import::ImportStats;
pub use knowledge::{
    Entry, KbConfig, KnowledgeBase, RefitPolicy, ScoredEntry, TermMatch, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_TOP_N,
};
pub use snapshot::{EntrySnapshot, KnowledgeSnapshot};
pub use sparse::SparseVector;
pub use vectorizer::{DocFrequency, NamedTokenizer, Norm, ParamValue, TfidfVectorizer, VectorizerParams};
