//! Average comment length in whitespace words.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LengthStats {
    pub total_words: usize,
    pub sentences: usize,
}

impl LengthStats {
    /// `None` when there was no non-empty line.
    pub fn average(&self) -> Option<f64> {
        (self.sentences > 0).then(|| self.total_words as f64 / self.sentences as f64)
    }
}

/// Word statistics over non-empty lines; blank lines are skipped.
pub fn average_sentence_length<I, S>(lines: I) -> LengthStats
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stats = LengthStats::default();
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        stats.total_words += line.split_whitespace().count();
        stats.sentences += 1;
    }
    stats
}

pub fn length_of_file(path: &Path) -> Result<LengthStats> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(average_sentence_length(text.lines()))
}
