//! Token-overlap precision / recall / F1.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tokens::normalize_answer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrfScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Bag-of-tokens overlap between a prediction and its reference after
/// [`normalize_answer`]. An empty reference scores 1.0 only against an empty
/// prediction.
pub fn token_f1(prediction: &str, reference: &str) -> PrfScore {
    if reference.trim().is_empty() {
        let v = if prediction.trim().is_empty() { 1.0 } else { 0.0 };
        return PrfScore {
            precision: v,
            recall: v,
            f1: v,
        };
    }

    let pred = normalize_answer(prediction);
    let refr = normalize_answer(reference);
    let pred_tokens: Vec<&str> = pred.split(' ').filter(|t| !t.is_empty()).collect();
    let ref_tokens: Vec<&str> = refr.split(' ').filter(|t| !t.is_empty()).collect();

    let mut ref_counts: HashMap<&str, usize> = HashMap::new();
    for &t in &ref_tokens {
        *ref_counts.entry(t).or_insert(0) += 1;
    }
    let mut pred_counts: HashMap<&str, usize> = HashMap::new();
    for &t in &pred_tokens {
        *pred_counts.entry(t).or_insert(0) += 1;
    }
    let same: usize = pred_counts
        .iter()
        .map(|(t, &c)| c.min(ref_counts.get(t).copied().unwrap_or(0)))
        .sum();

    if same == 0 {
        return PrfScore::default();
    }
    let precision = same as f64 / pred_tokens.len() as f64;
    let recall = same as f64 / ref_tokens.len() as f64;
    PrfScore {
        precision,
        recall,
        f1: 2.0 * precision * recall / (precision + recall),
    }
}
