//! BLEU (Papineni et al., 2002) at sentence and corpus level.
//!
//! - Modified n-gram precision: hypothesis n-gram counts are clipped by the
//!   maximum count of that n-gram in any single reference.
//! - Brevity penalty against the reference length closest to the hypothesis
//!   length (ties resolve to the shorter reference).
//! - Uniform weights over orders `1..=max_order`.
//!
//! Corpus BLEU sums numerators/denominators over all segments before taking
//! the geometric mean; sentence BLEU usually needs smoothing because short
//! comments rarely share a 4-gram with their reference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ORDER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    None,
    /// Replace a zero numerator with `epsilon`.
    Epsilon(f64),
    /// Add one to numerator and denominator for orders above 1.
    AddOne,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BleuScore {
    pub bleu: f64,
    pub precisions: Vec<f64>,
    pub brevity_penalty: f64,
    pub hypothesis_length: usize,
    pub reference_length: usize,
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// Clipped matches and total hypothesis n-grams of order `n`.
fn modified_precision(references: &[Vec<String>], hypothesis: &[String], n: usize) -> (usize, usize) {
    let hyp_counts = ngram_counts(hypothesis, n);
    let mut max_ref_counts: HashMap<&[String], usize> = HashMap::new();
    for reference in references {
        for (ngram, count) in ngram_counts(reference, n) {
            let slot = max_ref_counts.entry(ngram).or_insert(0);
            *slot = (*slot).max(count);
        }
    }

    let clipped: usize = hyp_counts
        .iter()
        .map(|(ngram, &count)| count.min(max_ref_counts.get(ngram).copied().unwrap_or(0)))
        .sum();
    let total: usize = hyp_counts.values().sum();
    (clipped, total.max(1))
}

fn closest_ref_length(references: &[Vec<String>], hyp_len: usize) -> usize {
    references
        .iter()
        .map(Vec::len)
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

pub fn brevity_penalty(hyp_len: usize, ref_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}

fn combine(
    numerators: &[usize],
    denominators: &[usize],
    hyp_len: usize,
    ref_len: usize,
    smoothing: Smoothing,
) -> BleuScore {
    let bp = brevity_penalty(hyp_len, ref_len);
    let mut score = BleuScore {
        bleu: 0.0,
        precisions: numerators
            .iter()
            .zip(denominators)
            .map(|(&n, &d)| n as f64 / d as f64)
            .collect(),
        brevity_penalty: bp,
        hypothesis_length: hyp_len,
        reference_length: ref_len,
    };

    // No unigram overlap means no score, whatever the smoothing.
    if numerators.first().copied().unwrap_or(0) == 0 {
        return score;
    }

    let mut log_sum = 0.0;
    for (order, (&num, &den)) in numerators.iter().zip(denominators).enumerate() {
        let p = match smoothing {
            Smoothing::None => num as f64 / den as f64,
            Smoothing::Epsilon(eps) => {
                if num == 0 {
                    eps / den as f64
                } else {
                    num as f64 / den as f64
                }
            }
            Smoothing::AddOne => {
                if order == 0 {
                    num as f64 / den as f64
                } else {
                    (num as f64 + 1.0) / (den as f64 + 1.0)
                }
            }
        };
        if p <= 0.0 {
            return score;
        }
        log_sum += p.ln();
    }

    score.bleu = bp * (log_sum / numerators.len() as f64).exp();
    score
}

/// BLEU of one hypothesis against one or more references.
pub fn sentence_bleu(
    references: &[Vec<String>],
    hypothesis: &[String],
    max_order: usize,
    smoothing: Smoothing,
) -> BleuScore {
    let mut numerators = Vec::with_capacity(max_order);
    let mut denominators = Vec::with_capacity(max_order);
    for n in 1..=max_order {
        let (num, den) = modified_precision(references, hypothesis, n);
        numerators.push(num);
        denominators.push(den);
    }
    let ref_len = closest_ref_length(references, hypothesis.len());
    combine(&numerators, &denominators, hypothesis.len(), ref_len, smoothing)
}

/// Corpus BLEU: `references[i]` are the references of `hypotheses[i]`.
/// Only the first `min(references.len(), hypotheses.len())` pairs are scored.
pub fn corpus_bleu(references: &[Vec<Vec<String>>], hypotheses: &[Vec<String>], max_order: usize) -> BleuScore {
    if references.len() != hypotheses.len() {
        tracing::warn!(
            references = references.len(),
            hypotheses = hypotheses.len(),
            "corpus BLEU over unequal inputs; scoring the paired prefix"
        );
    }

    let mut numerators = vec![0usize; max_order];
    let mut denominators = vec![0usize; max_order];
    let mut hyp_len = 0;
    let mut ref_len = 0;
    for (refs, hyp) in references.iter().zip(hypotheses) {
        for n in 1..=max_order {
            let (num, den) = modified_precision(refs, hyp, n);
            numerators[n - 1] += num;
            // `modified_precision` floors the denominator at one per segment;
            // corpus totals use the real n-gram count.
            denominators[n - 1] += hyp.len().saturating_sub(n - 1).min(den);
        }
        hyp_len += hyp.len();
        ref_len += closest_ref_length(refs, hyp.len());
    }
    for den in &mut denominators {
        *den = (*den).max(1);
    }
    combine(&numerators, &denominators, hyp_len, ref_len, Smoothing::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::whitespace_tokens;
    use approx::assert_relative_eq;

    fn toks(s: &str) -> Vec<String> {
        whitespace_tokens(s)
    }

    #[test]
    fn identical_sentence_scores_one() {
        let r = toks("returns the module name of the atomic service");
        let s = sentence_bleu(&[r.clone()], &r, 4, Smoothing::None);
        assert_relative_eq!(s.bleu, 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.brevity_penalty, 1.0);
    }

    #[test]
    fn missing_four_gram_zeroes_unsmoothed_score() {
        let r = toks("open the local file now");
        let h = toks("open the file now");
        assert_eq!(sentence_bleu(&[r.clone()], &h, 4, Smoothing::None).bleu, 0.0);
        assert!(sentence_bleu(&[r], &h, 4, Smoothing::AddOne).bleu > 0.0);
    }

    #[test]
    fn clipping_limits_repeated_words() {
        let r = toks("the cat is on the mat");
        let h = toks("the the the the the the the");
        let s = sentence_bleu(&[r], &h, 1, Smoothing::None);
        assert_relative_eq!(s.precisions[0], 2.0 / 7.0);
    }

    #[test]
    fn brevity_penalty_for_short_hypothesis() {
        assert_relative_eq!(brevity_penalty(5, 10), (1.0f64 - 2.0).exp());
        assert_eq!(brevity_penalty(10, 5), 1.0);
        assert_eq!(brevity_penalty(0, 5), 0.0);
    }

    #[test]
    fn closest_reference_length_prefers_shorter_on_tie() {
        let refs = vec![toks("a b c d e f"), toks("a b")];
        assert_eq!(closest_ref_length(&refs, 4), 2);
    }

    #[test]
    fn corpus_of_identical_pairs_scores_one() {
        let pairs = ["opens a file", "closes the given file handle", "creates a local dir"];
        let refs: Vec<Vec<Vec<String>>> = pairs.iter().map(|p| vec![toks(p)]).collect();
        let hyps: Vec<Vec<String>> = pairs.iter().map(|p| toks(p)).collect();
        assert_relative_eq!(corpus_bleu(&refs, &hyps, 4).bleu, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn corpus_of_unequal_lengths_scores_the_paired_prefix() {
        let sentences = ["opens the file at the given path", "closes the given file handle now"];
        let refs: Vec<Vec<Vec<String>>> = sentences.iter().map(|p| vec![toks(p)]).collect();
        let mut hyps: Vec<Vec<String>> = sentences.iter().map(|p| toks(p)).collect();
        hyps.push(toks("an unpaired hypothesis"));

        let paired = corpus_bleu(&refs, &hyps[..2], 4);
        let extra_hypothesis = corpus_bleu(&refs, &hyps, 4);
        assert_relative_eq!(extra_hypothesis.bleu, paired.bleu, epsilon = 1e-12);
        assert_eq!(extra_hypothesis.hypothesis_length, paired.hypothesis_length);

        let extra_reference = corpus_bleu(&refs, &hyps[..1], 4);
        assert_eq!(extra_reference.hypothesis_length, hyps[0].len());
        assert_relative_eq!(extra_reference.bleu, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn disjoint_sentence_scores_zero() {
        let s = sentence_bleu(&[toks("alpha beta")], &toks("gamma delta"), 4, Smoothing::AddOne);
        assert_eq!(s.bleu, 0.0);
    }
}
