//! METEOR with exact and stem unigram matching.
//!
//! Alignment and scoring follow the usual single-reference METEOR recipe:
//! harmonic mean weighted toward recall, discounted by a fragmentation
//! penalty over contiguous matched chunks. Tokens align in two stages:
//! surface-identical (lowercased) tokens first, then the words still
//! unmatched by their English Snowball stems. There is no synonym stage.

use rust_stemmers::{Algorithm, Stemmer};

use crate::tokens::meteor_tokens;

pub const METEOR_ALPHA: f64 = 0.9;
pub const METEOR_BETA: f64 = 3.0;
pub const METEOR_GAMMA: f64 = 0.5;

/// One alignment stage over the words both sides still have free. Later
/// hypothesis tokens claim the last free reference occurrence first.
fn match_stage(
    hypothesis: &[String],
    reference: &[String],
    free_hyp: &mut [bool],
    free_ref: &mut [bool],
    matches: &mut Vec<(usize, usize)>,
) {
    for i in (0..hypothesis.len()).rev() {
        if !free_hyp[i] {
            continue;
        }
        if let Some(j) = (0..reference.len())
            .rev()
            .find(|&j| free_ref[j] && reference[j] == hypothesis[i])
        {
            free_hyp[i] = false;
            free_ref[j] = false;
            matches.push((i, j));
        }
    }
}

fn stems(stemmer: &Stemmer, words: &[String]) -> Vec<String> {
    words.iter().map(|w| stemmer.stem(w).into_owned()).collect()
}

/// Aligned `(hypothesis_index, reference_index)` pairs sorted by hypothesis
/// position.
fn align(hypothesis: &[String], reference: &[String]) -> Vec<(usize, usize)> {
    let mut free_hyp = vec![true; hypothesis.len()];
    let mut free_ref = vec![true; reference.len()];
    let mut matches = Vec::new();
    match_stage(hypothesis, reference, &mut free_hyp, &mut free_ref, &mut matches);

    if free_hyp.contains(&true) && free_ref.contains(&true) {
        let stemmer = Stemmer::create(Algorithm::English);
        match_stage(
            &stems(&stemmer, hypothesis),
            &stems(&stemmer, reference),
            &mut free_hyp,
            &mut free_ref,
            &mut matches,
        );
    }

    matches.sort_unstable();
    matches
}

/// Number of runs of matches adjacent in both hypothesis and reference.
fn count_chunks(matches: &[(usize, usize)]) -> usize {
    if matches.is_empty() {
        return 0;
    }
    1 + matches
        .windows(2)
        .filter(|w| !(w[1].0 == w[0].0 + 1 && w[1].1 == w[0].1 + 1))
        .count()
}

/// Score already tokenized sequences.
pub fn meteor_tokens_score(reference: &[String], hypothesis: &[String]) -> f64 {
    let matches = align(hypothesis, reference);
    let m = matches.len();
    if m == 0 {
        return 0.0;
    }
    let precision = m as f64 / hypothesis.len() as f64;
    let recall = m as f64 / reference.len() as f64;
    let fmean = precision * recall / (METEOR_ALPHA * precision + (1.0 - METEOR_ALPHA) * recall);
    let frag = count_chunks(&matches) as f64 / m as f64;
    let penalty = METEOR_GAMMA * frag.powf(METEOR_BETA);
    (1.0 - penalty) * fmean
}

/// METEOR of one hypothesis line against one reference line.
pub fn meteor(reference: &str, hypothesis: &str) -> f64 {
    meteor_tokens_score(&meteor_tokens(reference), &meteor_tokens(hypothesis))
}

/// Best score over several references.
pub fn meteor_multi<S: AsRef<str>>(references: &[S], hypothesis: &str) -> f64 {
    let hyp = meteor_tokens(hypothesis);
    references
        .iter()
        .map(|r| meteor_tokens_score(&meteor_tokens(r.as_ref()), &hyp))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn identical_single_chunk() {
        // One chunk of 3 matches: penalty 0.5 * (1/3)^3.
        let s = meteor("Opens the file.", "opens the file");
        assert_relative_eq!(s, 1.0 - 0.5 / 27.0, epsilon = 1e-12);
    }

    #[test]
    fn no_match_is_zero() {
        assert_eq!(meteor("alpha beta", "gamma delta"), 0.0);
        assert_eq!(meteor("alpha", ""), 0.0);
    }

    #[test]
    fn repeated_words_align_to_last_free_occurrence() {
        let reference = toks("the cat is on the mat");
        let hypothesis = toks("the the the cat on the mat");
        let m = align(&hypothesis, &reference);
        assert_eq!(m, vec![(2, 0), (3, 1), (4, 3), (5, 4), (6, 5)]);
        assert_eq!(count_chunks(&m), 2);
    }

    #[test]
    fn inflected_words_align_by_stem() {
        assert_eq!(align(&toks("opens"), &toks("open")), vec![(0, 0)]);
        assert!(meteor("open", "opens") > 0.0);
        assert_relative_eq!(
            meteor("open the files", "opens the file"),
            meteor("open the file", "open the file"),
            epsilon = 1e-12
        );
    }

    #[test]
    fn exact_matches_are_claimed_before_stems() {
        // "opens" claims its identical reference word; "open" then pairs
        // with "opening" by stem.
        let m = align(&toks("open opens"), &toks("opens opening"));
        assert_eq!(m, vec![(0, 1), (1, 0)]);
        assert_eq!(count_chunks(&m), 2);
    }

    #[test]
    fn fragmented_alignment_is_penalized() {
        let ordered = meteor("open the local file", "open the local file");
        let shuffled = meteor("open the local file", "file local the open");
        assert!(shuffled < ordered);
        assert!(shuffled > 0.0);
    }

    #[test]
    fn recall_weighted_mean() {
        // 2 matches, P = 1, R = 0.5, one chunk.
        let s = meteor("open the local file", "open the");
        let fmean = 0.5 / (0.9 * 1.0 + 0.1 * 0.5);
        assert_relative_eq!(s, (1.0 - 0.5 * 0.125) * fmean, epsilon = 1e-12);
    }

    #[test]
    fn multi_reference_takes_best() {
        let s = meteor_multi(&["alpha", "open the file"], "open the file");
        assert_relative_eq!(s, meteor("open the file", "open the file"));
    }
}
