//! ROUGE-L (Lin & Hovy, 2004) over longest common subsequences.

use crate::tokens::space_tokens;

/// Recall weight of the F-measure.
pub const ROUGE_L_BETA: f64 = 1.2;

/// Length of the longest common subsequence of two token sequences.
pub fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    // Single rolling row over the shorter sequence.
    let mut row = vec![0usize; short.len() + 1];
    for x in long {
        let mut diag = 0;
        for (j, y) in short.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y { diag + 1 } else { above.max(row[j]) };
            diag = above;
        }
    }
    row[short.len()]
}

/// ROUGE-L F-score of `candidate` against `references`, taking the maximum
/// precision and the maximum recall over references independently.
pub fn rouge_l<S: AsRef<str>>(candidate: &str, references: &[S]) -> f64 {
    let cand = space_tokens(candidate);
    let mut prec_max = 0.0f64;
    let mut rec_max = 0.0f64;
    for reference in references {
        let refr = space_tokens(reference.as_ref());
        let lcs = lcs_len(&refr, &cand) as f64;
        prec_max = prec_max.max(lcs / cand.len() as f64);
        rec_max = rec_max.max(lcs / refr.len() as f64);
    }

    if prec_max == 0.0 || rec_max == 0.0 {
        return 0.0;
    }
    let beta2 = ROUGE_L_BETA * ROUGE_L_BETA;
    ((1.0 + beta2) * prec_max * rec_max) / (rec_max + beta2 * prec_max)
}
