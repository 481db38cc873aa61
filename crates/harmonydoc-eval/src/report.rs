//! Aggregate scores over a set of aligned pairs.

use serde::{Deserialize, Serialize};

use crate::bleu::{corpus_bleu, sentence_bleu, Smoothing, DEFAULT_MAX_ORDER};
use crate::f1::token_f1;
use crate::meteor::meteor;
use crate::pairs::EvalPairs;
use crate::rouge::rouge_l;
use crate::tokens::whitespace_tokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    All,
    F1,
    Bleu,
    Rouge,
    Meteor,
}

impl Metric {
    fn wants(self, other: Metric) -> bool {
        self == Metric::All || self == other
    }
}

/// Scores scaled to 0..100 and averaged over `samples`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f1: Option<f64>,
    /// Mean smoothed sentence BLEU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_bleu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rouge_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meteor: Option<f64>,
}

fn mean_percent(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64 * 100.0
    }
}

pub fn evaluate(pairs: &EvalPairs, metric: Metric) -> EvalReport {
    let n = pairs.len();
    let mut report = EvalReport {
        samples: n,
        ..EvalReport::default()
    };

    if metric.wants(Metric::F1) {
        let (mut p, mut r, mut f) = (0.0, 0.0, 0.0);
        for (pred, refr) in pairs.iter() {
            let s = token_f1(pred, refr);
            p += s.precision;
            r += s.recall;
            f += s.f1;
        }
        report.precision = Some(mean_percent(p, n));
        report.recall = Some(mean_percent(r, n));
        report.f1 = Some(mean_percent(f, n));
    }

    if metric.wants(Metric::Bleu) {
        let mut refs = Vec::with_capacity(n);
        let mut hyps = Vec::with_capacity(n);
        let mut sum = 0.0;
        for (pred, refr) in pairs.iter() {
            let hyp = whitespace_tokens(pred);
            let r = vec![whitespace_tokens(refr)];
            sum += sentence_bleu(&r, &hyp, DEFAULT_MAX_ORDER, Smoothing::AddOne).bleu;
            refs.push(r);
            hyps.push(hyp);
        }
        report.bleu = Some(mean_percent(sum, n));
        report.corpus_bleu = Some(if n == 0 {
            0.0
        } else {
            corpus_bleu(&refs, &hyps, DEFAULT_MAX_ORDER).bleu * 100.0
        });
    }

    if metric.wants(Metric::Rouge) {
        let sum: f64 = pairs.iter().map(|(pred, refr)| rouge_l(pred, &[refr])).sum();
        report.rouge_l = Some(mean_percent(sum, n));
    }

    if metric.wants(Metric::Meteor) {
        let sum: f64 = pairs.iter().map(|(pred, refr)| meteor(refr, pred)).sum();
        report.meteor = Some(mean_percent(sum, n));
    }

    tracing::info!(samples = n, ?metric, "evaluation finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pairs() -> EvalPairs {
        EvalPairs::from_lines(
            ["opens the file at the given path", "alpha beta"],
            ["opens the file at the given path", "gamma delta"],
        )
        .unwrap()
    }

    #[test]
    fn averages_over_actual_sample_count() {
        let report = evaluate(&pairs(), Metric::All);
        assert_eq!(report.samples, 2);
        assert_relative_eq!(report.f1.unwrap(), 50.0);
        assert_relative_eq!(report.bleu.unwrap(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(report.rouge_l.unwrap(), 50.0, epsilon = 1e-9);
        assert!(report.meteor.unwrap() > 0.0 && report.meteor.unwrap() < 50.0);
    }

    #[test]
    fn single_metric_leaves_others_empty() {
        let report = evaluate(&pairs(), Metric::Rouge);
        assert!(report.rouge_l.is_some());
        assert!(report.f1.is_none() && report.bleu.is_none() && report.meteor.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("f1").is_none());
    }

    #[test]
    fn empty_pairs_score_zero() {
        let report = evaluate(&EvalPairs::default(), Metric::All);
        assert_eq!(report.samples, 0);
        assert_eq!(report.f1, Some(0.0));
        assert_eq!(report.corpus_bleu, Some(0.0));
    }
}
