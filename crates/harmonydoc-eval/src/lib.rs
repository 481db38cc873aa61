//! Harmonydoc evaluation metrics
//!
//! Scores generated API comments against reference comments, one pair per
//! line:
//!
//! | Metric     | Unit of comparison                  |
//! |------------|-------------------------------------|
//! | token F1   | bag of normalized tokens            |
//! | BLEU       | clipped n-grams (1..=4)             |
//! | ROUGE-L    | longest common subsequence          |
//! | METEOR     | exact unigram alignment + chunks    |
//!
//! Reports scale every metric to 0..100 and average over the number of
//! reference lines.

pub mod bleu;
pub mod f1;
pub mod length;
pub mod meteor;
pub mod pairs;
pub mod report;
pub mod rouge;
pub mod tokens;

pub use bleu::{corpus_bleu, sentence_bleu, BleuScore, Smoothing};
pub use f1::{token_f1, PrfScore};
pub use length::{average_sentence_length, length_of_file, LengthStats};
pub use meteor::{meteor, meteor_multi};
pub use pairs::EvalPairs;
pub use report::{evaluate, EvalReport, Metric};
pub use rouge::rouge_l;
