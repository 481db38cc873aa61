//! Line-aligned prediction/reference files.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Predictions and references aligned by line number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalPairs {
    pub predictions: Vec<String>,
    pub references: Vec<String>,
}

impl EvalPairs {
    /// Build from in-memory lines. The sample count is the number of
    /// references; surplus predictions are ignored.
    pub fn from_lines<P, R>(predictions: P, references: R) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let references: Vec<String> = references.into_iter().map(|l| l.as_ref().trim().to_string()).collect();
        let mut predictions: Vec<String> = predictions.into_iter().map(|l| l.as_ref().trim().to_string()).collect();
        if predictions.len() < references.len() {
            bail!(
                "prediction file has fewer lines ({}) than reference file ({})",
                predictions.len(),
                references.len()
            );
        }
        predictions.truncate(references.len());
        Ok(Self {
            predictions,
            references,
        })
    }

    pub fn load(prediction_file: &Path, reference_file: &Path) -> Result<Self> {
        let refs = std::fs::read_to_string(reference_file)
            .with_context(|| format!("failed to read reference file {}", reference_file.display()))?;
        let preds = std::fs::read_to_string(prediction_file)
            .with_context(|| format!("failed to read prediction file {}", prediction_file.display()))?;
        let pairs = Self::from_lines(preds.lines(), refs.lines())?;
        tracing::debug!(samples = pairs.len(), "loaded evaluation pairs");
        Ok(pairs)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predictions
            .iter()
            .zip(&self.references)
            .map(|(p, r)| (p.as_str(), r.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sample_count_follows_references() {
        let pairs = EvalPairs::from_lines(["a ", " b", "c"], ["x", "y"]).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.predictions, vec!["a", "b"]);
    }

    #[test]
    fn fewer_predictions_is_an_error() {
        let err = EvalPairs::from_lines(["a"], ["x", "y"]).unwrap_err();
        assert!(err.to_string().contains("fewer lines"));
    }

    #[test]
    fn load_from_files() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("pred.txt");
        let r = dir.path().join("ref.txt");
        fs::write(&p, "opens the file\ncloses it\n").unwrap();
        fs::write(&r, "Opens the file.\nCloses the file.\n").unwrap();
        let pairs = EvalPairs::load(&p, &r).unwrap();
        assert_eq!(
            pairs.iter().collect::<Vec<_>>(),
            vec![("opens the file", "Opens the file."), ("closes it", "Closes the file.")]
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let err = EvalPairs::load(&dir.path().join("nope.txt"), &dir.path().join("ref.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("ref.txt"));
    }
}
