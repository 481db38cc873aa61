//! Text normalization shared by the metrics.

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize_answer(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace tokens.
pub fn whitespace_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Tokens split on single spaces, keeping empty tokens between repeated
/// spaces. ROUGE-L scores have always been computed on this split.
pub fn space_tokens(text: &str) -> Vec<String> {
    text.split(' ').map(str::to_string).collect()
}

/// Lowercased whitespace tokens of a line with trailing periods removed.
pub fn meteor_tokens(text: &str) -> Vec<String> {
    text.trim_end()
        .trim_end_matches('.')
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_answer("  Open\tthe   FILE \n"), "open the file");
    }

    #[test]
    fn space_tokens_keep_gaps() {
        assert_eq!(space_tokens("a  b"), vec!["a", "", "b"]);
    }

    #[test]
    fn meteor_tokens_strip_final_period() {
        assert_eq!(meteor_tokens("Opens the file."), vec!["opens", "the", "file"]);
    }
}
