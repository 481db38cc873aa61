//! Generation run configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use harmonydoc_kb::{DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_N};

pub const DEFAULT_API_KEY_ENV: &str = "HARMONYDOC_LLM_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.01;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Everything a generation run needs: endpoint, model, knowledge base and
/// retrieval knobs. The API key itself never lives in the file, only the
/// name of the environment variable that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub knowledge_path: Option<PathBuf>,
    pub top_n: usize,
    pub similarity_threshold: f64,
    /// Run each generated comment through the grammar prompt.
    pub refine: bool,
    /// Model for the grammar pass; `model` when unset.
    pub refine_model: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            knowledge_path: None,
            top_n: DEFAULT_TOP_N,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            refine: false,
            refine_model: None,
        }
    }
}

impl GenerationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn refine_model(&self) -> &str {
        self.refine_model.as_deref().unwrap_or(&self.model)
    }

    /// Trimmed, with a scheme and no trailing slash.
    pub fn normalized_base_url(&self) -> String {
        let mut url = self.base_url.trim().to_string();
        if url.is_empty() {
            url = DEFAULT_BASE_URL.to_string();
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            url = format!("https://{url}");
        }
        url.trim_end_matches('/').to_string()
    }
}
