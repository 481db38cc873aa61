//! API dataset items.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `apiIntro` block of a dataset item. Fields beyond the official doc
/// and title (tags, kit, syscap, ...) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiIntro {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_doc: Option<String>,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiItem {
    #[serde(rename = "apiIntro")]
    pub api_intro: ApiIntro,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An item split into what the prompt needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StrippedItem {
    /// The official (Chinese) comment; also the knowledge base query.
    pub official: String,
    pub name: String,
    /// The item without its official comment, serialized as compact JSON.
    pub metadata: String,
}

impl ApiItem {
    /// Remove the official comment from the metadata so the model only sees
    /// it once, under its own key.
    pub fn strip_official_comment(mut self) -> Result<StrippedItem> {
        let official = self
            .api_intro
            .official_doc
            .take()
            .with_context(|| format!("api `{}` has no official_doc", self.api_intro.title))?;
        let name = self.api_intro.title.clone();
        let metadata = serde_json::to_string(&self)?;
        Ok(StrippedItem {
            official,
            name,
            metadata,
        })
    }
}

pub fn load_dataset(path: &Path) -> Result<Vec<ApiItem>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read dataset {}", path.display()))?;
    let items: Vec<ApiItem> =
        serde_json::from_str(&text).with_context(|| format!("invalid dataset {}", path.display()))?;
    tracing::debug!(items = items.len(), path = %path.display(), "loaded dataset");
    Ok(items)
}
