//! Harmonydoc comment generation
//!
//! ```text
//! dataset.json ─► strip official doc ─► kb.search ─► translator prompt
//!                                                          │
//!                        output.txt ◄─ first line ◄─ backend (+ grammar pass)
//! ```
//!
//! Backends implement [`CompletionBackend`]; the OpenAI-compatible HTTP
//! client sits behind the `llm-openai` feature.

pub mod config;
pub mod dataset;
pub mod llm;
pub mod pipeline;
pub mod prompt;

pub use config::GenerationConfig;
pub use dataset::{load_dataset, ApiIntro, ApiItem, StrippedItem};
#[cfg(feature = "llm-openai")]
pub use llm::OpenAiChatClient;
pub use llm::{CompletionBackend, LlmError};
pub use pipeline::{CommentPipeline, GenerationStats};
pub use prompt::{grammar_prompt, render_knowledge, translator_prompt};
