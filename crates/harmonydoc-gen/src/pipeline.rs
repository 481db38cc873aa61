//! Retrieval-augmented comment generation.
//!
//! Per dataset item: strip the official comment, look its terms up in the
//! knowledge base, ask the translator backend for a one-line comment and,
//! when configured, pass that comment through the grammar backend.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use harmonydoc_kb::{KnowledgeBase, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_N};

use crate::dataset::{load_dataset, ApiItem};
use crate::llm::CompletionBackend;
use crate::prompt::{grammar_prompt, render_knowledge, translator_prompt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub generated: usize,
    pub failed: usize,
}

pub struct CommentPipeline {
    kb: KnowledgeBase,
    translator: Box<dyn CompletionBackend>,
    refiner: Option<Box<dyn CompletionBackend>>,
    top_n: usize,
    similarity_threshold: f64,
}

/// First line of a model reply, ignoring leading blank lines.
fn first_line(reply: &str) -> Result<String> {
    reply
        .trim_start()
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| anyhow!("model returned an empty reply"))
}

impl CommentPipeline {
    pub fn new(kb: KnowledgeBase, translator: Box<dyn CompletionBackend>) -> Self {
        Self {
            kb,
            translator,
            refiner: None,
            top_n: DEFAULT_TOP_N,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_refiner(mut self, refiner: Box<dyn CompletionBackend>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn with_retrieval(mut self, top_n: usize, similarity_threshold: f64) -> Self {
        self.top_n = top_n;
        self.similarity_threshold = similarity_threshold;
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Pipeline wired to OpenAI-compatible endpoints from `config`.
    #[cfg(feature = "llm-openai")]
    pub fn from_config(config: &crate::config::GenerationConfig) -> Result<Self> {
        use crate::llm::OpenAiChatClient;

        let kb = match &config.knowledge_path {
            Some(path) => KnowledgeBase::open(path)
                .with_context(|| format!("failed to open knowledge base {}", path.display()))?,
            None => {
                tracing::warn!("no knowledge_path configured; generating without term translations");
                KnowledgeBase::default()
            }
        };
        let translator = OpenAiChatClient::from_config(config, &config.model)?;
        let mut pipeline =
            Self::new(kb, Box::new(translator)).with_retrieval(config.top_n, config.similarity_threshold);
        if config.refine {
            let refiner = OpenAiChatClient::from_config(config, config.refine_model())?;
            pipeline = pipeline.with_refiner(Box::new(refiner));
        }
        Ok(pipeline)
    }

    /// Translator prompt for one item, with retrieved term translations.
    pub fn build_prompt(&mut self, item: ApiItem) -> Result<String> {
        let stripped = item.strip_official_comment()?;
        let matches = self
            .kb
            .search_with(&stripped.official, self.top_n, self.similarity_threshold)
            .context("knowledge base search failed")?;
        tracing::debug!(api = %stripped.name, terms = matches.len(), "retrieved term translations");
        let knowledge = render_knowledge(&matches);
        Ok(translator_prompt(
            &stripped.metadata,
            &stripped.official,
            &knowledge,
            &stripped.name,
        ))
    }

    /// One comment for one item.
    pub fn generate(&mut self, item: ApiItem) -> Result<String> {
        let prompt = self.build_prompt(item)?;
        let reply = self.translator.complete(&prompt)?;
        let comment = first_line(&reply)?;
        match &self.refiner {
            Some(refiner) => {
                let refined = refiner.complete(&grammar_prompt(&comment))?;
                first_line(&refined)
            }
            None => Ok(comment),
        }
    }

    /// Write one line per item. A failed item writes an empty line so output
    /// stays line-aligned with the reference file.
    pub fn run<W: Write>(&mut self, items: Vec<ApiItem>, mut out: W) -> Result<GenerationStats> {
        let mut stats = GenerationStats::default();
        let total = items.len();
        for (i, item) in items.into_iter().enumerate() {
            let title = item.api_intro.title.clone();
            match self.generate(item) {
                Ok(comment) => {
                    writeln!(out, "{comment}")?;
                    stats.generated += 1;
                }
                Err(e) => {
                    tracing::warn!(api = %title, error = %format!("{e:#}"), "generation failed");
                    writeln!(out)?;
                    stats.failed += 1;
                }
            }
            if (i + 1) % 50 == 0 {
                tracing::info!(done = i + 1, total, "generation progress");
            }
        }
        out.flush()?;
        tracing::info!(generated = stats.generated, failed = stats.failed, "generation finished");
        Ok(stats)
    }

    pub fn run_files(&mut self, input: &Path, output: &Path) -> Result<GenerationStats> {
        let items = load_dataset(input)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
        self.run(items, BufWriter::new(file))
    }
}
