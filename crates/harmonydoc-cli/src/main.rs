//! Harmonydoc CLI
//!
//! Command-line interface for:
//! - Managing term knowledge base snapshots (add/import/search/delete/stats)
//! - Generating API comments with retrieved term translations
//! - Scoring generated comments against references

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use harmonydoc_eval::{evaluate, length_of_file, EvalPairs, EvalReport, Metric};
use harmonydoc_kb::{KnowledgeBase, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_N};

mod logging;

#[derive(Parser)]
#[command(name = "harmonydoc")]
#[command(author, version, about = "Harmonydoc: term-aware API comment generation and evaluation")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Term knowledge base snapshots.
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },

    /// Score a prediction file against a reference file (one comment per line).
    Eval {
        #[arg(long)]
        prediction_file: PathBuf,
        #[arg(long)]
        reference_file: PathBuf,
        #[arg(long, value_enum, default_value_t = MetricArg::All)]
        metric: MetricArg,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Average words per non-empty line.
    EvalLength { file: PathBuf },

    /// Generate one comment per dataset item.
    Generate {
        /// Generation config (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Dataset JSON (array of items with `apiIntro`)
        #[arg(long)]
        input: PathBuf,
        /// Output file, one comment per line
        #[arg(long)]
        output: PathBuf,
        /// Run the grammar refinement pass regardless of the config
        #[arg(long)]
        refine: bool,
    },
}

#[derive(Subcommand)]
enum KbCommands {
    /// Add one entry and save the snapshot.
    Add {
        #[arg(long)]
        kb: PathBuf,
        #[arg(long)]
        context: String,
        /// Term translation, `SRC=TGT` (repeatable)
        #[arg(long = "term", value_parser = parse_term)]
        terms: Vec<(String, String)>,
    },

    /// Import a JSON array of `{context, terms}` records and save.
    Import {
        #[arg(long)]
        kb: PathBuf,
        input: PathBuf,
    },

    /// Retrieve term translations for a query.
    Search {
        #[arg(long)]
        kb: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,
        #[arg(long)]
        json: bool,
        query: String,
    },

    /// Delete every entry with this exact context and save.
    Delete {
        #[arg(long)]
        kb: PathBuf,
        context: String,
    },

    /// Show snapshot statistics.
    Stats {
        #[arg(long)]
        kb: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    All,
    F1,
    Bleu,
    Rouge,
    Meteor,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::All => Metric::All,
            MetricArg::F1 => Metric::F1,
            MetricArg::Bleu => Metric::Bleu,
            MetricArg::Rouge => Metric::Rouge,
            MetricArg::Meteor => Metric::Meteor,
        }
    }
}

fn parse_term(s: &str) -> std::result::Result<(String, String), String> {
    let (src, tgt) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SRC=TGT, got `{s}`"))?;
    if src.is_empty() || tgt.is_empty() {
        return Err(format!("expected SRC=TGT, got `{s}`"));
    }
    Ok((src.to_string(), tgt.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Kb { command } => match command {
            KbCommands::Add { kb, context, terms } => cmd_kb_add(&kb, &context, terms)?,
            KbCommands::Import { kb, input } => cmd_kb_import(&kb, &input)?,
            KbCommands::Search {
                kb,
                top_n,
                threshold,
                json,
                query,
            } => cmd_kb_search(&kb, &query, top_n, threshold, json)?,
            KbCommands::Delete { kb, context } => cmd_kb_delete(&kb, &context)?,
            KbCommands::Stats { kb } => cmd_kb_stats(&kb)?,
        },
        Commands::Eval {
            prediction_file,
            reference_file,
            metric,
            json,
        } => cmd_eval(&prediction_file, &reference_file, metric.into(), json)?,
        Commands::EvalLength { file } => cmd_eval_length(&file)?,
        Commands::Generate {
            config,
            input,
            output,
            refine,
        } => cmd_generate(&config, &input, &output, refine)?,
    }
    Ok(())
}

fn open_kb(path: &Path) -> Result<KnowledgeBase> {
    let kb =
        KnowledgeBase::open(path).with_context(|| format!("failed to open knowledge base {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = kb.len(), "opened knowledge base");
    Ok(kb)
}

fn save_kb(kb: &mut KnowledgeBase, path: &Path) -> Result<()> {
    kb.save(None)
        .with_context(|| format!("failed to save knowledge base {}", path.display()))
}

fn cmd_kb_add(path: &Path, context: &str, terms: Vec<(String, String)>) -> Result<()> {
    let mut kb = open_kb(path)?;
    let added = kb.add_entry(context, terms)?;
    save_kb(&mut kb, path)?;
    if added {
        println!("{} entry ({} total)", "Added".green(), kb.len());
    } else {
        println!("{} context already present", "Skipped:".yellow());
    }
    Ok(())
}

fn cmd_kb_import(path: &Path, input: &Path) -> Result<()> {
    let mut kb = open_kb(path)?;
    let stats = kb
        .batch_import(input)
        .with_context(|| format!("failed to import {}", input.display()))?;
    save_kb(&mut kb, path)?;
    println!(
        "{} {} added, {} skipped, {} errors",
        "Imported:".green(),
        stats.added,
        stats.skipped,
        if stats.errors > 0 {
            stats.errors.to_string().red().to_string()
        } else {
            stats.errors.to_string()
        }
    );
    Ok(())
}

fn cmd_kb_search(path: &Path, query: &str, top_n: usize, threshold: f64, json: bool) -> Result<()> {
    if !path.exists() {
        bail!("knowledge base {} does not exist", path.display());
    }
    let mut kb = open_kb(path)?;
    let matches = kb.search_with(query, top_n, threshold)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }
    if matches.is_empty() {
        println!("{}", "No matching terms.".dimmed());
    }
    for m in &matches {
        println!("{} → {}", m.source_term.yellow(), m.target_term.cyan());
    }
    Ok(())
}

fn cmd_kb_delete(path: &Path, context: &str) -> Result<()> {
    let mut kb = open_kb(path)?;
    let removed = kb.delete_entries(context);
    if removed > 0 {
        save_kb(&mut kb, path)?;
    }
    println!("{} {removed} entr{}", "Deleted".green(), if removed == 1 { "y" } else { "ies" });
    Ok(())
}

fn cmd_kb_stats(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("knowledge base {} does not exist", path.display());
    }
    let mut kb = open_kb(path)?;
    kb.rebuild()?;
    println!("{}", path.display().to_string().bold());
    println!("  Entries: {}", kb.len());
    println!("  Terms: {}", kb.term_index().len());
    println!("  Vocabulary: {}", kb.vectorizer().vocabulary_len());
    Ok(())
}

fn print_report(report: &EvalReport) {
    println!("{} {}", "Samples:".bold(), report.samples);
    let rows = [
        ("Precision", report.precision),
        ("Recall", report.recall),
        ("F1", report.f1),
        ("BLEU", report.bleu),
        ("Corpus BLEU", report.corpus_bleu),
        ("ROUGE-L", report.rouge_l),
        ("METEOR", report.meteor),
    ];
    for (name, value) in rows {
        if let Some(v) = value {
            println!("  {:<12} {}", name, format!("{v:.2}").green());
        }
    }
}

fn cmd_eval(prediction_file: &Path, reference_file: &Path, metric: Metric, json: bool) -> Result<()> {
    let pairs = EvalPairs::load(prediction_file, reference_file)?;
    let report = evaluate(&pairs, metric);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn cmd_eval_length(file: &Path) -> Result<()> {
    let stats = length_of_file(file)?;
    match stats.average() {
        Some(avg) => {
            println!("Total words: {}", stats.total_words);
            println!("Average length: {} words", format!("{avg:.2}").green());
        }
        None => println!("{}", "No non-empty lines to measure.".yellow()),
    }
    Ok(())
}

#[cfg(feature = "llm-openai")]
fn cmd_generate(config_path: &Path, input: &Path, output: &Path, refine: bool) -> Result<()> {
    use harmonydoc_gen::{CommentPipeline, GenerationConfig};

    let mut config = GenerationConfig::load(config_path)?;
    config.refine |= refine;
    let mut pipeline = CommentPipeline::from_config(&config)?;
    let stats = pipeline.run_files(input, output)?;
    println!(
        "{} {} comments to {} ({} failed)",
        "Wrote".green(),
        stats.generated,
        output.display(),
        stats.failed
    );
    if stats.failed > 0 && stats.generated == 0 {
        return Err(anyhow!("every item failed; see the log for details"));
    }
    Ok(())
}

#[cfg(not(feature = "llm-openai"))]
fn cmd_generate(_config: &Path, _input: &Path, _output: &Path, _refine: bool) -> Result<()> {
    Err(anyhow!("harmonydoc was built without an LLM backend (enable feature `llm-openai`)"))
}
