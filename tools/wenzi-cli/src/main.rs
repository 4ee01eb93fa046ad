//! wenzi command line tool
//!
//! Downloads the bundled corpora, prints dataset statistics, converts the
//! NER corpus for doccano and inspects or exports saved models.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wenzi_core::persistence::{WEIGHTS_FILE, weight_manifest};
use wenzi_core::{
    DeviceSpec, SemanticRecord, convert_labeling_to_doccano, convert_to_saved_model,
    extract_entities, load_model, read_model_info,
};
use wenzi_corpus::{ChineseDailyNerCorpus, CorpusCache, Cutter, SMP2018ECDTCorpus, Subset};

/// CLI arguments
#[derive(Parser)]
#[command(name = "wenzi")]
#[command(about = "Corpus and model utilities for wenzi")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory for downloaded corpora
    #[arg(short = 'D', long, env = "WENZI_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CorpusKind {
    /// China People's Daily NER
    Ner,
    /// SMP2018-ECDT intents
    Smp,
}

impl CorpusKind {
    fn name_and_url(self) -> (&'static str, &'static str) {
        match self {
            CorpusKind::Ner => (ChineseDailyNerCorpus::NAME, ChineseDailyNerCorpus::URL),
            CorpusKind::Smp => (SMP2018ECDTCorpus::NAME, SMP2018ECDTCorpus::URL),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download and extract a corpus
    Download {
        #[arg(value_enum)]
        corpus: CorpusKind,
    },
    /// Print sample, length and label statistics of a corpus subset
    Stats {
        #[arg(value_enum)]
        corpus: CorpusKind,

        #[arg(short, long, default_value = "train")]
        subset: Subset,

        /// Sentence cutter for the classification corpus
        #[arg(long, default_value = "char")]
        cutter: Cutter,
    },
    /// Convert the NER corpus to doccano JSONL
    Doccano {
        #[arg(short, long, default_value = "train")]
        subset: Subset,

        /// Output JSONL file
        #[arg(short, long)]
        output: PathBuf,

        /// Separator placed between tokens
        #[arg(short, long, default_value = "")]
        join: String,
    },
    /// Export a saved model for serving
    Export {
        /// Saved model directory
        #[arg(short, long)]
        model: PathBuf,

        /// Export root; the version becomes a sub-directory
        #[arg(short, long)]
        out: PathBuf,

        /// Export version, defaults to the current Unix time
        #[arg(long)]
        version: Option<String>,

        /// Device to load the model on
        #[arg(long, default_value = "cpu")]
        device: DeviceSpec,
    },
    /// Show the metadata and weights of a saved model
    Info {
        #[arg(short, long)]
        model: PathBuf,
    },
    /// Remove downloaded corpora
    Clean {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Sample count, token length summary and label frequencies.
fn dataset_stats<'a>(x: &[Vec<String>], labels: impl Iterator<Item = &'a str>) -> Value {
    let lengths: Vec<usize> = x.iter().map(Vec::len).collect();
    let total: usize = lengths.iter().sum();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    json!({
        "samples": x.len(),
        "tokens": total,
        "min_length": lengths.iter().min().copied().unwrap_or(0),
        "max_length": lengths.iter().max().copied().unwrap_or(0),
        "mean_length": if x.is_empty() { 0.0 } else { total as f64 / x.len() as f64 },
        "labels": counts,
    })
}

/// Entity type of every span in `y`.
fn entity_types(y: &[Vec<String>]) -> Vec<String> {
    y.iter()
        .flat_map(|tags| extract_entities(tags))
        .map(|span| span.entity)
        .collect()
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("{prompt}");
    print!("Are you sure? [y/N]: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cache = cli.data_dir.map(CorpusCache::new).unwrap_or_default();

    match cli.command {
        Commands::Download { corpus } => {
            let (name, url) = corpus.name_and_url();
            let path = cache
                .get_file(name, url, true)
                .with_context(|| format!("failed to download {name}"))?;
            println!("{}", path.display());
        }
        Commands::Stats {
            corpus,
            subset,
            cutter,
        } => {
            let stats = match corpus {
                CorpusKind::Ner => {
                    let (x, y) = ChineseDailyNerCorpus::new(cache).load_data(subset, false)?;
                    let entities = entity_types(&y);
                    dataset_stats(&x, entities.iter().map(String::as_str))
                }
                CorpusKind::Smp => {
                    let (x, y) = SMP2018ECDTCorpus::new(cache).load_data(subset, false, cutter)?;
                    dataset_stats(&x, y.iter().map(String::as_str))
                }
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Doccano {
            subset,
            output,
            join,
        } => {
            let (x, y) = ChineseDailyNerCorpus::new(cache).load_data(subset, false)?;
            let records: Vec<SemanticRecord> = x
                .iter()
                .zip(&y)
                .map(|(tokens, tags)| SemanticRecord::from_tags(tokens, tags))
                .collect();
            let converted = convert_labeling_to_doccano(&records, Some(&output), &join)?;
            info!(records = converted.len(), path = %output.display(), "wrote doccano file");
        }
        Commands::Export {
            model,
            out,
            version,
            device,
        } => {
            let loaded = load_model(&model, &device.open()?)
                .with_context(|| format!("failed to load model from {}", model.display()))?;
            let path = convert_to_saved_model(&loaded, &out, version.as_deref(), None, None)?;
            println!("{}", path.display());
        }
        Commands::Info { model } => {
            let model_info = read_model_info(&model)?;
            let weights = weight_manifest(model.join(WEIGHTS_FILE))?;
            let parameters: usize = weights.iter().map(|t| t.num_elements()).sum();
            let report = json!({
                "model": model_info,
                "parameters": parameters,
                "weights": weights,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Clean { yes } => {
            if !yes && !confirm("This will remove all downloaded corpora.")? {
                info!("Clean cancelled");
                return Ok(());
            }
            if cache.clean()? {
                println!("Removed {}", cache.datasets_dir().display());
            } else {
                println!("Nothing to clean");
            }
        }
    }

    Ok(())
}
