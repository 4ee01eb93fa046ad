//! Train a wenzi model on one of the bundled corpora and save it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wenzi_core::{DeviceSpec, EmbeddingConfig, Labels, Model, ModelClass};
use wenzi_corpus::{ChineseDailyNerCorpus, CorpusCache, Cutter, SMP2018ECDTCorpus, Subset};
use wenzi_trainer::{TrainConfig, Trainer};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CorpusKind {
    /// China People's Daily NER (sequence labeling)
    Ner,
    /// SMP2018-ECDT intents (classification)
    Smp,
}

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train a GRU model on a bundled corpus")]
#[command(version)]
struct Args {
    /// Corpus to train on
    #[arg(value_enum)]
    corpus: CorpusKind,

    /// Where to save the trained model
    #[arg(short, long, default_value = "models/wenzi")]
    output: PathBuf,

    /// Data directory for downloaded corpora
    #[arg(short = 'D', long, env = "WENZI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Sentence cutter for the classification corpus
    #[arg(long, default_value = "char")]
    cutter: Cutter,

    #[arg(short, long, default_value_t = 5)]
    epochs: usize,

    #[arg(short, long, default_value_t = 64)]
    batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    learning_rate: f64,

    /// Token embedding width
    #[arg(long, default_value_t = 100)]
    embedding_size: usize,

    /// GRU hidden size
    #[arg(long, default_value_t = 256)]
    hidden_size: usize,

    /// Device to train on: cpu, cuda:N or metal:N
    #[arg(long, default_value = "cpu")]
    device: DeviceSpec,

    /// Seed for shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Skip evaluation on the validation subset
    #[arg(long)]
    no_validation: bool,
}

type Dataset = (Vec<Vec<String>>, Labels);

fn load(args: &Args, cache: &CorpusCache, subset: Subset) -> Result<Dataset> {
    let data = match args.corpus {
        CorpusKind::Ner => {
            let mut corpus = ChineseDailyNerCorpus::new(cache.clone());
            if let Some(seed) = args.seed {
                corpus = corpus.with_seed(seed);
            }
            let (x, y) = corpus.load_data(subset, true)?;
            (x, Labels::Sequences(y))
        }
        CorpusKind::Smp => {
            let mut corpus = SMP2018ECDTCorpus::new(cache.clone());
            if let Some(seed) = args.seed {
                corpus = corpus.with_seed(seed);
            }
            let (x, y) = corpus.load_data(subset, true, args.cutter)?;
            (x, Labels::Classes(y))
        }
    };
    Ok(data)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cache = args
        .data_dir
        .clone()
        .map(CorpusCache::new)
        .unwrap_or_default();

    let (train_x, train_y) = load(&args, &cache, Subset::Train).context("failed to load training data")?;
    let validation = if args.no_validation {
        None
    } else {
        Some(load(&args, &cache, Subset::Valid).context("failed to load validation data")?)
    };

    let class = match args.corpus {
        CorpusKind::Ner => ModelClass::GruLabeling,
        CorpusKind::Smp => ModelClass::GruClassification,
    };
    let mut model = Model::new(class, EmbeddingConfig::bare(args.embedding_size))?
        .with_hidden_size(args.hidden_size)
        .with_device(args.device.open()?);

    let mut config = TrainConfig::default()
        .with_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_learning_rate(args.learning_rate);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let trainer = Trainer::new(config);
    let reports = trainer.fit(
        &mut model,
        &train_x,
        &train_y,
        validation.as_ref().map(|(x, y)| (x.as_slice(), y)),
    )?;

    let saved = model.save(&args.output)?;
    if let Some(last) = reports.last() {
        info!(
            path = %saved.display(),
            loss = last.train.loss,
            accuracy = last.train.accuracy,
            "training finished"
        );
    }
    Ok(())
}
