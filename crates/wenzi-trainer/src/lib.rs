//! # wenzi Trainer
//!
//! Mini-batch training for wenzi models: shuffled batches, AdamW updates
//! and per-epoch reports, plus the `train` binary that fits a model on one
//! of the bundled corpora and saves it.

pub mod data;
pub mod trainer;

pub use data::BatchSampler;
pub use trainer::{EpochReport, Evaluation, TrainConfig, Trainer, masked_cross_entropy};
