//! # Embeddings
//!
//! Pluggable token embedding components. An [`EmbeddingConfig`] names the
//! component class and carries its settings; [`EmbeddingConfig::build`]
//! turns it into a runnable [`Embedding`] once the processor is fitted.

pub mod bare;
pub mod transformer;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::processor::{Processor, ProcessorConfig, Task};
use crate::registry::{self, ClassEntry};

pub use bare::{BareEmbedding, BareEmbeddingConfig};
pub use transformer::{TransformerEmbedding, TransformerEmbeddingConfig};

/// Turns `(batch, seq_len)` token ids into `(batch, seq_len, output_dim)`
/// vectors.
pub trait Embedding: Send + Sync {
    fn embed(&self, token_ids: &Tensor) -> candle_core::Result<Tensor>;

    fn output_dim(&self) -> usize;
}

impl<T: Embedding + ?Sized> Embedding for Box<T> {
    fn embed(&self, token_ids: &Tensor) -> candle_core::Result<Tensor> {
        (**self).embed(token_ids)
    }

    fn output_dim(&self) -> usize {
        (**self).output_dim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmbeddingKind {
    Bare,
    Transformer,
}

const MODULE: &str = "wenzi_core::embedding";

const EMBEDDING_CLASSES: &[ClassEntry<EmbeddingKind>] = &[
    (MODULE, "BareEmbedding", EmbeddingKind::Bare),
    (MODULE, "TransformerEmbedding", EmbeddingKind::Transformer),
];

/// Class identity and settings of an embedding component.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingConfig {
    Bare(BareEmbeddingConfig),
    Transformer(TransformerEmbeddingConfig),
}

/// Embedding section of the model metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingInfo {
    pub module: String,
    pub class_name: String,
    pub config: serde_json::Value,
    pub processor: ProcessorInfo,
}

/// Processor section of the model metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorInfo {
    pub module: String,
    pub class_name: String,
    pub config: ProcessorConfig,
}

impl ProcessorInfo {
    pub fn of(processor: &Processor) -> Self {
        Self {
            module: Processor::MODULE.to_string(),
            class_name: Processor::CLASS_NAME.to_string(),
            config: processor.config().clone(),
        }
    }

    /// Rebuild the processor this section describes.
    pub fn load(&self) -> Result<Processor> {
        registry::locate(
            &self.module,
            &self.class_name,
            &[(Processor::MODULE, Processor::CLASS_NAME, ())],
        )?;
        Ok(Processor::from_config(self.config.clone()))
    }
}

impl EmbeddingConfig {
    /// A trainable lookup table with `embedding_size` dimensions.
    pub fn bare(embedding_size: usize) -> Self {
        EmbeddingConfig::Bare(BareEmbeddingConfig { embedding_size })
    }

    /// A frozen DistilBERT checkpoint directory.
    pub fn transformer(model_dir: impl Into<std::path::PathBuf>) -> Self {
        EmbeddingConfig::Transformer(TransformerEmbeddingConfig {
            model_dir: model_dir.into(),
        })
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            EmbeddingConfig::Bare(_) => "BareEmbedding",
            EmbeddingConfig::Transformer(_) => "TransformerEmbedding",
        }
    }

    pub fn module(&self) -> &'static str {
        MODULE
    }

    /// Resolve a stored class path and its JSON settings.
    pub fn locate(module: &str, class_name: &str, config: &serde_json::Value) -> Result<Self> {
        let kind = registry::locate(module, class_name, EMBEDDING_CLASSES)?;
        Ok(match kind {
            EmbeddingKind::Bare => EmbeddingConfig::Bare(serde_json::from_value(config.clone())?),
            EmbeddingKind::Transformer => {
                EmbeddingConfig::Transformer(serde_json::from_value(config.clone())?)
            }
        })
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(match self {
            EmbeddingConfig::Bare(config) => serde_json::to_value(config)?,
            EmbeddingConfig::Transformer(config) => serde_json::to_value(config)?,
        })
    }

    /// Fresh processor configuration for a task. Pretrained embeddings seed
    /// the vocabulary.
    pub fn processor_config(&self, task: Task) -> Result<ProcessorConfig> {
        let config = ProcessorConfig::new(task);
        match self {
            EmbeddingConfig::Bare(_) => Ok(config),
            EmbeddingConfig::Transformer(transformer) => {
                let vocab = transformer.load_vocabulary()?;
                Ok(config.with_pretrained_vocab(
                    vocab,
                    transformer::PAD_TOKEN,
                    transformer::UNK_TOKEN,
                ))
            }
        }
    }

    /// Build the component. Trainable weights are created under `vb`.
    pub fn build(&self, processor: &Processor, vb: VarBuilder) -> Result<Box<dyn Embedding>> {
        Ok(match self {
            EmbeddingConfig::Bare(config) => Box::new(BareEmbedding::new(
                processor.vocab_size(),
                config.embedding_size,
                vb.pp("embedding"),
            )?),
            EmbeddingConfig::Transformer(config) => {
                Box::new(TransformerEmbedding::load(config, vb.device())?)
            }
        })
    }

    pub fn info(&self, processor: &Processor) -> Result<EmbeddingInfo> {
        Ok(EmbeddingInfo {
            module: self.module().to_string(),
            class_name: self.class_name().to_string(),
            config: self.to_value()?,
            processor: ProcessorInfo::of(processor),
        })
    }
}
