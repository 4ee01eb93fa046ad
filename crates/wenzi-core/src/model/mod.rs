//! # Models
//!
//! A [`Model`] ties a processor, an embedding component and a GRU network
//! together and knows how to describe itself in a [`ModelInfo`] document.

pub mod network;

use std::path::{Path, PathBuf};

use candle_core::{D, DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::distribute::ReplicatedNetwork;
use crate::embedding::{EmbeddingConfig, EmbeddingInfo};
use crate::encoder::DEFAULT_HIDDEN_SIZE;
use crate::error::{Result, WenziError};
use crate::processor::{Labels, Processor, Task};
use crate::registry::{self, ClassEntry};

pub use network::Network;

const MODULE: &str = "wenzi_core::model";

/// The model architectures that can be saved and rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelClass {
    /// Per-token tagging (NER, chunking).
    GruLabeling,
    /// Whole-sequence classification (intent, sentiment).
    GruClassification,
}

const MODEL_CLASSES: &[ClassEntry<ModelClass>] = &[
    (MODULE, "GruLabelingModel", ModelClass::GruLabeling),
    (MODULE, "GruClassificationModel", ModelClass::GruClassification),
];

impl ModelClass {
    pub fn module(&self) -> &'static str {
        MODULE
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ModelClass::GruLabeling => "GruLabelingModel",
            ModelClass::GruClassification => "GruClassificationModel",
        }
    }

    pub fn task(&self) -> Task {
        match self {
            ModelClass::GruLabeling => Task::Labeling,
            ModelClass::GruClassification => Task::Classification,
        }
    }

    /// Resolve a stored `module` + `class_name` pair.
    pub fn locate(module: &str, class_name: &str) -> Result<Self> {
        registry::locate(module, class_name, MODEL_CLASSES)
    }
}

/// Serialized network shape, enough to rebuild the var map layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub task: Task,
    pub hidden_size: usize,
    pub embedding_dim: usize,
    pub num_labels: usize,
    pub sequence_length: usize,
    pub weights: String,
}

/// The `model_info.json` document written next to saved weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub module: String,
    pub class_name: String,
    #[serde(alias = "tf_model")]
    pub architecture: ArchitectureConfig,
    pub embedding: EmbeddingInfo,
    #[serde(default)]
    pub wenzi_version: String,
}

pub(crate) enum Runtime {
    Single(Network),
    Replicated(ReplicatedNetwork),
}

/// A sequence labeling or classification model.
pub struct Model {
    class: ModelClass,
    embedding: EmbeddingConfig,
    hidden_size: usize,
    processor: Processor,
    device: Device,
    varmap: VarMap,
    runtime: Option<Runtime>,
}

impl Model {
    /// Create an unbuilt model. Pretrained embeddings read their
    /// vocabulary here.
    pub fn new(class: ModelClass, embedding: EmbeddingConfig) -> Result<Self> {
        let processor = Processor::new(embedding.processor_config(class.task())?);
        Ok(Self::from_parts(class, embedding, processor, DEFAULT_HIDDEN_SIZE, Device::Cpu))
    }

    pub(crate) fn from_parts(
        class: ModelClass,
        embedding: EmbeddingConfig,
        processor: Processor,
        hidden_size: usize,
        device: Device,
    ) -> Self {
        Self {
            class,
            embedding,
            hidden_size,
            processor,
            device,
            varmap: VarMap::new(),
            runtime: None,
        }
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Fix the padded sequence length instead of deriving it from data.
    pub fn with_sequence_length(mut self, sequence_length: usize) -> Self {
        let config = self
            .processor
            .config()
            .clone()
            .with_sequence_length(Some(sequence_length));
        self.processor = Processor::new(config);
        self
    }

    pub fn class(&self) -> ModelClass {
        self.class
    }

    pub fn task(&self) -> Task {
        self.class.task()
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn embedding(&self) -> &EmbeddingConfig {
        &self.embedding
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub(crate) fn varmap_mut(&mut self) -> &mut VarMap {
        &mut self.varmap
    }

    pub fn is_built(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn is_distributed(&self) -> bool {
        matches!(self.runtime, Some(Runtime::Replicated(_)))
    }

    pub(crate) fn set_runtime(&mut self, runtime: Runtime) {
        self.runtime = Some(runtime);
    }

    /// Fit the processor on `x`/`y` and create the network.
    pub fn build_model(&mut self, x: &[Vec<String>], y: &Labels) -> Result<()> {
        if y.task() != self.task() {
            return Err(WenziError::TaskMismatch {
                expected: self.task().as_str(),
                actual: y.task().as_str(),
            });
        }
        self.processor.fit(x, y)?;
        self.build_network()?;

        info!(
            class = self.class.class_name(),
            vocab = self.processor.vocab_size(),
            labels = self.processor.num_labels(),
            hidden = self.hidden_size,
            "built model"
        );
        Ok(())
    }

    /// Like [`Model::build_model`], but also fits the processor on the
    /// validation split so its tokens and labels are indexed.
    pub fn build_model_with_validation(
        &mut self,
        x: &[Vec<String>],
        y: &Labels,
        validation: Option<(&[Vec<String>], &Labels)>,
    ) -> Result<()> {
        match validation {
            None => self.build_model(x, y),
            Some((valid_x, valid_y)) => {
                valid_y.check_aligned(valid_x)?;
                let all_x: Vec<Vec<String>> = x.iter().chain(valid_x).cloned().collect();
                let all_y = y.concat(valid_y)?;
                self.build_model(&all_x, &all_y)
            }
        }
    }

    /// Create a fresh network for the already fitted processor.
    pub(crate) fn build_network(&mut self) -> Result<()> {
        if !self.processor.is_fitted() {
            return Err(WenziError::ProcessorNotFitted);
        }
        self.varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&self.varmap, DType::F32, &self.device);
        let network = Network::new(&self.embedding, &self.processor, self.hidden_size, vb)?;
        self.runtime = Some(Runtime::Single(network));
        Ok(())
    }

    /// Trainable variables of a single-device model.
    pub fn trainable_vars(&self) -> Result<Vec<Var>> {
        match &self.runtime {
            None => Err(WenziError::ModelNotBuilt("training")),
            Some(Runtime::Replicated(_)) => Err(WenziError::Unsupported(
                "multi-device models are inference replicas, train before converting",
            )),
            Some(Runtime::Single(_)) => Ok(self.varmap.all_vars()),
        }
    }

    /// Emission scores for `(batch, seq_len)` token ids.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        match &self.runtime {
            None => Err(WenziError::ModelNotBuilt("forward")),
            Some(Runtime::Single(network)) => network.forward(token_ids),
            Some(Runtime::Replicated(replicas)) => replicas.forward(token_ids),
        }
    }

    /// Predict labels for token sequences, `batch_size` examples at a time.
    ///
    /// For labeling, tokens past the processor's sequence length are not
    /// seen by the network and are tagged `O`, so every output row has as
    /// many tags as its input has tokens.
    pub fn predict(&self, x: &[Vec<String>], batch_size: usize) -> Result<Labels> {
        if !self.is_built() {
            return Err(WenziError::ModelNotBuilt("predict"));
        }
        let seq_len = self.processor.sequence_length()?;
        let mut indices: Vec<Vec<u32>> = Vec::with_capacity(x.len());

        for chunk in x.chunks(batch_size.max(1)) {
            let ids = self.processor.numerize_x(chunk, &self.device)?;
            let logits = self.forward(&ids)?;
            let best = logits.argmax(D::Minus1)?;
            match self.task() {
                Task::Labeling => indices.extend(best.to_vec2::<u32>()?),
                Task::Classification => {
                    indices.extend(best.to_vec1::<u32>()?.into_iter().map(|i| vec![i]))
                }
            }
        }

        let lengths: Vec<usize> = x.iter().map(|tokens| tokens.len().min(seq_len)).collect();
        let labels = match self.processor.reverse_numerize(&indices, &lengths) {
            Labels::Sequences(mut seqs) => {
                for (tags, tokens) in seqs.iter_mut().zip(x) {
                    tags.resize(tokens.len(), "O".to_string());
                }
                Labels::Sequences(seqs)
            }
            classes => classes,
        };
        Ok(labels)
    }

    /// Describe the model for `model_info.json`.
    pub fn info(&self) -> Result<ModelInfo> {
        let embedding_dim = match &self.runtime {
            Some(Runtime::Single(network)) => network.embedding_dim(),
            Some(Runtime::Replicated(replicas)) => replicas.embedding_dim(),
            None => return Err(WenziError::ModelNotBuilt("describing the model")),
        };

        Ok(ModelInfo {
            module: self.class.module().to_string(),
            class_name: self.class.class_name().to_string(),
            architecture: ArchitectureConfig {
                task: self.task(),
                hidden_size: self.hidden_size,
                embedding_dim,
                num_labels: self.processor.num_labels(),
                sequence_length: self.processor.sequence_length()?,
                weights: crate::persistence::WEIGHTS_FILE.to_string(),
            },
            embedding: self.embedding.info(&self.processor)?,
            wenzi_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Save weights and metadata to `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        crate::persistence::save_model(self, dir)
    }
}
