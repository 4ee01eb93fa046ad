//! # Transformer Embedding
//!
//! Frozen DistilBERT features as token embeddings. The checkpoint directory
//! must hold `config.json`, `model.safetensors` and `tokenizer.json`; its
//! weights are loaded from there each time and never saved with the model.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer as HfTokenizer;
use tracing::{debug, info};

use super::Embedding;
use crate::error::{Result, WenziError};

/// Padding token of BERT-style vocabularies.
pub const PAD_TOKEN: &str = "[PAD]";
/// Unknown token of BERT-style vocabularies.
pub const UNK_TOKEN: &str = "[UNK]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerEmbeddingConfig {
    pub model_dir: PathBuf,
}

impl TransformerEmbeddingConfig {
    fn file(&self, name: &str) -> Result<PathBuf> {
        let path = self.model_dir.join(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(WenziError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )))
        }
    }

    /// Vocabulary of the checkpoint tokenizer, in id order.
    pub fn load_vocabulary(&self) -> Result<Vec<String>> {
        let tokenizer_path = self.file("tokenizer.json")?;
        let tokenizer = HfTokenizer::from_file(&tokenizer_path)
            .map_err(|e| WenziError::Tokenizer(e.to_string()))?;

        let vocab = tokenizer.get_vocab(true);
        let mut ordered = vec![String::new(); vocab.len()];
        for (token, id) in vocab {
            let id = id as usize;
            if id >= ordered.len() {
                ordered.resize(id + 1, String::new());
            }
            ordered[id] = token;
        }

        debug!(size = ordered.len(), path = %tokenizer_path.display(), "loaded pretrained vocabulary");
        Ok(ordered)
    }
}

/// DistilBERT last hidden states used as token features.
pub struct TransformerEmbedding {
    model: DistilBertModel,
    dim: usize,
    device: Device,
}

impl TransformerEmbedding {
    /// Load the checkpoint onto `device`.
    pub fn load(config: &TransformerEmbeddingConfig, device: &Device) -> Result<Self> {
        let config_str = std::fs::read_to_string(config.file("config.json")?)?;
        let bert_config: DistilBertConfig = serde_json::from_str(&config_str)?;
        let dim = serde_json::from_str::<serde_json::Value>(&config_str)?
            .get("dim")
            .and_then(|v| v.as_u64())
            .unwrap_or(768) as usize;

        let weights = config.file("model.safetensors")?;
        let model = load_distilbert(&weights, &bert_config, device)?;

        info!(model_dir = %config.model_dir.display(), dim, "loaded transformer embedding");
        Ok(Self {
            model,
            dim,
            device: device.clone(),
        })
    }
}

fn load_distilbert(weights: &Path, config: &DistilBertConfig, device: &Device) -> Result<DistilBertModel> {
    // SAFETY: the checkpoint is not modified while the model holds the mapping.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device) }?;
    match DistilBertModel::load(vb.clone(), config) {
        Ok(model) => Ok(model),
        // Checkpoints exported from task heads nest the encoder.
        Err(_) => Ok(DistilBertModel::load(vb.pp("distilbert"), config)?),
    }
}

impl Embedding for TransformerEmbedding {
    fn embed(&self, token_ids: &Tensor) -> candle_core::Result<Tensor> {
        let (_, seq_len) = token_ids.dims2()?;
        let mask = Tensor::zeros((seq_len, seq_len), DType::U8, &self.device)?;
        self.model.forward(token_ids, &mask)?.detach().to_dtype(DType::F32)
    }

    fn output_dim(&self) -> usize {
        self.dim
    }
}
