//! Trainable lookup-table embedding.

use candle_core::Tensor;
use candle_nn::{Module, VarBuilder};
use serde::{Deserialize, Serialize};

use super::Embedding;

fn default_embedding_size() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BareEmbeddingConfig {
    #[serde(default = "default_embedding_size")]
    pub embedding_size: usize,
}

impl Default for BareEmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_size: default_embedding_size(),
        }
    }
}

/// A randomly initialized embedding table trained with the model.
pub struct BareEmbedding {
    embedding: candle_nn::Embedding,
    embedding_size: usize,
}

impl BareEmbedding {
    pub fn new(vocab_size: usize, embedding_size: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let embedding = candle_nn::embedding(vocab_size, embedding_size, vb)?;
        Ok(Self {
            embedding,
            embedding_size,
        })
    }
}

impl Embedding for BareEmbedding {
    fn embed(&self, token_ids: &Tensor) -> candle_core::Result<Tensor> {
        self.embedding.forward(token_ids)
    }

    fn output_dim(&self) -> usize {
        self.embedding_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_embed_shape() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let embedding = BareEmbedding::new(10, 8, vb).unwrap();

        let ids = Tensor::new(&[[1u32, 2, 3], [4, 0, 0]], &Device::Cpu).unwrap();
        let out = embedding.embed(&ids).unwrap();
        assert_eq!(out.dims(), &[2, 3, 8]);
        assert_eq!(embedding.output_dim(), 8);
    }

    #[test]
    fn test_config_default_size() {
        let config: BareEmbeddingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BareEmbeddingConfig::default());
    }
}
