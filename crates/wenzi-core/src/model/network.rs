//! Encoder plus task head, the part of a model that owns tensors.

use candle_core::{Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};

use crate::embedding::{Embedding, EmbeddingConfig};
use crate::encoder::GruEncoder;
use crate::error::Result;
use crate::processor::{Processor, Task};

/// A GRU encoder with a linear emission head.
///
/// Labeling heads score every output step, classification heads score the
/// final hidden state.
pub struct Network {
    encoder: GruEncoder<Box<dyn Embedding>>,
    head: Linear,
    task: Task,
    device: Device,
}

impl Network {
    /// Create the network for a fitted processor. Trainable weights are
    /// registered in the var map behind `vb`.
    pub fn new(
        embedding: &EmbeddingConfig,
        processor: &Processor,
        hidden_size: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let device = vb.device().clone();
        let embedding = embedding.build(processor, vb.clone())?;
        let encoder = GruEncoder::new(embedding, hidden_size, vb.pp("gru"))?;
        let head = candle_nn::linear(hidden_size, processor.num_labels(), vb.pp("head"))?;

        Ok(Self {
            encoder,
            head,
            task: processor.task(),
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn embedding_dim(&self) -> usize {
        self.encoder.embedding().output_dim()
    }

    /// Emission scores: `(batch, seq_len, labels)` for labeling,
    /// `(batch, labels)` for classification.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        let (batch, _) = token_ids.dims2()?;
        let hidden = self.encoder.initialize_hidden_state(batch, &self.device)?;
        let (output, state) = self.encoder.forward(token_ids, &hidden)?;

        let logits = match self.task {
            Task::Labeling => self.head.forward(&output)?,
            Task::Classification => self.head.forward(&state)?,
        };
        Ok(logits)
    }
}
