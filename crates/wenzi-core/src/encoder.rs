//! # GRU Encoder
//!
//! Embedding followed by a single GRU layer. Returns the full output
//! sequence together with the final hidden state, so it can feed both
//! per-token heads and sequence-level heads (or a decoder).

use candle_core::{DType, Device, Tensor};
use candle_nn::rnn::{GRUConfig, GRUState, GRU, RNN};
use candle_nn::{Init, VarBuilder};

use crate::embedding::Embedding;
use crate::error::{Result, WenziError};

/// Default hidden size of the recurrent layer.
pub const DEFAULT_HIDDEN_SIZE: usize = 1024;

/// Embedding + GRU over `(batch, seq_len)` token ids.
pub struct GruEncoder<E> {
    embedding: E,
    gru: GRU,
    hidden_size: usize,
}

impl<E: Embedding> GruEncoder<E> {
    /// Create the encoder; GRU weights live under `vb`.
    ///
    /// Recurrent weights use a Glorot uniform initializer.
    pub fn new(embedding: E, hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        let limit = (6.0 / (hidden_size + 3 * hidden_size) as f64).sqrt();
        let config = GRUConfig {
            w_hh_init: Init::Uniform {
                lo: -limit,
                up: limit,
            },
            ..GRUConfig::default()
        };
        let gru = candle_nn::rnn::gru(embedding.output_dim(), hidden_size, config, vb)?;

        Ok(Self {
            embedding,
            gru,
            hidden_size,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn embedding(&self) -> &E {
        &self.embedding
    }

    /// Zero hidden state for a batch.
    pub fn initialize_hidden_state(&self, batch_size: usize, device: &Device) -> Result<Tensor> {
        Ok(Tensor::zeros((batch_size, self.hidden_size), DType::F32, device)?)
    }

    /// Run the encoder.
    ///
    /// `x` is `(batch, seq_len)` token ids and `hidden` the `(batch, hidden)`
    /// initial state. Returns `(output, state)` with output
    /// `(batch, seq_len, hidden)` and state `(batch, hidden)`.
    pub fn forward(&self, x: &Tensor, hidden: &Tensor) -> Result<(Tensor, Tensor)> {
        let (_, seq_len) = x.dims2()?;
        if seq_len == 0 {
            return Err(WenziError::EmptyInput("encoder sequence"));
        }

        let embedded = self.embedding.embed(x)?;
        let init = GRUState { h: hidden.clone() };
        let states = self.gru.seq_init(&embedded, &init)?;
        let steps: Vec<Tensor> = states.iter().map(|s| s.h().clone()).collect();
        let state = steps
            .last()
            .cloned()
            .ok_or(WenziError::EmptyInput("encoder sequence"))?;
        // one (batch, hidden) tensor per step, stacked on the time axis
        let output = Tensor::stack(&steps, 1)?;

        Ok((output, state))
    }
}
