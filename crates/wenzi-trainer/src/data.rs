//! Batch sampling over in-memory datasets.

use wenzi_core::utils::{entropy_seed, shuffle_in_place};

/// Yields example indices in shuffled mini-batches, reshuffled each epoch.
pub struct BatchSampler {
    len: usize,
    batch_size: usize,
    rng: oorandom::Rand64,
}

impl BatchSampler {
    pub fn new(len: usize, batch_size: usize, seed: Option<u64>) -> Self {
        Self {
            len,
            batch_size: batch_size.max(1),
            rng: oorandom::Rand64::new(u128::from(seed.unwrap_or_else(entropy_seed))),
        }
    }

    /// Number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        self.len.div_ceil(self.batch_size)
    }

    /// Index batches for one epoch; every index appears exactly once.
    pub fn epoch(&mut self) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.len).collect();
        shuffle_in_place(&mut indices, &mut self.rng);
        indices
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }
}
