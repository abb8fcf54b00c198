//! Sampler
//!
//! Strategies for splitting the rows of a dataset into mini-batches before
//! each training epoch.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum SampleMethod {
    Sequential,
    Shuffle,
}

// A sampler splits a row index into the batches of one epoch.
pub trait Sampler {
    /// Partition `index` into batches. Every row appears in exactly one batch.
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Vec<Vec<usize>>;
}

/// Batches in row order.
pub struct SequentialSampler {
    batch_size: usize,
}

impl SequentialSampler {
    pub fn new(batch_size: usize) -> Self {
        SequentialSampler {
            batch_size: batch_size.max(1),
        }
    }
}

impl Sampler for SequentialSampler {
    fn sample(&mut self, _rng: &mut StdRng, index: &[usize]) -> Vec<Vec<usize>> {
        index.chunks(self.batch_size).map(|c| c.to_vec()).collect()
    }
}

/// Shuffle the rows with the provided generator, then chunk.
pub struct ShuffleSampler {
    batch_size: usize,
}

impl ShuffleSampler {
    pub fn new(batch_size: usize) -> Self {
        ShuffleSampler {
            batch_size: batch_size.max(1),
        }
    }
}

impl Sampler for ShuffleSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Vec<Vec<usize>> {
        let mut shuffled = index.to_vec();
        shuffled.shuffle(rng);
        shuffled.chunks(self.batch_size).map(|c| c.to_vec()).collect()
    }
}
