//! Supervision samples and mini-batching.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One observed rating: the unit of supervision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub user: u32,
    pub review: u32,
    pub rating: f32,
}

impl Sample {
    pub fn new(user: u32, review: u32, rating: f32) -> Self {
        Self {
            user,
            review,
            rating,
        }
    }
}

/// Column-major view of a batch of samples, ready to feed the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    pub users: Vec<u32>,
    pub reviews: Vec<u32>,
    pub ratings: Vec<f32>,
}

impl SampleBatch {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut batch = Self {
            users: Vec::with_capacity(samples.len()),
            reviews: Vec::with_capacity(samples.len()),
            ratings: Vec::with_capacity(samples.len()),
        };
        for s in samples {
            batch.users.push(s.user);
            batch.reviews.push(s.review);
            batch.ratings.push(s.rating);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Split samples into consecutive batches of at most `batch_size`.
///
/// `batch_size` of zero is treated as one.
pub fn batches(samples: &[Sample], batch_size: usize) -> Vec<SampleBatch> {
    samples
        .chunks(batch_size.max(1))
        .map(SampleBatch::from_samples)
        .collect()
}

/// Shuffle a copy of `samples` with `rng`, then batch it.
pub fn shuffled_batches<R: Rng + ?Sized>(
    samples: &[Sample],
    batch_size: usize,
    rng: &mut R,
) -> Vec<SampleBatch> {
    let mut order: Vec<Sample> = samples.to_vec();
    order.shuffle(rng);
    batches(&order, batch_size)
}
