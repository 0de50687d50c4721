//! Dataset bundle: graph structure plus train/test samples.
//!
//! The on-disk format is a single JSON document:
//!
//! ```text
//! {
//!   "num_users": 3, "num_reviews": 3, "num_ratings": 5,
//!   "user_history":   { "items": [[0, 1], ...], "ratings": [[4, 2], ...] },
//!   "review_history": { "items": [[0, 2], ...], "ratings": [[4, 3], ...] },
//!   "user_adjacency": [[1, 2], [0, 2], [0, 1]],
//!   "review_adjacency": [],
//!   "train": [{ "user": 0, "review": 0, "rating": 5.0 }, ...],
//!   "test":  [...]
//! }
//! ```
//!
//! Adjacency lists and the test split are optional.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{Adjacency, HistoryLists, IdSpace, InteractionGraph, Sample, TableSizes};

/// Everything the model and driver need, as loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub num_users: usize,
    pub num_reviews: usize,
    pub num_ratings: usize,
    pub user_history: HistoryLists,
    pub review_history: HistoryLists,
    #[serde(default)]
    pub user_adjacency: Adjacency,
    #[serde(default)]
    pub review_adjacency: Adjacency,
    pub train: Vec<Sample>,
    #[serde(default)]
    pub test: Vec<Sample>,
}

/// Summary statistics of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub num_users: usize,
    pub num_reviews: usize,
    pub num_ratings: usize,
    pub num_train: usize,
    pub num_test: usize,
    pub num_interactions: usize,
    pub mean_user_history: f64,
    pub mean_review_history: f64,
    pub cold_start_users: usize,
    pub cold_start_reviews: usize,
    /// Linked user pairs; a one-way link counts as one pair.
    pub user_edges: usize,
    pub review_edges: usize,
    pub isolated_users: usize,
    pub isolated_reviews: usize,
}

impl Dataset {
    pub fn sizes(&self) -> TableSizes {
        TableSizes {
            users: self.num_users,
            reviews: self.num_reviews,
            ratings: self.num_ratings,
        }
    }

    /// Validated graph view (clones the lists).
    pub fn graph(&self) -> Result<InteractionGraph> {
        InteractionGraph::new(
            self.sizes(),
            self.user_history.clone(),
            self.review_history.clone(),
            self.user_adjacency.clone(),
            self.review_adjacency.clone(),
        )
    }

    /// Check the graph and every train/test sample.
    pub fn validate(&self) -> Result<()> {
        self.graph()?;
        self.check_samples()
    }

    fn check_samples(&self) -> Result<()> {
        for s in self.train.iter().chain(&self.test) {
            IdSpace::User.check(s.user, self.num_users)?;
            IdSpace::Review.check(s.review, self.num_reviews)?;
            if !s.rating.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "non-finite rating for (user {}, review {})",
                    s.user, s.review
                )));
            }
        }
        Ok(())
    }

    /// Consume the dataset into a validated graph and the two sample splits.
    pub fn into_parts(self) -> Result<(InteractionGraph, Vec<Sample>, Vec<Sample>)> {
        self.check_samples()?;
        let graph = InteractionGraph::new(
            self.sizes(),
            self.user_history,
            self.review_history,
            self.user_adjacency,
            self.review_adjacency,
        )?;
        Ok((graph, self.train, self.test))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let dataset: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(dataset)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn stats(&self) -> DatasetStats {
        let mean = |total: usize, n: usize| if n == 0 { 0.0 } else { total as f64 / n as f64 };
        DatasetStats {
            num_users: self.num_users,
            num_reviews: self.num_reviews,
            num_ratings: self.num_ratings,
            num_train: self.train.len(),
            num_test: self.test.len(),
            num_interactions: self.user_history.num_interactions(),
            mean_user_history: mean(self.user_history.num_interactions(), self.num_users),
            mean_review_history: mean(self.review_history.num_interactions(), self.num_reviews),
            cold_start_users: self.user_history.num_cold_start(),
            cold_start_reviews: self.review_history.num_cold_start(),
            user_edges: self.user_adjacency.num_linked_pairs(),
            review_edges: self.review_adjacency.num_linked_pairs(),
            isolated_users: self.user_adjacency.num_isolated(self.num_users),
            isolated_reviews: self.review_adjacency.num_isolated(self.num_reviews),
        }
    }

    /// A fixed three-user, three-review dataset.
    ///
    /// Ratings are 1..=5 (rating index = value - 1), every entity has a
    /// two-item history, users form a triangle, and reviews 0 and 1 are
    /// linked while review 2 is isolated.
    pub fn toy() -> Self {
        // (user, review, rating value)
        let interactions: [(u32, u32, u32); 6] = [
            (0, 0, 5),
            (0, 1, 3),
            (1, 1, 4),
            (1, 2, 2),
            (2, 2, 1),
            (2, 0, 4),
        ];

        let mut user_history = HistoryLists::empty(3);
        let mut review_history = HistoryLists::empty(3);
        for &(u, r, value) in &interactions {
            user_history.push(u, r, value - 1);
            review_history.push(r, u, value - 1);
        }

        let samples: Vec<Sample> = interactions
            .iter()
            .map(|&(u, r, value)| Sample::new(u, r, value as f32))
            .collect();
        let (train, test) = samples.split_at(5);

        Self {
            num_users: 3,
            num_reviews: 3,
            num_ratings: 5,
            user_history,
            review_history,
            user_adjacency: Adjacency::from_undirected_edges(3, [(0, 1), (1, 2), (2, 0)]),
            review_adjacency: Adjacency::from_undirected_edges(3, [(0, 1)]),
            train: train.to_vec(),
            test: test.to_vec(),
        }
    }

    /// Seeded random dataset with latent user bias and review quality.
    ///
    /// Rating value = round(quality + bias), clamped to `1..=num_ratings`.
    /// Histories are built from the training split only, so test pairs never
    /// appear in either history list.
    pub fn synthetic(config: &SyntheticConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let max_rating = config.num_ratings as f32;

        let bias: Vec<f32> = (0..config.num_users)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        let quality: Vec<f32> = (0..config.num_reviews)
            .map(|_| rng.gen_range(1.0..=max_rating))
            .collect();

        let per_user = config.interactions_per_user.min(config.num_reviews);
        let mut samples = Vec::with_capacity(config.num_users * per_user);
        for u in 0..config.num_users {
            for r in index::sample(&mut rng, config.num_reviews, per_user) {
                let noise: f32 = rng.gen_range(-0.5..0.5);
                let value = (quality[r] + bias[u] + noise).round().clamp(1.0, max_rating);
                samples.push(Sample::new(u as u32, r as u32, value));
            }
        }
        samples.shuffle(&mut rng);

        let num_test = (samples.len() as f64 * config.test_fraction).round() as usize;
        let test = samples.split_off(samples.len() - num_test);
        let train = samples;

        let mut user_history = HistoryLists::empty(config.num_users);
        let mut review_history = HistoryLists::empty(config.num_reviews);
        for s in &train {
            let rating_index = s.rating as u32 - 1;
            user_history.push(s.user, s.review, rating_index);
            review_history.push(s.review, s.user, rating_index);
        }

        let user_adjacency =
            random_adjacency(&mut rng, config.num_users, config.neighbors_per_user);
        let review_adjacency =
            random_adjacency(&mut rng, config.num_reviews, config.neighbors_per_review);

        Ok(Self {
            num_users: config.num_users,
            num_reviews: config.num_reviews,
            num_ratings: config.num_ratings,
            user_history,
            review_history,
            user_adjacency,
            review_adjacency,
            train,
            test,
        })
    }
}

fn random_adjacency<R: Rng>(rng: &mut R, n: usize, per_node: usize) -> Adjacency {
    let per_node = per_node.min(n.saturating_sub(1));
    let mut edges = Vec::with_capacity(n * per_node);
    for a in 0..n {
        let picks = index::sample(rng, n, per_node + 1)
            .into_iter()
            .filter(|&b| b != a)
            .take(per_node);
        edges.extend(picks.map(|b| (a as u32, b as u32)));
    }
    Adjacency::from_undirected_edges(n, edges)
}

/// Parameters for [`Dataset::synthetic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub num_users: usize,
    pub num_reviews: usize,
    pub num_ratings: usize,
    /// Distinct reviews rated by each user (capped at `num_reviews`).
    pub interactions_per_user: usize,
    /// Random user-user links drawn per user (before symmetrization).
    pub neighbors_per_user: usize,
    /// Random review-review links drawn per review (before symmetrization).
    pub neighbors_per_review: usize,
    /// Fraction of samples held out for testing, in `[0, 1)`.
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_users: 100,
            num_reviews: 200,
            num_ratings: 5,
            interactions_per_user: 10,
            neighbors_per_user: 5,
            neighbors_per_review: 3,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn with_sizes(mut self, users: usize, reviews: usize, ratings: usize) -> Self {
        self.num_users = users;
        self.num_reviews = reviews;
        self.num_ratings = ratings;
        self
    }

    pub fn with_interactions_per_user(mut self, n: usize) -> Self {
        self.interactions_per_user = n;
        self
    }

    pub fn with_neighbors(mut self, per_user: usize, per_review: usize) -> Self {
        self.neighbors_per_user = per_user;
        self.neighbors_per_review = per_review;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_users == 0 || self.num_reviews == 0 || self.num_ratings == 0 {
            return Err(Error::InvalidConfig(
                "users, reviews and ratings must all be non-zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(Error::InvalidConfig(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toy_is_valid() {
        let ds = Dataset::toy();
        ds.validate().unwrap();

        let stats = ds.stats();
        assert_eq!(stats.num_users, 3);
        assert_eq!(stats.num_train, 5);
        assert_eq!(stats.num_test, 1);
        assert_eq!(stats.num_interactions, 6);
        assert!((stats.mean_user_history - 2.0).abs() < 1e-12);
        assert_eq!(stats.user_edges, 3);
        assert_eq!(stats.isolated_users, 0);
        assert_eq!(stats.isolated_reviews, 1);
        assert_eq!(stats.review_edges, 1);
    }

    #[test]
    fn test_stats_count_directed_trust_edges() {
        let mut ds = Dataset::toy();
        ds.user_adjacency = Adjacency::new(vec![vec![1], vec![2], vec![0]]);
        ds.validate().unwrap();
        assert_eq!(ds.stats().user_edges, 3);
        assert_eq!(ds.stats().isolated_users, 0);
    }

    #[test]
    fn test_toy_histories_are_consistent() {
        let ds = Dataset::toy();
        for u in 0..3u32 {
            let (reviews, ratings) = ds.user_history.get(u).unwrap();
            assert_eq!(reviews.len(), 2);
            for (&r, &rating) in reviews.iter().zip(ratings) {
                let (users, back) = ds.review_history.get(r).unwrap();
                let pos = users.iter().position(|&x| x == u).unwrap();
                assert_eq!(back[pos], rating);
            }
        }
    }

    #[test]
    fn test_sample_out_of_range_rejected() {
        let mut ds = Dataset::toy();
        ds.test.push(Sample::new(3, 0, 2.0));
        assert!(matches!(
            ds.validate(),
            Err(Error::UnknownId {
                space: IdSpace::User,
                id: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_non_finite_rating_rejected() {
        let mut ds = Dataset::toy();
        ds.train[0].rating = f32::NAN;
        assert!(matches!(ds.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_json_roundtrip_keeps_optional_fields_optional() {
        let ds = Dataset::toy();
        let json = serde_json::to_string(&ds).unwrap();
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(ds, back);

        let minimal = r#"{
            "num_users": 1, "num_reviews": 1, "num_ratings": 2,
            "user_history": {"items": [[0]], "ratings": [[1]]},
            "review_history": {"items": [[0]], "ratings": [[1]]},
            "train": [{"user": 0, "review": 0, "rating": 2.0}]
        }"#;
        let ds: Dataset = serde_json::from_str(minimal).unwrap();
        ds.validate().unwrap();
        assert!(ds.test.is_empty());
        assert_eq!(ds.user_adjacency.num_rows(), 0);
    }

    #[test]
    fn test_synthetic_is_valid_and_seeded() {
        let config = SyntheticConfig::default()
            .with_sizes(20, 30, 5)
            .with_interactions_per_user(4)
            .with_seed(3);
        let a = Dataset::synthetic(&config).unwrap();
        let b = Dataset::synthetic(&config).unwrap();
        assert_eq!(a, b);
        a.validate().unwrap();

        assert_eq!(a.train.len() + a.test.len(), 80);
        assert_eq!(a.test.len(), 16);
        assert_eq!(a.user_history.num_interactions(), a.train.len());
        assert!(a
            .train
            .iter()
            .chain(&a.test)
            .all(|s| (1.0..=5.0).contains(&s.rating)));
    }

    #[test]
    fn test_synthetic_rejects_bad_fraction() {
        let config = SyntheticConfig::default().with_test_fraction(1.0);
        assert!(matches!(
            Dataset::synthetic(&config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
