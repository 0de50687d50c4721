//! The assembled rating model.
//!
//! ```text
//! ids -> tables -> HistoryEncoder -> InteractionEncoder -> ScoringHead
//! ```
//!
//! Both entity types get their own history encoder and interaction
//! encoder. The three embedding tables are shared: the user table anchors
//! user-side attention and supplies counterparts for review histories, and
//! vice versa.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use revgraph_core::{Adjacency, HistoryLists, IdSpace, InteractionGraph, TableSizes};
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::embedding::{Embed, EmbeddingTable};
use crate::error::{Error, Result};
use crate::head::ScoringHead;
use crate::history::{HistoryAggregator, HistoryEncoder};
use crate::interaction::{InteractionAggregator, InteractionEncoder};

/// Global model mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Dropout active; batch norm normalizes with batch statistics and
    /// updates its running statistics.
    Train,
    /// Dropout off; batch norm uses frozen running statistics.
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        self == Mode::Train
    }
}

/// Full encoder stack of one entity type.
pub type EntityEncoder = InteractionEncoder<HistoryEncoder>;

/// Two-hop graph model predicting the rating a user gives a review.
pub struct GraphRatingModel {
    users: EntityEncoder,
    reviews: EntityEncoder,
    head: ScoringHead,
    sizes: TableSizes,
    config: ModelConfig,
    mode: Mode,
}

fn side(graph: &InteractionGraph, space: IdSpace) -> Result<(Arc<HistoryLists>, Arc<Adjacency>)> {
    match (graph.history(space), graph.adjacency(space)) {
        (Some(history), Some(adjacency)) => Ok((history, adjacency)),
        _ => Err(Error::InvalidConfig(format!("{space} is not an entity type"))),
    }
}

impl GraphRatingModel {
    /// Build all tables and layers under `vb`.
    ///
    /// `vb` fixes device and dtype. To resume from saved weights, build the
    /// model on a `VarMap`-backed builder and load the map afterwards.
    pub fn new(config: &ModelConfig, graph: &InteractionGraph, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let dim = config.embed_dim;
        let sizes = graph.sizes();

        let u2e = EmbeddingTable::new(IdSpace::User, sizes.users, dim, vb.pp("u2e"))?;
        let r2e = EmbeddingTable::new(IdSpace::Review, sizes.reviews, dim, vb.pp("r2e"))?;
        let rating2e = EmbeddingTable::new(IdSpace::Rating, sizes.ratings, dim, vb.pp("rating2e"))?;

        let (user_history, user_adjacency) = side(graph, IdSpace::User)?;
        let (review_history, review_adjacency) = side(graph, IdSpace::Review)?;

        let users = Self::entity_encoder(
            &u2e,
            &r2e,
            &rating2e,
            user_history,
            user_adjacency,
            config.dropout,
            vb.pp("user"),
        )?;
        let reviews = Self::entity_encoder(
            &r2e,
            &u2e,
            &rating2e,
            review_history,
            review_adjacency,
            config.dropout,
            vb.pp("review"),
        )?;
        let head = ScoringHead::new(config, vb.pp("head"))?;

        Ok(Self {
            users,
            reviews,
            head,
            sizes,
            config: config.clone(),
            mode: Mode::Train,
        })
    }

    fn entity_encoder(
        own: &EmbeddingTable,
        counterparts: &EmbeddingTable,
        ratings: &EmbeddingTable,
        history: Arc<HistoryLists>,
        adjacency: Arc<Adjacency>,
        dropout: f32,
        vb: VarBuilder,
    ) -> Result<EntityEncoder> {
        let agg_history = HistoryAggregator::new(
            counterparts.clone(),
            ratings.clone(),
            own.clone(),
            dropout,
            vb.pp("agg_history"),
        )?;
        let enc_history =
            HistoryEncoder::new(own.clone(), agg_history, history, vb.pp("enc_history"))?;
        let agg_inter =
            InteractionAggregator::new(enc_history, own.clone(), dropout, vb.pp("agg_inter"))?;
        InteractionEncoder::new(own.clone(), agg_inter, adjacency, vb.pp("enc_inter"))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn sizes(&self) -> TableSizes {
        self.sizes
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn train(&mut self) {
        self.set_mode(Mode::Train);
    }

    pub fn eval(&mut self) {
        self.set_mode(Mode::Eval);
    }

    /// Encoder stack of one entity type, for inspection.
    pub fn encoder(&self, space: IdSpace) -> Option<&EntityEncoder> {
        match space {
            IdSpace::User => Some(&self.users),
            IdSpace::Review => Some(&self.reviews),
            IdSpace::Rating => None,
        }
    }

    fn check_batch(&self, users: &[u32], reviews: &[u32]) -> Result<()> {
        if users.len() != reviews.len() {
            return Err(Error::ShapeMismatch {
                context: "review ids vs user ids",
                expected: users.len(),
                got: reviews.len(),
            });
        }
        let size = users.len();
        if size == 0 || (size == 1 && self.mode.is_train()) {
            return Err(Error::DegenerateBatch {
                size,
                mode: self.mode,
            });
        }
        Ok(())
    }

    /// Raw scores in the current mode, shape `(n,)`.
    pub fn forward(&self, users: &[u32], reviews: &[u32]) -> Result<Tensor> {
        self.check_batch(users, reviews)?;
        let train = self.mode.is_train();
        let z_u = self.users.embed(users, train)?;
        let z_r = self.reviews.embed(reviews, train)?;
        self.head.forward(&z_u, &z_r, train)
    }

    /// Mean squared error against `ratings`, a scalar tensor.
    pub fn loss(&self, users: &[u32], reviews: &[u32], ratings: &[f32]) -> Result<Tensor> {
        if ratings.len() != users.len() {
            return Err(Error::ShapeMismatch {
                context: "ratings vs user ids",
                expected: users.len(),
                got: ratings.len(),
            });
        }
        let scores = self.forward(users, reviews)?;
        let target = Tensor::new(ratings, scores.device())?.to_dtype(scores.dtype())?;
        Ok(candle_nn::loss::mse(&scores, &target)?)
    }

    /// Predicted ratings, shape `(n,)`, detached from the autograd graph.
    ///
    /// Only allowed in [`Mode::Eval`]: in training mode batch norm would
    /// fold the scored pairs into its running statistics. Call
    /// [`eval`](Self::eval) first.
    pub fn predict(&self, users: &[u32], reviews: &[u32]) -> Result<Tensor> {
        if self.mode.is_train() {
            return Err(Error::WrongMode {
                op: "predict",
                required: Mode::Eval,
                mode: self.mode,
            });
        }
        Ok(self.forward(users, reviews)?.detach())
    }

    /// [`predict`](Self::predict) as host `f32`s.
    pub fn predict_vec(&self, users: &[u32], reviews: &[u32]) -> Result<Vec<f32>> {
        Ok(self
            .predict(users, reviews)?
            .to_dtype(candle_core::DType::F32)?
            .to_vec1()?)
    }
}
