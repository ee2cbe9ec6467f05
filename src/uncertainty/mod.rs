//! Uncertainty estimation primitives
//!
//! - `dirichlet`: evidence → Dirichlet parameters, mean belief and vacuity
//! - `loss`: evidential loss (MSE + Dirichlet KL) and the ConfidNet objective
//! - `ensemble`: Deep Ensemble averaging and correct/incorrect partitioning
//! - `special`: differentiable `ln_gamma` / `digamma` on tensors

pub mod dirichlet;
pub mod ensemble;
pub mod loss;
pub mod special;

pub use dirichlet::{DirichletParams, ALPHA_FLOOR};
pub use ensemble::{mean_probabilities, predict_with_confidence, ConfidenceBuckets, Ensemble};
pub use loss::{
    ConfidNetLoss, ConfidNetLossConfig, EvidentialLoss, EvidentialLossConfig, KlNormalizer,
};

/// Shift applied to lgamma/digamma arguments in the KL regulariser
pub const DEFAULT_EPSILON: f64 = 1e-5;
