//! Training objectives for the uncertainty heads
//!
//! - [`EvidentialLoss`]: squared error between the one-hot target and the
//!   Dirichlet mean belief, plus an optional KL regulariser towards the
//!   uniform Dirichlet.
//! - [`ConfidNetLoss`]: cross-entropy on the class logits plus squared error
//!   between the confidence head and the correctness of the prediction.

use burn::{
    config::Config,
    nn::loss::CrossEntropyLossConfig,
    tensor::{backend::Backend, Int, Tensor},
};
use serde::{Deserialize, Serialize};

use super::dirichlet::DirichletParams;
use super::special::{digamma, ln_gamma};

/// Which total enters the normaliser and digamma terms of the KL regulariser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KlNormalizer {
    /// `Σ(α − 1)`, the total evidence
    TotalEvidence,
    /// `Σα`, the Dirichlet concentration (textbook closed form)
    Concentration,
}

impl Default for KlNormalizer {
    fn default() -> Self {
        Self::TotalEvidence
    }
}

/// Configuration for [`EvidentialLoss`]
#[derive(Config, Debug)]
pub struct EvidentialLossConfig {
    /// Weight `λ` of the KL regulariser (0 disables it)
    #[config(default = "0.0")]
    pub kl_weight: f64,

    /// Shift added to every lgamma/digamma argument
    #[config(default = "1e-5")]
    pub epsilon: f64,

    /// Normaliser used by the KL term
    #[config(default = "KlNormalizer::TotalEvidence")]
    pub kl_normalizer: KlNormalizer,
}

impl EvidentialLossConfig {
    pub fn init(&self) -> EvidentialLoss {
        EvidentialLoss {
            kl_weight: self.kl_weight,
            epsilon: self.epsilon,
            kl_normalizer: self.kl_normalizer,
        }
    }
}

/// Evidential MSE loss with Dirichlet KL regularisation
#[derive(Debug, Clone)]
pub struct EvidentialLoss {
    kl_weight: f64,
    epsilon: f64,
    kl_normalizer: KlNormalizer,
}

impl EvidentialLoss {
    /// Total loss `MSE + λ·KL`, averaged over the batch
    ///
    /// `targets` is the one-hot encoding of the labels, shape `[batch, K]`.
    pub fn forward<B: Backend>(
        &self,
        params: &DirichletParams<B>,
        targets: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        self.forward_with_weight(params, targets, self.kl_weight)
    }

    /// Same as [`forward`](Self::forward) with an explicit regulariser weight
    /// (used for annealing schedules)
    pub fn forward_with_weight<B: Backend>(
        &self,
        params: &DirichletParams<B>,
        targets: Tensor<B, 2>,
        kl_weight: f64,
    ) -> Tensor<B, 1> {
        let mse = self.mse(params, targets);
        if kl_weight == 0.0 {
            return mse;
        }
        mse + self.kl_divergence(params).mean().mul_scalar(kl_weight)
    }

    /// Squared error between targets and mean belief, summed over classes,
    /// averaged over the batch
    pub fn mse<B: Backend>(&self, params: &DirichletParams<B>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let belief = params.mean_belief();
        (targets - belief).powf_scalar(2.0).sum_dim(1).mean()
    }

    /// Per-sample Dirichlet regulariser against Dir(1, …, 1), shape `[batch]`
    ///
    /// With [`KlNormalizer::Concentration`] this is the exact
    /// KL(Dir(α) ‖ Dir(1, …, 1)) and is non-negative. The default
    /// [`KlNormalizer::TotalEvidence`] evaluates the same closed form with
    /// `Σ(α − 1)` in place of `Σα`; it is zero at α = 1 but is not a true
    /// divergence and can be negative.
    pub fn kl_divergence<B: Backend>(&self, params: &DirichletParams<B>) -> Tensor<B, 1> {
        let [batch_size, _] = params.alpha.dims();
        let eps = self.epsilon;

        let alpha = params.alpha.clone();
        let beta = alpha.ones_like();

        let (alpha_total, beta_total) = match self.kl_normalizer {
            KlNormalizer::TotalEvidence => (
                alpha.clone().sub_scalar(1.0).sum_dim(1),
                beta.clone().sub_scalar(1.0).sum_dim(1),
            ),
            KlNormalizer::Concentration => (alpha.clone().sum_dim(1), beta.clone().sum_dim(1)),
        };

        let ln_norm_alpha = ln_gamma(alpha_total.clone().add_scalar(eps))
            - ln_gamma(alpha.clone().add_scalar(eps)).sum_dim(1);
        let ln_norm_beta = ln_gamma(beta_total.add_scalar(eps))
            - ln_gamma(beta.clone().add_scalar(eps)).sum_dim(1);

        let digamma_diff =
            digamma(alpha.clone().add_scalar(eps)) - digamma(alpha_total.add_scalar(eps));
        let cross = ((alpha - beta) * digamma_diff).sum_dim(1);

        (ln_norm_alpha - ln_norm_beta + cross).reshape([batch_size])
    }
}

/// Configuration for [`ConfidNetLoss`]
#[derive(Config, Debug)]
pub struct ConfidNetLossConfig {
    /// Weight of the confidence regression term relative to cross-entropy
    #[config(default = "1.0")]
    pub confidence_weight: f64,
}

impl ConfidNetLossConfig {
    pub fn init(&self) -> ConfidNetLoss {
        ConfidNetLoss {
            confidence_weight: self.confidence_weight,
        }
    }
}

/// Loss terms produced by [`ConfidNetLoss::forward`]
#[derive(Debug, Clone)]
pub struct ConfidNetLossOutput<B: Backend> {
    pub total: Tensor<B, 1>,
    pub classification: Tensor<B, 1>,
    pub confidence: Tensor<B, 1>,
}

/// Cross-entropy plus confidence regression onto prediction correctness
#[derive(Debug, Clone)]
pub struct ConfidNetLoss {
    confidence_weight: f64,
}

impl ConfidNetLoss {
    /// `logits`: `[batch, K]`, `confidence`: `[batch]` in (0, 1),
    /// `targets`: `[batch]` class indices
    pub fn forward<B: Backend>(
        &self,
        logits: Tensor<B, 2>,
        confidence: Tensor<B, 1>,
        targets: Tensor<B, 1, Int>,
    ) -> ConfidNetLossOutput<B> {
        let correctness = correctness_targets(logits.clone(), targets.clone());

        let classification = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets);
        let confidence = (confidence - correctness).powf_scalar(2.0).mean();

        let total = classification.clone() + confidence.clone().mul_scalar(self.confidence_weight);

        ConfidNetLossOutput {
            total,
            classification,
            confidence,
        }
    }
}

/// 1.0 where the arg-max of the (detached) logits matches the label, else 0.0
pub fn correctness_targets<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [batch_size, _] = logits.dims();
    let predicted = logits.detach().argmax(1).reshape([batch_size]);
    predicted.equal(targets).float()
}
