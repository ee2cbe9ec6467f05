//! Dirichlet parameterisation of evidential outputs
//!
//! An evidential network emits non-negative evidence `e` per class. The
//! evidence defines a Dirichlet distribution over the class simplex with
//! concentration `α = e + 1`; its mean `α / α₀` is the belief used for
//! prediction and `K / α₀` measures how little total evidence was seen.

use burn::tensor::{backend::Backend, Tensor};

/// Lower bound applied to every concentration parameter
pub const ALPHA_FLOOR: f64 = 1e-3;

/// Dirichlet concentration parameters for a batch
#[derive(Debug, Clone)]
pub struct DirichletParams<B: Backend> {
    /// Per-class concentration `α`, shape `[batch, K]`
    pub alpha: Tensor<B, 2>,
    /// Total concentration `α₀ = Σα`, shape `[batch, 1]`
    pub strength: Tensor<B, 2>,
}

impl<B: Backend> DirichletParams<B> {
    /// Build `α = max(e + 1, 1e-3)` and `α₀ = Σα` from evidence `[batch, K]`
    ///
    /// Zero evidence yields `α = 1` for every class, i.e. the uniform prior.
    pub fn from_evidence(evidence: Tensor<B, 2>) -> Self {
        let alpha = evidence.add_scalar(1.0).clamp_min(ALPHA_FLOOR);
        let strength = alpha.clone().sum_dim(1);
        Self { alpha, strength }
    }

    /// Number of classes `K`
    pub fn num_classes(&self) -> usize {
        self.alpha.dims()[1]
    }

    /// Expected class probabilities `α / α₀`, shape `[batch, K]`
    pub fn mean_belief(&self) -> Tensor<B, 2> {
        self.alpha.clone() / self.strength.clone()
    }

    /// Vacuity `K / α₀`, shape `[batch]`
    pub fn vacuity(&self) -> Tensor<B, 1> {
        let [batch_size, num_classes] = self.alpha.dims();
        self.strength
            .clone()
            .recip()
            .mul_scalar(num_classes as f64)
            .reshape([batch_size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn evidence(values: Vec<f32>, shape: [usize; 2]) -> Tensor<TestBackend, 2> {
        let device = Default::default();
        Tensor::from_floats(TensorData::new(values, shape), &device)
    }

    #[test]
    fn test_zero_evidence_gives_uniform_prior() {
        let params = DirichletParams::from_evidence(evidence(vec![0.0; 10], [1, 10]));

        let alpha = params.alpha.clone().into_data().to_vec::<f32>().unwrap();
        assert!(alpha.iter().all(|&a| a == 1.0));

        let strength = params.strength.clone().into_data().to_vec::<f32>().unwrap();
        assert_eq!(strength, vec![10.0]);

        let belief = params.mean_belief().into_data().to_vec::<f32>().unwrap();
        assert!(belief.iter().all(|&p| (p - 0.1).abs() < 1e-6));

        let vacuity = params.vacuity().into_data().to_vec::<f32>().unwrap();
        assert!((vacuity[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_belief_is_on_simplex() {
        let values = vec![
            0.0, 3.5, 12.0, 0.25, //
            100.0, 0.0, 0.0, 1.0, //
            7.0, 7.0, 7.0, 7.0,
        ];
        let params = DirichletParams::from_evidence(evidence(values, [3, 4]));
        let belief = params.mean_belief().into_data().to_vec::<f32>().unwrap();

        for row in belief.chunks(4) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row sums to {sum}");
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_alpha_respects_floor() {
        // Negative evidence never comes out of softplus, but the floor must hold anyway
        let params = DirichletParams::from_evidence(evidence(vec![-5.0, 0.0], [1, 2]));
        let alpha = params.alpha.into_data().to_vec::<f32>().unwrap();
        assert!((alpha[0] - ALPHA_FLOOR as f32).abs() < 1e-9);
        assert_eq!(alpha[1], 1.0);
    }

    #[test]
    fn test_vacuity_decreases_with_evidence() {
        let params = DirichletParams::from_evidence(evidence(vec![0.0, 0.0, 40.0, 0.0], [2, 2]));
        let vacuity = params.vacuity().into_data().to_vec::<f32>().unwrap();
        assert!((vacuity[0] - 1.0).abs() < 1e-6);
        assert!((vacuity[1] - 2.0 / 42.0).abs() < 1e-6);
    }
}
