//! Differentiable special functions on tensors
//!
//! Burn has no `lgamma`/`digamma` kernels, so both are composed from
//! elementwise primitives (log, reciprocal, arithmetic) and therefore carry
//! gradients through the autodiff backend.
//!
//! Both functions use the recurrence `f(x) = f(x + n) - correction(x)` to
//! move the argument into the range where the asymptotic series converges,
//! then evaluate the series at `x + n`. Inputs must be strictly positive.

use std::f64::consts::PI;

use burn::tensor::{backend::Backend, Tensor};

/// Number of recurrence steps before the asymptotic series is applied
const RECURRENCE_SHIFT: usize = 6;

/// Elementwise natural log of the gamma function
pub fn ln_gamma<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    // ln Γ(x) = ln Γ(x + n) - Σ_{i<n} ln(x + i)
    let mut correction = x.clone().log();
    for i in 1..RECURRENCE_SHIFT {
        correction = correction + x.clone().add_scalar(i as f64).log();
    }

    let z = x.add_scalar(RECURRENCE_SHIFT as f64);
    let inv = z.clone().recip();
    let inv2 = inv.clone() * inv.clone();

    // 1/(12z) - 1/(360z^3) + 1/(1260z^5)
    let inner = inv2.clone().div_scalar(1260.0).neg().add_scalar(1.0 / 360.0);
    let series = inv * (inv2 * inner).neg().add_scalar(1.0 / 12.0);

    let stirling = z.clone().sub_scalar(0.5) * z.clone().log() - z + series;

    stirling.add_scalar(0.5 * (2.0 * PI).ln()) - correction
}

/// Elementwise digamma (derivative of `ln_gamma`)
pub fn digamma<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    // ψ(x) = ψ(x + n) - Σ_{i<n} 1/(x + i)
    let mut correction = x.clone().recip();
    for i in 1..RECURRENCE_SHIFT {
        correction = correction + x.clone().add_scalar(i as f64).recip();
    }

    let z = x.add_scalar(RECURRENCE_SHIFT as f64);
    let inv = z.clone().recip();
    let inv2 = inv.clone() * inv.clone();

    // ln z - 1/(2z) - 1/(12z^2) + 1/(120z^4) - 1/(252z^6)
    let inner = inv2.clone().div_scalar(252.0).neg().add_scalar(1.0 / 120.0);
    let series = inv2.clone() * (inv2 * inner).neg().add_scalar(1.0 / 12.0);

    z.log() - inv.mul_scalar(0.5) - series - correction
}
