//! The three PPO loss terms, as pure functions over minibatch tensors.
//!
//! All three are written for gradient *ascent*: the trainer maximizes
//! `surrogate − value_loss + entropy_bonus` (and hands the optimizer its
//! negation, since the optimizer minimizes).

use tch::{Kind, Tensor};

/// Additive epsilon guarding the advantage-normalization denominator.
pub const ADV_NORM_EPS: f64 = 1e-8;

/// Clipped surrogate policy objective (maximize).
///
/// Computes the probability ratio `r = exp(logp_new − logp_old)`, normalizes
/// the advantages to zero mean and unit variance within the minibatch, and
/// returns `mean(min(r·Â, clip(r, 1−ε, 1+ε)·Â))`. Clipping the ratio bounds
/// how far the new policy may move from the collecting policy per update.
pub fn clipped_surrogate_objective(
    new_logprobs: &Tensor,
    old_logprobs: &Tensor,
    advantages: &Tensor,
    clip_coef: f64,
) -> Tensor {
    let ratio = (new_logprobs - old_logprobs).exp();
    let mean = advantages.mean(Kind::Float);
    let std = advantages.std(true);
    let normalized = (advantages - mean) / (std + ADV_NORM_EPS);

    let clipped = ratio.clamp(1.0 - clip_coef, 1.0 + clip_coef) * &normalized;
    (ratio * normalized).min_other(&clipped).mean(Kind::Float)
}

/// Value-function regression loss (minimize).
///
/// `0.5 · vf_coef · mean((value − return)²)`, a squared-error regression
/// toward the returns precomputed at drain time.
pub fn value_function_loss(values: &Tensor, returns: &Tensor, vf_coef: f64) -> Tensor {
    (values - returns).square().mean(Kind::Float) * (0.5 * vf_coef)
}

/// Entropy bonus (maximize, encourages exploration).
///
/// `ent_coef · mean(entropy)` over the minibatch's per-row entropies.
pub fn entropy_bonus(entropy: &Tensor, ent_coef: f64) -> Tensor {
    entropy.mean(Kind::Float) * ent_coef
}
