//! Action distributions produced by the actor head.
//!
//! The actor's output is wrapped in an [`ActionDistribution`] rather than
//! branched on by type, so discrete and continuous policies share the same
//! sampling/log-prob/entropy seam.

use tch::{Kind, Tensor};

use std::f64::consts::PI;

/// A batch of per-instance action distributions.
pub trait ActionDistribution {
    /// Draws one action per batch row.
    fn sample(&self) -> Tensor;

    /// Log-probability of `actions` under the distribution, shape `[batch]`.
    fn log_prob(&self, actions: &Tensor) -> Tensor;

    /// Per-row entropy, shape `[batch]`.
    fn entropy(&self) -> Tensor;
}

/// Categorical distribution over discrete actions, parameterized by logits
/// of shape `[batch, num_actions]`.
#[derive(Debug)]
pub struct Categorical {
    log_probs: Tensor,
}

impl Categorical {
    /// Builds the distribution from unnormalized logits.
    pub fn from_logits(logits: &Tensor) -> Self {
        Self {
            log_probs: logits.log_softmax(-1, Kind::Float),
        }
    }
}

impl ActionDistribution for Categorical {
    fn sample(&self) -> Tensor {
        let probs = self.log_probs.exp();
        probs.multinomial(1, true).squeeze_dim(-1)
    }

    fn log_prob(&self, actions: &Tensor) -> Tensor {
        self.log_probs
            .gather(-1, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1)
    }

    fn entropy(&self) -> Tensor {
        let probs = self.log_probs.exp();
        -(probs * &self.log_probs).sum_dim_intlist([-1].as_slice(), false, Kind::Float)
    }
}

/// Diagonal Gaussian over continuous actions, parameterized by a mean of
/// shape `[batch, action_dim]` and a shared per-dimension log standard
/// deviation.
#[derive(Debug)]
pub struct DiagGaussian {
    mean: Tensor,
    log_std: Tensor,
}

impl DiagGaussian {
    pub fn new(mean: Tensor, log_std: Tensor) -> Self {
        Self { mean, log_std }
    }
}

impl ActionDistribution for DiagGaussian {
    fn sample(&self) -> Tensor {
        &self.mean + self.log_std.exp() * self.mean.randn_like()
    }

    fn log_prob(&self, actions: &Tensor) -> Tensor {
        let z = (actions - &self.mean) / self.log_std.exp();
        let per_dim = z.square() * -0.5 - &self.log_std - 0.5 * (2.0 * PI).ln();
        per_dim.sum_dim_intlist([-1].as_slice(), false, Kind::Float)
    }

    fn entropy(&self) -> Tensor {
        let per_dim = &self.log_std + 0.5 * (1.0 + (2.0 * PI).ln());
        per_dim
            .broadcast_to(self.mean.size().as_slice())
            .sum_dim_intlist([-1].as_slice(), false, Kind::Float)
    }
}
