//! Hyperparameter configuration for PPO training.

use crate::error::PpoError;

/// Hyperparameters for the PPO training loop.
///
/// Covers the rollout geometry (horizon, timestep budget), the GAE
/// estimator, the clipped objective, and the optimizer/scheduler. Quantities
/// that depend on the number of parallel environments (batch size, epoch
/// count, scheduler length) are derived via methods taking `num_envs`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Seed for the minibatch-permutation RNG.
    pub seed: u64,
    /// Total environment-step budget across all parallel instances.
    pub total_timesteps: usize,
    /// Rollout horizon H: environment steps collected per epoch.
    pub num_steps: usize,
    /// Discount factor γ.
    pub gamma: f64,
    /// GAE λ parameter.
    pub gae_lambda: f64,
    /// Minibatch size for gradient steps.
    pub minibatch_size: usize,
    /// Number of full passes over the buffer per learning phase.
    pub passes_per_drain: u32,
    /// PPO clip parameter ε.
    pub clip_coef: f64,
    /// Entropy bonus coefficient.
    pub ent_coef: f64,
    /// Value loss coefficient.
    pub vf_coef: f64,
    /// Maximum gradient norm for clipping.
    pub max_grad_norm: f64,
    /// Initial learning rate.
    pub learning_rate: f64,
    /// Final learning rate after linear decay.
    pub end_learning_rate: f64,
}

impl Config {
    /// Flattened buffer size per epoch: H × N.
    pub fn batch_size(&self, num_envs: usize) -> usize {
        self.num_steps * num_envs
    }

    /// Number of rollout/learning epochs derivable from the timestep budget.
    pub fn total_epochs(&self, num_envs: usize) -> usize {
        self.total_timesteps / self.batch_size(num_envs)
    }

    /// Total optimizer steps: one per minibatch over all epochs and passes.
    pub fn total_training_steps(&self, num_envs: usize) -> usize {
        let minibatches_per_pass = self.batch_size(num_envs) / self.minibatch_size;
        self.total_epochs(num_envs) * self.passes_per_drain as usize * minibatches_per_pass
    }

    /// Eagerly validates the configuration against an environment count.
    ///
    /// Fails if the flattened buffer does not partition evenly into
    /// minibatches, or if the timestep budget cannot fill a single batch.
    pub fn validate(&self, num_envs: usize) -> Result<(), PpoError> {
        let batch_size = self.batch_size(num_envs);
        if batch_size == 0 || batch_size % self.minibatch_size != 0 {
            return Err(PpoError::MinibatchDivisibility {
                batch_size,
                minibatch_size: self.minibatch_size,
            });
        }
        if self.total_timesteps < batch_size {
            return Err(PpoError::TimestepBudgetTooSmall {
                total_timesteps: self.total_timesteps,
                batch_size,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 1,
            total_timesteps: 500_000,
            num_steps: 128,
            gamma: 0.99,
            gae_lambda: 0.95,
            minibatch_size: 128,
            passes_per_drain: 4,
            clip_coef: 0.2,
            ent_coef: 0.01,
            vf_coef: 0.5,
            max_grad_norm: 0.5,
            learning_rate: 2.5e-4,
            end_learning_rate: 0.0,
        }
    }
}
