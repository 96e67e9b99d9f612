//! Vectorized environment interface and probe environments.
//!
//! All environments step N instances in lock-step: one [`VecEnv::step`] call
//! advances every instance and blocks until all have returned. Instances that
//! finish an episode are reset automatically by the environment and report a
//! summary through [`VecStepResult::episodes`].

use tch::{Device, Kind, Tensor};

/// Summary of one completed episode, reported by the environment on the step
/// that terminated it. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    /// Total reward accumulated over the episode.
    pub reward: f64,
    /// Episode length in steps.
    pub length: u32,
}

/// Result of stepping all environment instances once.
#[derive(Debug)]
pub struct VecStepResult {
    /// Observations after the step, shape `[N, obs_dim]`.
    pub observations: Tensor,
    /// Per-instance rewards, shape `[N]`.
    pub rewards: Tensor,
    /// Per-instance done flags as 0/1 floats, shape `[N]`.
    pub dones: Tensor,
    /// Episode summary for each instance that finished this step.
    pub episodes: Vec<Option<EpisodeStats>>,
}

/// A set of N environment instances advanced in lock-step.
pub trait VecEnv {
    /// Number of parallel instances N.
    fn num_envs(&self) -> usize;

    /// Observation dimension per instance.
    fn observation_dim(&self) -> usize;

    /// Number of discrete actions per instance.
    fn action_dim(&self) -> usize;

    /// Resets all instances and returns initial observations `[N, obs_dim]`.
    fn reset(&mut self) -> Result<Tensor, Box<dyn std::error::Error + Send + Sync>>;

    /// Steps all instances with `actions` of shape `[N]` (Int64).
    fn step(&mut self, actions: &Tensor)
        -> Result<VecStepResult, Box<dyn std::error::Error + Send + Sync>>;
}

/// Deterministic probe environment for tests and demos.
///
/// Every instance observes a constant zero vector, ignores its action, and
/// receives a fixed reward each step. With `episode_len = Some(k)` episodes
/// terminate (and auto-reset) every k steps; with `None` they never do.
#[derive(Debug)]
pub struct ProbeEnv {
    num_envs: usize,
    reward: f64,
    episode_len: Option<u32>,
    step_counts: Vec<u32>,
    episode_rewards: Vec<f64>,
    device: Device,
}

impl ProbeEnv {
    pub fn new(num_envs: usize, reward: f64, episode_len: Option<u32>) -> Self {
        Self {
            num_envs,
            reward,
            episode_len,
            step_counts: vec![0; num_envs],
            episode_rewards: vec![0.0; num_envs],
            device: Device::Cpu,
        }
    }

    fn observations(&self) -> Tensor {
        Tensor::zeros(
            [self.num_envs as i64, self.observation_dim() as i64],
            (Kind::Float, self.device),
        )
    }
}

impl VecEnv for ProbeEnv {
    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn observation_dim(&self) -> usize {
        1
    }

    fn action_dim(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Tensor, Box<dyn std::error::Error + Send + Sync>> {
        self.step_counts = vec![0; self.num_envs];
        self.episode_rewards = vec![0.0; self.num_envs];
        Ok(self.observations())
    }

    fn step(
        &mut self,
        actions: &Tensor,
    ) -> Result<VecStepResult, Box<dyn std::error::Error + Send + Sync>> {
        assert_eq!(actions.size(), &[self.num_envs as i64]);

        let mut dones = vec![0.0f32; self.num_envs];
        let mut episodes = vec![None; self.num_envs];

        for i in 0..self.num_envs {
            self.step_counts[i] += 1;
            self.episode_rewards[i] += self.reward;
            if let Some(len) = self.episode_len {
                if self.step_counts[i] >= len {
                    dones[i] = 1.0;
                    episodes[i] = Some(EpisodeStats {
                        reward: self.episode_rewards[i],
                        length: self.step_counts[i],
                    });
                    self.step_counts[i] = 0;
                    self.episode_rewards[i] = 0.0;
                }
            }
        }

        Ok(VecStepResult {
            observations: self.observations(),
            rewards: Tensor::from_slice(&vec![self.reward as f32; self.num_envs])
                .to_device(self.device),
            dones: Tensor::from_slice(&dones).to_device(self.device),
            episodes,
        })
    }
}
