//! The PPO agent: actor/critic networks, replay buffer, and the running
//! state that bridges rollout epochs.

use tch::{Device, Kind, Tensor};

use crate::config::Config;
use crate::distribution::{ActionDistribution, Categorical};
use crate::env::{EpisodeStats, VecEnv};
use crate::error::PpoError;
use crate::network::ActorCritic;
use crate::training::buffer::{MinibatchSample, ReplayBuffer};

/// Owns the policy networks, the replay buffer, and the environment handle.
///
/// The current observation and done flag persist across epochs: the buffer
/// is cleared after every drain, but trajectories continue from wherever the
/// environments last stood.
pub struct Agent {
    net: ActorCritic,
    env: Box<dyn VecEnv>,
    buffer: ReplayBuffer,
    /// Observation the next `play_step` will act on, `[N, obs_dim]`.
    next_obs: Tensor,
    /// Done flags accompanying `next_obs`, `[N]` (0/1 floats).
    next_done: Tensor,
    /// Cumulative environment steps taken, summed over all N instances.
    steps: u64,
    num_envs: usize,
}

impl Agent {
    /// Builds networks and buffer for `env` and resets it for the first
    /// rollout.
    pub fn new(config: &Config, mut env: Box<dyn VecEnv>, device: Device) -> Result<Self, PpoError> {
        let num_envs = env.num_envs();
        config.validate(num_envs)?;

        let net = ActorCritic::new(env.observation_dim(), env.action_dim(), device);
        let buffer = ReplayBuffer::new(config, num_envs)?;

        let next_obs = env.reset()?.to_device(device);
        let next_done = Tensor::zeros([num_envs as i64], (Kind::Float, device));

        Ok(Self {
            net,
            env,
            buffer,
            next_obs,
            next_done,
            steps: 0,
            num_envs,
        })
    }

    /// One agent/environment interaction step.
    ///
    /// Runs actor and critic in inference mode, samples an action per
    /// instance, steps the environment, and records the transition. Returns
    /// episode summaries for any instances that finished this step.
    pub fn play_step(&mut self) -> Result<Vec<EpisodeStats>, PpoError> {
        let obs = self.next_obs.shallow_clone();
        let done = self.next_done.shallow_clone();

        let (values, actions, logprobs) = tch::no_grad(|| {
            let values = self.net.value(&obs);
            let dist = Categorical::from_logits(&self.net.action_logits(&obs));
            let actions = dist.sample();
            let logprobs = dist.log_prob(&actions);
            (values, actions, logprobs)
        });

        let result = self.env.step(&actions)?;

        self.buffer
            .add(obs, actions, result.rewards, done, logprobs, values)?;

        self.steps += self.num_envs as u64;
        self.next_obs = result.observations;
        self.next_done = result.dones.to_kind(Kind::Float);

        Ok(result.episodes.into_iter().flatten().collect())
    }

    /// Drains the buffer into minibatches.
    ///
    /// The bootstrap `next_value` is the critic's estimate for the current
    /// (not yet stepped) observation, which is exactly the state following
    /// the buffer's last recorded transition.
    pub fn collect_minibatches(&mut self) -> Result<Vec<MinibatchSample>, PpoError> {
        let next_value = tch::no_grad(|| self.net.value(&self.next_obs));
        self.buffer.drain(&next_value, &self.next_done)
    }

    /// Actor/critic networks (gradient-tracked forward passes for the
    /// learning phase go through this).
    pub fn network(&self) -> &ActorCritic {
        &self.net
    }

    /// Cumulative environment steps across all instances.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of parallel environment instances.
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }
}
