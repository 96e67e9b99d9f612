//! ppo-core - Proximal Policy Optimization training core
//!
//! A PPO implementation on tch-rs (PyTorch bindings): fixed-horizon replay
//! buffer, GAE-λ advantage estimation, clipped surrogate objective, linear
//! learning-rate decay, and the rollout/learning trainer loop. Environments
//! plug in through the vectorized [`VecEnv`](env::VecEnv) trait; metrics
//! flow out through a [`MetricsSink`](metrics::MetricsSink).

pub mod agent;
pub mod config;
pub mod distribution;
pub mod env;
pub mod error;
pub mod metrics;
pub mod network;
pub mod training;

pub use agent::Agent;
pub use config::Config;
pub use distribution::{ActionDistribution, Categorical, DiagGaussian};
pub use env::{EpisodeStats, ProbeEnv, VecEnv, VecStepResult};
pub use error::PpoError;
pub use metrics::{MetricsSink, NullSink, StderrSink};
pub use network::ActorCritic;
pub use training::{compute_advantages, LinearLrScheduler, MinibatchSample, ReplayBuffer, Trainer};
