//! PPO trainer: alternating rollout and learning phases.

use tch::{nn, nn::OptimizerConfig, Device, Kind, Tensor};

use super::buffer::MinibatchSample;
use super::objective::{clipped_surrogate_objective, entropy_bonus, value_function_loss};
use super::scheduler::LinearLrScheduler;
use crate::agent::Agent;
use crate::config::Config;
use crate::distribution::{ActionDistribution, Categorical};
use crate::env::{EpisodeStats, VecEnv};
use crate::error::PpoError;
use crate::metrics::{MetricsSink, NullSink};

/// Drives PPO training: for each epoch, a rollout phase collecting H steps
/// from N environments, then a learning phase consuming the drained
/// minibatches with one optimizer step each.
///
/// Any failure from the environment or the optimizer is fatal and
/// propagates; there is no partial-failure recovery.
pub struct Trainer {
    config: Config,
    agent: Agent,
    opt: nn::Optimizer,
    scheduler: LinearLrScheduler,
    sink: Box<dyn MetricsSink>,
    total_epochs: usize,
}

impl Trainer {
    /// Creates a trainer for `env`, validating the configuration eagerly.
    pub fn new(config: Config, env: Box<dyn VecEnv>, device: Device) -> Result<Self, PpoError> {
        let num_envs = env.num_envs();
        config.validate(num_envs)?;

        let agent = Agent::new(&config, env, device)?;
        let opt = nn::Adam::default().build(agent.network().var_store(), config.learning_rate)?;
        let scheduler = LinearLrScheduler::new(
            config.learning_rate,
            config.end_learning_rate,
            config.total_training_steps(num_envs),
        );
        let total_epochs = config.total_epochs(num_envs);

        Ok(Self {
            config,
            agent,
            opt,
            scheduler,
            sink: Box::new(NullSink),
            total_epochs,
        })
    }

    /// Replaces the metrics sink (a no-op sink is installed by default).
    pub fn with_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs the full training loop.
    ///
    /// Returns the learning curve as `(epoch, mean episode reward)` pairs;
    /// epochs during which no episode finished are omitted.
    pub fn train(&mut self) -> Result<Vec<(usize, f64)>, PpoError> {
        let mut learning_curve = Vec::new();

        for epoch in 0..self.total_epochs {
            let episodes = self.rollout_phase()?;
            self.learning_phase()?;

            if !episodes.is_empty() {
                let mean_reward =
                    episodes.iter().map(|e| e.reward).sum::<f64>() / episodes.len() as f64;
                learning_curve.push((epoch, mean_reward));

                if epoch % 10 == 0 {
                    eprintln!(
                        "[Epoch {}/{}] mean_episode_reward={:.3} lr={:.2e}",
                        epoch,
                        self.total_epochs,
                        mean_reward,
                        self.scheduler.lr()
                    );
                }
            }
        }

        Ok(learning_curve)
    }

    /// Collects exactly H environment steps into the replay buffer.
    ///
    /// Returns the episode summaries reported during this rollout.
    pub fn rollout_phase(&mut self) -> Result<Vec<EpisodeStats>, PpoError> {
        let mut episodes = Vec::new();
        for _ in 0..self.config.num_steps {
            episodes.extend(self.agent.play_step()?);
        }
        Ok(episodes)
    }

    /// Drains the buffer and performs one gradient step per minibatch.
    pub fn learning_phase(&mut self) -> Result<(), PpoError> {
        let minibatches = self.agent.collect_minibatches()?;
        for minibatch in minibatches {
            let objective = self.ppo_objective(&minibatch);
            // The optimizer minimizes; the PPO objective is maximized.
            let loss = objective.neg();
            self.opt.zero_grad();
            loss.backward();
            self.opt.clip_grad_norm(self.config.max_grad_norm);
            self.opt.step();
            self.opt.set_lr(self.scheduler.step());
        }
        Ok(())
    }

    /// Combined per-minibatch PPO objective (to maximize), plus diagnostics
    /// forwarded to the metrics sink.
    fn ppo_objective(&mut self, minibatch: &MinibatchSample) -> Tensor {
        let logits = self.agent.network().action_logits(&minibatch.observations);
        let dist = Categorical::from_logits(&logits);
        let new_logprobs = dist.log_prob(&minibatch.actions);
        let values = self.agent.network().value(&minibatch.observations);

        let surrogate = clipped_surrogate_objective(
            &new_logprobs,
            &minibatch.logprobs,
            &minibatch.advantages,
            self.config.clip_coef,
        );
        let value_loss = value_function_loss(&values, &minibatch.returns, self.config.vf_coef);
        let entropy = entropy_bonus(&dist.entropy(), self.config.ent_coef);

        let objective = &surrogate - &value_loss + &entropy;

        let (approx_kl, clip_frac) = tch::no_grad(|| {
            let logratio = &new_logprobs - &minibatch.logprobs;
            let ratio = logratio.exp();
            let approx_kl = (&ratio - 1.0 - &logratio).mean(Kind::Float).double_value(&[]);
            let clip_frac = (ratio - 1.0)
                .abs()
                .gt(self.config.clip_coef)
                .to_kind(Kind::Float)
                .mean(Kind::Float)
                .double_value(&[]);
            (approx_kl, clip_frac)
        });

        self.sink.log(
            self.agent.steps(),
            &[
                ("clipped_surrogate_objective", surrogate.double_value(&[])),
                ("value_loss", value_loss.double_value(&[])),
                ("entropy_bonus", entropy.double_value(&[])),
                ("mean_value", values.mean(Kind::Float).double_value(&[])),
                ("approx_kl", approx_kl),
                ("clip_frac", clip_frac),
                ("learning_rate", self.scheduler.lr()),
            ],
        );

        objective
    }

    /// The agent being trained.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ProbeEnv;
    use crate::metrics::RecordingSink;

    fn small_config() -> Config {
        Config {
            total_timesteps: 32,
            num_steps: 8,
            minibatch_size: 8,
            passes_per_drain: 2,
            ..Config::default()
        }
    }

    #[test]
    fn trainer_creation() {
        let env = ProbeEnv::new(2, 1.0, Some(4));
        let _trainer = Trainer::new(small_config(), Box::new(env), Device::Cpu).unwrap();
    }

    #[test]
    fn train_smoke_test() {
        // 32 timesteps / (8 steps × 2 envs) = 2 epochs; episodes of length 4
        // finish twice per rollout, so both epochs appear on the curve.
        let env = ProbeEnv::new(2, 1.0, Some(4));
        let mut trainer = Trainer::new(small_config(), Box::new(env), Device::Cpu).unwrap();
        let curve = trainer.train().unwrap();
        assert_eq!(curve.len(), 2);
        assert!((curve[0].1 - 4.0).abs() < 1e-10);
        assert_eq!(trainer.agent().steps(), 32);
    }

    #[test]
    fn learning_phase_steps_scheduler_per_minibatch() {
        let env = ProbeEnv::new(2, 1.0, None);
        let mut trainer = Trainer::new(small_config(), Box::new(env), Device::Cpu).unwrap();
        trainer.rollout_phase().unwrap();
        trainer.learning_phase().unwrap();
        // 2 passes × (16 / 8) minibatches = 4 optimizer steps
        assert_eq!(trainer.scheduler.step_count(), 4);
    }

    #[test]
    fn metrics_are_logged_per_minibatch() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedSink(Rc<RefCell<RecordingSink>>);
        impl MetricsSink for SharedSink {
            fn log(&mut self, step: u64, metrics: &[(&str, f64)]) {
                self.0.borrow_mut().log(step, metrics);
            }
        }

        let records = Rc::new(RefCell::new(RecordingSink::default()));
        let env = ProbeEnv::new(2, 1.0, None);
        let mut trainer = Trainer::new(small_config(), Box::new(env), Device::Cpu)
            .unwrap()
            .with_sink(Box::new(SharedSink(records.clone())));
        trainer.rollout_phase().unwrap();
        trainer.learning_phase().unwrap();

        let records = records.borrow();
        assert_eq!(records.records.len(), 4);
        let names: Vec<&str> = records.records[0]
            .1
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert!(names.contains(&"value_loss"));
        assert!(names.contains(&"approx_kl"));
        assert!(names.contains(&"learning_rate"));
    }

    #[test]
    fn learning_phase_without_rollout_is_rejected() {
        let env = ProbeEnv::new(2, 1.0, None);
        let mut trainer = Trainer::new(small_config(), Box::new(env), Device::Cpu).unwrap();
        assert!(matches!(
            trainer.learning_phase(),
            Err(PpoError::DrainBeforeFull { .. })
        ));
    }
}
