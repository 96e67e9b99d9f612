//! Replay buffer for fixed-horizon rollout transitions.
//!
//! Accumulates exactly H steps of `(N, ...)`-shaped fields, then drains into
//! randomly-permuted, non-overlapping minibatches annotated with GAE
//! advantages and returns. The buffer is emptied once per learning phase and
//! refilled from scratch; only the agent's running observation/done state
//! bridges epochs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Kind, Tensor};

use super::gae::compute_advantages;
use crate::config::Config;
use crate::error::PpoError;

/// One recorded timestep across all N environments.
#[derive(Debug)]
struct StepRecord {
    /// Observations before the action, `[N, obs_dim]`.
    observations: Tensor,
    /// Done flags recorded alongside the observations, `[N]`.
    dones: Tensor,
    /// Actions taken, `[N]` (Int64).
    actions: Tensor,
    /// Log-probabilities of those actions under the collecting policy, `[N]`.
    logprobs: Tensor,
    /// Critic value estimates at collection time, `[N]`.
    values: Tensor,
    /// Rewards received, `[N]`.
    rewards: Tensor,
}

/// A minibatch drawn from one flatten-and-partition pass over the buffer.
///
/// Every flattened index appears in exactly one minibatch of a pass; the
/// same index may recur only across independent passes.
#[derive(Debug)]
pub struct MinibatchSample {
    pub observations: Tensor,
    pub dones: Tensor,
    pub actions: Tensor,
    pub logprobs: Tensor,
    pub values: Tensor,
    pub advantages: Tensor,
    pub returns: Tensor,
}

/// Rollout buffer that stores transitions for PPO updates.
#[derive(Debug)]
pub struct ReplayBuffer {
    steps: Vec<StepRecord>,
    rng: StdRng,
    num_envs: i64,
    horizon: usize,
    minibatch_size: usize,
    passes_per_drain: u32,
    gamma: f64,
    gae_lambda: f64,
}

impl ReplayBuffer {
    /// Creates an empty buffer for `num_envs` parallel environments.
    ///
    /// Fails eagerly if the flattened `num_steps × num_envs` batch does not
    /// partition evenly into minibatches.
    pub fn new(config: &Config, num_envs: usize) -> Result<Self, PpoError> {
        let batch_size = config.batch_size(num_envs);
        if batch_size == 0 || batch_size % config.minibatch_size != 0 {
            return Err(PpoError::MinibatchDivisibility {
                batch_size,
                minibatch_size: config.minibatch_size,
            });
        }
        Ok(Self {
            steps: Vec::with_capacity(config.num_steps),
            rng: StdRng::seed_from_u64(config.seed),
            num_envs: num_envs as i64,
            horizon: config.num_steps,
            minibatch_size: config.minibatch_size,
            passes_per_drain: config.passes_per_drain,
            gamma: config.gamma,
            gae_lambda: config.gae_lambda,
        })
    }

    /// Number of steps currently stored.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps are stored.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Appends one timestep of transitions across all environments.
    ///
    /// Fails if any field's leading dimension is not N, or if a full horizon
    /// is already stored without an intervening [`ReplayBuffer::drain`].
    pub fn add(
        &mut self,
        observations: Tensor,
        actions: Tensor,
        rewards: Tensor,
        dones: Tensor,
        logprobs: Tensor,
        values: Tensor,
    ) -> Result<(), PpoError> {
        if self.steps.len() >= self.horizon {
            return Err(PpoError::HorizonExceeded {
                horizon: self.horizon,
            });
        }
        self.check_leading_dim("observations", &observations)?;
        self.check_leading_dim("actions", &actions)?;
        self.check_leading_dim("rewards", &rewards)?;
        self.check_leading_dim("dones", &dones)?;
        self.check_leading_dim("logprobs", &logprobs)?;
        self.check_leading_dim("values", &values)?;

        self.steps.push(StepRecord {
            observations,
            dones: dones.to_kind(Kind::Float),
            actions,
            logprobs,
            values,
            rewards,
        });
        Ok(())
    }

    fn check_leading_dim(&self, field: &'static str, t: &Tensor) -> Result<(), PpoError> {
        let got = t.size().first().copied().unwrap_or(0);
        if got != self.num_envs {
            return Err(PpoError::EnvCountMismatch {
                field,
                got,
                expected: self.num_envs,
            });
        }
        Ok(())
    }

    /// Computes advantages and returns over the full horizon, then partitions
    /// the flattened buffer into random minibatches.
    ///
    /// `next_value`/`next_done` describe the state immediately following the
    /// last stored step and seed the GAE bootstrap. Performs
    /// `passes_per_drain` independent permutation passes; each pass covers
    /// every flattened index exactly once. Clears the buffer.
    pub fn drain(
        &mut self,
        next_value: &Tensor,
        next_done: &Tensor,
    ) -> Result<Vec<MinibatchSample>, PpoError> {
        if self.steps.len() != self.horizon {
            return Err(PpoError::DrainBeforeFull {
                got: self.steps.len(),
                expected: self.horizon,
            });
        }

        let stack = |f: fn(&StepRecord) -> &Tensor| {
            let rows: Vec<&Tensor> = self.steps.iter().map(f).collect();
            Tensor::stack(&rows, 0)
        };
        let observations = stack(|s| &s.observations);
        let dones = stack(|s| &s.dones);
        let actions = stack(|s| &s.actions);
        let logprobs = stack(|s| &s.logprobs);
        let values = stack(|s| &s.values);
        let rewards = stack(|s| &s.rewards);

        let advantages = compute_advantages(
            &rewards,
            &values,
            &dones,
            next_value,
            next_done,
            self.gamma,
            self.gae_lambda,
        );
        let returns = &advantages + &values;

        // Flatten (H, N) into one axis of size H×N.
        let flat = [
            observations.flatten(0, 1),
            dones.flatten(0, 1),
            actions.flatten(0, 1),
            logprobs.flatten(0, 1),
            values.flatten(0, 1),
            advantages.flatten(0, 1),
            returns.flatten(0, 1),
        ];

        let batch_size = self.horizon * self.num_envs as usize;
        let mut minibatches =
            Vec::with_capacity(self.passes_per_drain as usize * batch_size / self.minibatch_size);

        for _ in 0..self.passes_per_drain {
            let mut indices: Vec<i64> = (0..batch_size as i64).collect();
            indices.shuffle(&mut self.rng);

            for chunk in indices.chunks(self.minibatch_size) {
                let index = Tensor::from_slice(chunk);
                let pick = |t: &Tensor| t.index_select(0, &index);
                minibatches.push(MinibatchSample {
                    observations: pick(&flat[0]),
                    dones: pick(&flat[1]),
                    actions: pick(&flat[2]),
                    logprobs: pick(&flat[3]),
                    values: pick(&flat[4]),
                    advantages: pick(&flat[5]),
                    returns: pick(&flat[6]),
                });
            }
        }

        self.steps.clear();
        Ok(minibatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    const N: usize = 2;
    const H: usize = 4;

    fn config(minibatch_size: usize, passes_per_drain: u32) -> Config {
        Config {
            seed: 0,
            num_steps: H,
            minibatch_size,
            passes_per_drain,
            total_timesteps: H * N,
            ..Config::default()
        }
    }

    fn make_buffer(minibatch_size: usize) -> ReplayBuffer {
        ReplayBuffer::new(&config(minibatch_size, 1), N).unwrap()
    }

    fn fill(buf: &mut ReplayBuffer, steps: usize) {
        for t in 0..steps {
            // Feature 0 carries the flattened index t·N + e for the
            // permutation-coverage test.
            let ids: Vec<f32> = (0..N).map(|e| (t * N + e) as f32).collect();
            buf.add(
                Tensor::from_slice(&ids).reshape([N as i64, 1]),
                Tensor::zeros([N as i64], (Kind::Int64, Device::Cpu)),
                Tensor::ones([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::full([N as i64], 0.5, (Kind::Float, Device::Cpu)),
            )
            .unwrap();
        }
    }

    fn boundary() -> (Tensor, Tensor) {
        (
            Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
            Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
        )
    }

    #[test]
    fn rejects_uneven_minibatch_partition() {
        assert!(matches!(
            ReplayBuffer::new(&config(3, 1), N),
            Err(PpoError::MinibatchDivisibility { .. })
        ));
    }

    #[test]
    fn rejects_wrong_leading_dimension() {
        let mut buf = make_buffer(4);
        let err = buf
            .add(
                Tensor::zeros([N as i64, 3], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Int64, Device::Cpu)),
                Tensor::ones([5], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PpoError::EnvCountMismatch {
                field: "rewards",
                got: 5,
                ..
            }
        ));
    }

    #[test]
    fn rejects_add_past_horizon() {
        let mut buf = make_buffer(4);
        fill(&mut buf, H);
        let err = buf
            .add(
                Tensor::zeros([N as i64, 3], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Int64, Device::Cpu)),
                Tensor::ones([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
                Tensor::zeros([N as i64], (Kind::Float, Device::Cpu)),
            )
            .unwrap_err();
        assert!(matches!(err, PpoError::HorizonExceeded { .. }));
    }

    #[test]
    fn rejects_drain_before_full_horizon() {
        let mut buf = make_buffer(4);
        fill(&mut buf, H - 1);
        let (nv, nd) = boundary();
        assert!(matches!(
            buf.drain(&nv, &nd),
            Err(PpoError::DrainBeforeFull { got: 3, expected: 4 })
        ));
    }

    #[test]
    fn permutation_covers_every_index_exactly_once() {
        let mut buf = ReplayBuffer::new(
            &Config {
                seed: 7,
                ..config(2, 3)
            },
            N,
        )
        .unwrap();
        fill(&mut buf, H);
        let (nv, nd) = boundary();
        let minibatches = buf.drain(&nv, &nd).unwrap();

        let batch = H * N;
        let per_pass = batch / 2;
        assert_eq!(minibatches.len(), 3 * per_pass);

        // Within each pass the flattened indices written into feature 0 at
        // fill time must cover every slot exactly once.
        for pass in minibatches.chunks(per_pass) {
            let mut seen: Vec<i64> = pass
                .iter()
                .flat_map(|mb| {
                    let vals: Vec<f64> = mb.observations.select(1, 0).reshape([-1]).try_into().unwrap();
                    vals.into_iter().map(|v| v as i64)
                })
                .collect();
            seen.sort_unstable();
            let expected: Vec<i64> = (0..batch as i64).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn returns_equal_advantages_plus_values() {
        let mut buf = make_buffer(4);
        fill(&mut buf, H);
        let (nv, nd) = boundary();
        for mb in buf.drain(&nv, &nd).unwrap() {
            let diff = (&mb.returns - &mb.advantages - &mb.values)
                .abs()
                .max()
                .double_value(&[]);
            assert!(diff < 1e-6);
        }
    }

    #[test]
    fn drain_empties_buffer_for_next_epoch() {
        let mut buf = make_buffer(4);
        fill(&mut buf, H);
        let (nv, nd) = boundary();
        buf.drain(&nv, &nd).unwrap();
        assert!(buf.is_empty());
        // A fresh horizon can be collected and drained again.
        fill(&mut buf, H);
        assert_eq!(buf.len(), H);
        buf.drain(&nv, &nd).unwrap();
    }

    #[test]
    fn single_step_drain_matches_td_residual() {
        // H = 1, N = 1: reward 1, value 0.3, zero bootstrap.
        let cfg = Config {
            seed: 0,
            num_steps: 1,
            minibatch_size: 1,
            passes_per_drain: 1,
            total_timesteps: 1,
            gamma: 0.9,
            gae_lambda: 0.95,
            ..Config::default()
        };
        let mut buf = ReplayBuffer::new(&cfg, 1).unwrap();
        buf.add(
            Tensor::zeros([1, 1], (Kind::Float, Device::Cpu)),
            Tensor::zeros([1], (Kind::Int64, Device::Cpu)),
            Tensor::ones([1], (Kind::Float, Device::Cpu)),
            Tensor::zeros([1], (Kind::Float, Device::Cpu)),
            Tensor::zeros([1], (Kind::Float, Device::Cpu)),
            Tensor::full([1], 0.3, (Kind::Float, Device::Cpu)),
        )
        .unwrap();
        let nv = Tensor::zeros([1], (Kind::Float, Device::Cpu));
        let nd = Tensor::zeros([1], (Kind::Float, Device::Cpu));
        let minibatches = buf.drain(&nv, &nd).unwrap();
        assert_eq!(minibatches.len(), 1);
        let adv = minibatches[0].advantages.double_value(&[0]);
        assert!((adv - 0.7).abs() < 1e-6);
        let ret = minibatches[0].returns.double_value(&[0]);
        assert!((ret - 1.0).abs() < 1e-6);
    }
}
