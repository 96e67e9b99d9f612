//! Actor and critic networks using tch-rs (PyTorch bindings).
//!
//! Both heads live on a single variable store so one optimizer can drive the
//! combined PPO objective.

use tch::{nn, nn::Module, Device, Kind, Tensor};

/// MLP actor/critic pair sharing one variable store.
///
/// Actor: `obs_dim → 128 → 64 → action_dim` (logits).
/// Critic: `obs_dim → 128 → 64 → 1` (state value).
/// ReLU activations throughout.
pub struct ActorCritic {
    vs: nn::VarStore,
    actor: nn::Sequential,
    critic: nn::Sequential,
    action_dim: usize,
}

fn mlp(p: &nn::Path, in_dim: usize, out_dim: usize) -> nn::Sequential {
    nn::seq()
        .add(nn::linear(p / "l1", in_dim as i64, 128, Default::default()))
        .add_fn(|x| x.relu())
        .add(nn::linear(p / "l2", 128, 64, Default::default()))
        .add_fn(|x| x.relu())
        .add(nn::linear(p / "l3", 64, out_dim as i64, Default::default()))
}

impl ActorCritic {
    /// Creates actor and critic heads for the given dimensions.
    pub fn new(obs_dim: usize, action_dim: usize, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let actor = mlp(&(&root / "actor"), obs_dim, action_dim);
        let critic = mlp(&(&root / "critic"), obs_dim, 1);
        Self {
            vs,
            actor,
            critic,
            action_dim,
        }
    }

    /// Actor forward pass: unnormalized action logits, `[batch, action_dim]`.
    pub fn action_logits(&self, obs: &Tensor) -> Tensor {
        self.actor.forward(&obs.to_kind(Kind::Float))
    }

    /// Critic forward pass: state-value estimates, `[batch]`.
    pub fn value(&self, obs: &Tensor) -> Tensor {
        self.critic.forward(&obs.to_kind(Kind::Float)).squeeze_dim(-1)
    }

    /// Number of discrete actions the actor head emits logits for.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Variable store holding both heads' parameters.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }
}
