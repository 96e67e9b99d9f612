//! Generalized Advantage Estimation (GAE-λ).
//!
//! Computes per-timestep advantages from a rolled-out trajectory. The sweep
//! is a reverse-time linear recurrence: it cannot be vectorized across the
//! time axis, but every step operates on all N environments at once.

use tch::Tensor;

/// Computes GAE-λ advantages over a `(H, N)` trajectory.
///
/// # Arguments
///
/// * `rewards` - Per-step rewards, shape `[H, N]`
/// * `values` - Critic estimates for each stored step, shape `[H, N]`
/// * `dones` - 0/1 flags marking steps whose *next* transition starts a new
///   episode, shape `[H, N]`
/// * `next_value` - Critic estimate for the state after the last step, `[N]`
/// * `next_done` - Done flag for that state, `[N]`
/// * `gamma` - Discount factor
/// * `gae_lambda` - GAE λ parameter (0 = TD(0), 1 = Monte Carlo)
///
/// The `(1 - done)` factor zeroes both the TD bootstrap and the λ-recursion
/// across episode boundaries, so a terminated episode's advantage never
/// leaks into the following trajectory.
pub fn compute_advantages(
    rewards: &Tensor,
    values: &Tensor,
    dones: &Tensor,
    next_value: &Tensor,
    next_done: &Tensor,
    gamma: f64,
    gae_lambda: f64,
) -> Tensor {
    let horizon = rewards.size()[0];
    assert_eq!(values.size(), rewards.size());
    assert_eq!(dones.size(), rewards.size());

    tch::no_grad(|| {
        let advantages = rewards.zeros_like();
        let mut gae = next_value.zeros_like();

        for t in (0..horizon).rev() {
            let (next_values, next_nonterminal) = if t + 1 < horizon {
                let d = dones.get(t + 1);
                (values.get(t + 1), d.ones_like() - d)
            } else {
                (
                    next_value.shallow_clone(),
                    next_done.ones_like() - next_done,
                )
            };

            let delta =
                rewards.get(t) + next_values * &next_nonterminal * gamma - values.get(t);
            gae = delta + gae * next_nonterminal * (gamma * gae_lambda);
            let mut row = advantages.get(t);
            row.copy_(&gae);
        }

        advantages
    })
}
