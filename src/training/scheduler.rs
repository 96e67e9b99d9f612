//! Linear learning-rate decay.

/// Linearly interpolates the learning rate from `initial_lr` to `end_lr`
/// over `total_steps` calls to [`LinearLrScheduler::step`].
///
/// The rate is computed in closed form and the interpolation position is
/// clamped, so stepping past `total_steps` saturates at `end_lr` instead of
/// indexing out of range.
#[derive(Debug, Clone)]
pub struct LinearLrScheduler {
    initial_lr: f64,
    end_lr: f64,
    total_steps: usize,
    step_count: usize,
}

impl LinearLrScheduler {
    pub fn new(initial_lr: f64, end_lr: f64, total_steps: usize) -> Self {
        Self {
            initial_lr,
            end_lr,
            total_steps,
            step_count: 0,
        }
    }

    /// Learning rate at the current step count: `initial_lr` before the
    /// first `step`, `end_lr` after `total_steps` of them.
    pub fn lr(&self) -> f64 {
        let frac = if self.total_steps == 0 {
            1.0
        } else {
            (self.step_count as f64 / self.total_steps as f64).min(1.0)
        };
        self.initial_lr + (self.end_lr - self.initial_lr) * frac
    }

    /// Advances the step counter and returns the new learning rate, which
    /// the caller applies to its optimizer.
    pub fn step(&mut self) -> f64 {
        self.step_count += 1;
        self.lr()
    }

    /// Number of `step` calls so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }
}
