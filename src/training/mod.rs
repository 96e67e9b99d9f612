//! PPO training machinery: buffer, advantage estimation, objectives,
//! scheduler, and the trainer loop.

pub mod buffer;
pub mod gae;
pub mod objective;
pub mod scheduler;
pub mod trainer;

pub use buffer::{MinibatchSample, ReplayBuffer};
pub use gae::compute_advantages;
pub use scheduler::LinearLrScheduler;
pub use trainer::Trainer;
