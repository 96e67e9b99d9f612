//! PPO training demo on a deterministic probe environment.
//!
//! Trains the agent on four parallel constant-reward environments with
//! fixed-length episodes and prints the learning curve.
//!
//! Run (requires libtorch):
//! ```sh
//! cargo run --example train_probe
//! ```

use tch::Device;

use ppo_core::{Config, ProbeEnv, StderrSink, Trainer};

fn main() -> Result<(), ppo_core::PpoError> {
    println!("=== PPO Probe Training Demo ===\n");

    let config = Config {
        total_timesteps: 8_192,
        num_steps: 128,
        minibatch_size: 128,
        passes_per_drain: 4,
        ..Config::default()
    };

    let env = ProbeEnv::new(4, 1.0, Some(16));
    let mut trainer =
        Trainer::new(config, Box::new(env), Device::Cpu)?.with_sink(Box::new(StderrSink));

    let curve = trainer.train()?;

    println!("Epochs with finished episodes: {}", curve.len());
    for (epoch, mean_reward) in &curve {
        println!("  epoch {:>3}: mean episode reward {:.3}", epoch, mean_reward);
    }
    println!("\nTotal environment steps: {}", trainer.agent().steps());

    Ok(())
}
