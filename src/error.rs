use thiserror::Error;

/// Errors produced by the PPO training core.
///
/// Configuration and buffer-misuse variants are caller bugs and should be
/// treated as fatal; `Environment` wraps whatever the external environment
/// reported, propagated verbatim.
#[derive(Debug, Error)]
pub enum PpoError {
    #[error("batch size {batch_size} is not divisible by minibatch size {minibatch_size}")]
    MinibatchDivisibility {
        batch_size: usize,
        minibatch_size: usize,
    },

    #[error("total timestep budget {total_timesteps} is smaller than one batch of {batch_size}")]
    TimestepBudgetTooSmall {
        total_timesteps: usize,
        batch_size: usize,
    },

    #[error("buffer drained after {got} of {expected} rollout steps")]
    DrainBeforeFull { got: usize, expected: usize },

    #[error("buffer already holds a full horizon of {horizon} steps; drain before adding more")]
    HorizonExceeded { horizon: usize },

    #[error("field `{field}` has leading dimension {got}, expected {expected} environments")]
    EnvCountMismatch {
        field: &'static str,
        got: i64,
        expected: i64,
    },

    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("environment failure: {0}")]
    Environment(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisibility_display() {
        let e = PpoError::MinibatchDivisibility {
            batch_size: 500,
            minibatch_size: 128,
        };
        assert_eq!(
            e.to_string(),
            "batch size 500 is not divisible by minibatch size 128"
        );
    }

    #[test]
    fn drain_before_full_display() {
        let e = PpoError::DrainBeforeFull {
            got: 3,
            expected: 128,
        };
        assert!(e.to_string().contains("3 of 128"));
    }

    #[test]
    fn env_count_mismatch_display() {
        let e = PpoError::EnvCountMismatch {
            field: "rewards",
            got: 2,
            expected: 4,
        };
        let s = e.to_string();
        assert!(s.contains("rewards"));
        assert!(s.contains("expected 4"));
    }
}
