//! Sim loop error types.

use std::fmt;

#[derive(Debug)]
pub enum SimError {
    /// Job queue is full, cannot submit.
    QueueFull,
    /// Worker thread failed to spawn.
    SpawnFailed,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "job queue full"),
            Self::SpawnFailed => write!(f, "worker thread spawn failed"),
        }
    }
}

impl std::error::Error for SimError {}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", SimError::QueueFull), "job queue full");
        assert_eq!(
            format!("{}", SimError::SpawnFailed),
            "worker thread spawn failed"
        );
    }
}
