//! Error types for grid deployments

use std::time::Duration;
use thiserror::Error;

/// Result type for grid operations
pub type Result<T> = std::result::Result<T, GridError>;

/// Grid deployer error types
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Cannot find applicable node for container: {0}")]
    Unschedulable(String),

    #[error("Container {container} did not reach running state within {timeout:?}")]
    HealthTimeout { container: String, timeout: Duration },

    #[error("Image pull failed: {0}")]
    ImagePull(String),

    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GridError {
    /// Whether the error came from a collaborator call rather than from
    /// scheduling or the health-wait.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            GridError::ImagePull(_)
                | GridError::Remote(_)
                | GridError::Container(_)
                | GridError::ContainerNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unschedulable_message() {
        let err = GridError::Unschedulable("redis-3".to_string());
        assert_eq!(
            err.to_string(),
            "Cannot find applicable node for container: redis-3"
        );
        assert!(!err.is_remote());
    }

    #[test]
    fn test_remote_classification() {
        assert!(GridError::ImagePull("denied".to_string()).is_remote());
        assert!(GridError::Remote("connection reset".to_string()).is_remote());
        let timeout = GridError::HealthTimeout {
            container: "redis-1".to_string(),
            timeout: Duration::from_secs(20),
        };
        assert!(!timeout.is_remote());
        assert!(timeout.to_string().contains("redis-1"));
    }
}
