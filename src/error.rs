use thiserror::Error;

// Basic error handling with thiserror
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to subscribe to command source: {0}")]
    Subscribe(String),

    #[error("Inbound command stream failed: {0}")]
    Stream(String),

    #[error("State publish failed: {0}")]
    Publish(String),

    #[error("Command channel explicitly closed")]
    Closed,

    #[error("Task panicked or cancelled")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl RemoteError {
    /// Helper to check if an error ends the current subscription.
    /// Re-subscription only happens on a future settings/lifecycle trigger.
    pub fn ends_subscription(&self) -> bool {
        matches!(
            self,
            RemoteError::Io(_) | RemoteError::Stream(_) | RemoteError::Closed
        )
    }
}
