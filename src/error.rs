use thiserror::Error;

/// Text shown when a failing store gives no message of its own
pub const GENERIC_FAILURE: &str = "Request failed";

/// Failure reported by an external collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered but rejected the request
    #[error("{}", message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Remote { message: Option<String> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn remote(message: impl Into<String>) -> Self {
        StoreError::Remote {
            message: Some(message.into()),
        }
    }
}

/// Failure of a grid operation
#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    Remote(#[from] StoreError),

    /// Nothing to act on; no remote call was made
    #[error("{0}")]
    Precondition(String),

    /// The user declined the confirmation
    #[error("Cancelled")]
    Cancelled,

    /// Optimistic color marks were rolled back after a failed write
    #[error("Color update failed: {source}")]
    OptimisticWrite {
        rolled_back: usize,
        #[source]
        source: StoreError,
    },

    #[error("Field is read-only: {0}")]
    ReadOnlyField(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Row {0} is not on the current page")]
    RowOutOfRange(usize),

    #[error("Preference error: {0}")]
    Preference(String),
}

impl GridError {
    /// Notification text for this failure
    pub fn user_message(&self) -> String {
        match self {
            GridError::Remote(StoreError::Remote { message }) => message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            GridError::Remote(_) => GENERIC_FAILURE.to_string(),
            GridError::OptimisticWrite { source, .. } => match source {
                StoreError::Remote { message: Some(m) } if !m.trim().is_empty() => {
                    format!("Color update failed: {m}")
                }
                _ => "Color update failed".to_string(),
            },
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = GridError::from(StoreError::remote("Order is locked"));
        assert_eq!(err.user_message(), "Order is locked");
    }

    #[test]
    fn test_user_message_fallback() {
        let err = GridError::from(StoreError::Remote { message: None });
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        let err = GridError::from(StoreError::Transport("connection reset".into()));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        let err = GridError::from(StoreError::remote("  "));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_precondition_message() {
        let err = GridError::Precondition("Nothing to save".into());
        assert_eq!(err.user_message(), "Nothing to save");
        assert_eq!(GridError::Cancelled.to_string(), "Cancelled");
    }
}
