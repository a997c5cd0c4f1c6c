use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoveMatchError {
    #[error("Username already exists: {0}")]
    DuplicateName(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid admin credentials")]
    InvalidAdminCredentials,

    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("Malformed stored data under '{key}': {reason}")]
    MalformedStoredData { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Compatibility not yet available for relationship {0}")]
    CompatibilityPending(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another request is already in progress")]
    Busy,

    #[error("Not logged in")]
    NotAuthenticated,
}

impl LoveMatchError {
    /// Short message suitable for inline display next to the form that failed.
    pub fn user_message(&self) -> String {
        match self {
            LoveMatchError::DuplicateName(_) => "Username already exists".to_string(),
            LoveMatchError::InvalidCredentials => "Invalid credentials".to_string(),
            LoveMatchError::InvalidAdminCredentials => "Invalid admin credentials".to_string(),
            LoveMatchError::AgentUnavailable(_) | LoveMatchError::Http(_) => {
                "Could not get result. Please try again.".to_string()
            }
            LoveMatchError::InvalidInput(msg) => msg.clone(),
            LoveMatchError::CompatibilityPending(_) => {
                "Compatibility results are still pending".to_string()
            }
            LoveMatchError::Busy => "Please wait for the current request to finish".to_string(),
            LoveMatchError::NotAuthenticated => "Please log in first".to_string(),
            LoveMatchError::MalformedStoredData { .. } => {
                "Saved data could not be read, nothing was changed".to_string()
            }
            _ => "An error occurred. Please try again.".to_string(),
        }
    }

    /// True for failures of the external agent call, which leave entities pending.
    pub fn is_agent_failure(&self) -> bool {
        matches!(
            self,
            LoveMatchError::AgentUnavailable(_) | LoveMatchError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LoveMatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            LoveMatchError::DuplicateName("ana".into()).user_message(),
            "Username already exists"
        );
        assert_eq!(
            LoveMatchError::InvalidCredentials.user_message(),
            "Invalid credentials"
        );
        assert_eq!(
            LoveMatchError::AgentUnavailable("timeout".into()).user_message(),
            "Could not get result. Please try again."
        );
        assert_eq!(
            LoveMatchError::InvalidInput("Please enter both names".into()).user_message(),
            "Please enter both names"
        );
        assert_eq!(
            LoveMatchError::MalformedStoredData {
                key: "relationships".into(),
                reason: "invalid value".into()
            }
            .user_message(),
            "Saved data could not be read, nothing was changed"
        );
    }

    #[test]
    fn test_agent_failure_classification() {
        assert!(LoveMatchError::AgentUnavailable("x".into()).is_agent_failure());
        assert!(!LoveMatchError::InvalidCredentials.is_agent_failure());
    }
}
