//! Boundary to the external agent service.
//!
//! Everything the rest of the crate knows about the agent is here: the
//! request/response envelope, the [`AgentGateway`] trait, the HTTP
//! implementation, prompt templates and the tolerant result decoding.

pub mod http;
pub mod parse;
pub mod prompts;

#[cfg(test)]
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AgentConfig;
use crate::core::error::{LoveMatchError, Result};

pub use http::HttpAgentGateway;

/// The three agents the application talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Compatibility,
    Prediction,
    Chat,
}

impl AgentKind {
    pub fn agent_id(self, config: &AgentConfig) -> &str {
        match self {
            AgentKind::Compatibility => &config.compatibility_agent_id,
            AgentKind::Prediction => &config.prediction_agent_id,
            AgentKind::Chat => &config.chat_agent_id,
        }
    }

    pub fn session_id(self, user_id: &str) -> String {
        let prefix = match self {
            AgentKind::Compatibility => "compat",
            AgentKind::Prediction => "pred",
            AgentKind::Chat => "chat",
        };
        format!("{}-{}", prefix, user_id)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Compatibility => write!(f, "compatibility"),
            AgentKind::Prediction => write!(f, "prediction"),
            AgentKind::Chat => write!(f, "chat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub message: String,
    pub agent_id: String,
    pub user_id: String,
    pub session_id: String,
}

impl AgentRequest {
    pub fn new(kind: AgentKind, config: &AgentConfig, user_id: &str, message: String) -> Self {
        Self {
            message,
            agent_id: kind.agent_id(config).to_string(),
            user_id: user_id.to_string(),
            session_id: kind.session_id(user_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPayload {
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<AgentPayload>,
}

impl AgentResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            response: Some(AgentPayload { result }),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            response: None,
        }
    }

    /// The result payload, or `AgentUnavailable` when the call did not produce one.
    pub fn into_result(self) -> Result<Value> {
        if !self.success {
            return Err(LoveMatchError::AgentUnavailable(
                "agent reported failure".to_string(),
            ));
        }
        match self.response.map(|p| p.result) {
            Some(Value::Null) | None => Err(LoveMatchError::AgentUnavailable(
                "agent returned no result".to_string(),
            )),
            Some(Value::String(s)) if s.is_empty() => Err(LoveMatchError::AgentUnavailable(
                "agent returned an empty result".to_string(),
            )),
            Some(result) => Ok(result),
        }
    }
}

#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_ids() {
        assert_eq!(AgentKind::Compatibility.session_id("u1"), "compat-u1");
        assert_eq!(AgentKind::Prediction.session_id("u1"), "pred-u1");
        assert_eq!(AgentKind::Chat.session_id("u1"), "chat-u1");
    }

    #[test]
    fn test_request_uses_configured_agent() {
        let config = AgentConfig::default();
        let request = AgentRequest::new(AgentKind::Prediction, &config, "u1", "hi".into());
        assert_eq!(request.agent_id, config.prediction_agent_id);
        assert_eq!(request.session_id, "pred-u1");
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            AgentResponse::ok(json!({"a": 1})).into_result().unwrap(),
            json!({"a": 1})
        );
        assert!(AgentResponse::failed().into_result().is_err());
        assert!(AgentResponse::ok(Value::Null).into_result().is_err());
        assert!(AgentResponse::ok(json!("")).into_result().is_err());
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: AgentResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(response.response.is_none());
        assert!(response.into_result().is_err());
    }
}
