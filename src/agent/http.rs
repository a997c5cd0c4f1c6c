use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AgentGateway, AgentRequest, AgentResponse};
use crate::config::AgentConfig;
use crate::core::error::{LoveMatchError, Result};

/// Agent gateway that POSTs the request envelope as JSON to the configured endpoint.
pub struct HttpAgentGateway {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAgentGateway {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentResponse> {
        debug!(agent_id = %request.agent_id, session_id = %request.session_id, "invoking agent");

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), agent_id = %request.agent_id, "agent request failed");
            return Err(LoveMatchError::AgentUnavailable(format!(
                "request failed with status: {}",
                response.status()
            )));
        }

        let envelope: AgentResponse = response.json().await?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;

    #[test]
    fn test_gateway_creation() {
        let config = AgentConfig::default();
        assert!(HttpAgentGateway::new(&config).is_ok());
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let config = AgentConfig {
            api_key: Some(String::new()),
            ..AgentConfig::default()
        };
        let gateway = HttpAgentGateway::new(&config).unwrap();
        assert!(gateway.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = AgentConfig {
            endpoint: "http://127.0.0.1:9/unreachable".to_string(),
            timeout_secs: 2,
            ..AgentConfig::default()
        };
        let gateway = HttpAgentGateway::new(&config).unwrap();
        let request = AgentRequest::new(AgentKind::Chat, &config, "u1", "hello".into());

        let err = gateway.invoke(request).await.unwrap_err();
        assert!(err.is_agent_failure());
    }
}
