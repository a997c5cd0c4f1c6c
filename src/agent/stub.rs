//! Scripted gateway for controller tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{AgentGateway, AgentRequest, AgentResponse};
use crate::core::error::{LoveMatchError, Result};

pub enum Scripted {
    Respond(AgentResponse),
    Fail(String),
}

/// Records every request and replays scripted outcomes in order.
/// With nothing scripted it answers with `success: false`.
#[derive(Default)]
pub struct StubGateway {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<AgentRequest>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: AgentResponse) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Respond(response));
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(reason.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<AgentRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentGateway for StubGateway {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentResponse> {
        self.calls.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(reason)) => Err(LoveMatchError::AgentUnavailable(reason)),
            None => Ok(AgentResponse::failed()),
        }
    }
}
