//! Controllers behind each screen of the application.
//!
//! Controllers read through the repositories, call the agent gateway when AI
//! responses are enabled, write results back, and expose poll loops so a
//! screen can follow changes made by other sessions or by the admin.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod history;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::agent::{AgentGateway, AgentKind, AgentRequest, HttpAgentGateway};
use crate::config::Config;
use crate::core::error::{LoveMatchError, Result};
use crate::core::Repositories;
use crate::core::settings::AI_ENABLED_KEY;
use crate::sync::{fingerprint, watch_store, PollHandle, Poller};

pub use admin::{AdminController, AdminSnapshot, AdminStats, OverrideForm};
pub use auth::{AuthController, Landing};
pub use chat::{ChatController, ChatOutcome};
pub use dashboard::{AnalysisOutcome, DashboardController};
pub use history::HistoryController;

pub const MANUAL_MODE_HINT: &str = "Manual mode - Admin will review your request.";

/// Shared handles every controller is built from.
#[derive(Clone)]
pub struct AppContext {
    pub repos: Arc<Repositories>,
    pub gateway: Arc<dyn AgentGateway>,
    pub config: Arc<Config>,
}

impl AppContext {
    /// Open the store under the config's data directory and talk to the agent over HTTP.
    pub fn open(config: Config) -> Result<Self> {
        let repos = Repositories::open(config.store_dir(), &config.key_prefix)?;
        let gateway = HttpAgentGateway::new(&config.agent)?;
        Ok(Self::new(config, repos, Arc::new(gateway)))
    }

    pub fn new(config: Config, repos: Repositories, gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            repos: Arc::new(repos),
            gateway,
            config: Arc::new(config),
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.repos.settings.ai_enabled()
    }

    /// Follow the global AI flag at the shell's poll interval.
    pub fn watch_ai_enabled(&self) -> PollHandle<bool> {
        let repos = self.repos.clone();
        let watcher = watch_store(&self.repos.store, &[AI_ENABLED_KEY]);
        Poller::spawn_watching(
            self.config.polling.ai_flag(),
            watcher,
            move || repos.settings.ai_enabled(),
            fingerprint::<bool>,
        )
    }

    /// Call one of the agents and return its result payload.
    pub(crate) async fn ask(
        &self,
        kind: AgentKind,
        user_id: &str,
        message: String,
    ) -> Result<serde_json::Value> {
        let request = AgentRequest::new(kind, &self.config.agent, user_id, message);
        let outcome = match self.gateway.invoke(request).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            warn!(agent = %kind, user_id, error = %e, "agent call produced no result");
        }
        outcome
    }
}

/// Rejects a second submission while one is in flight.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    pub fn try_acquire(&self) -> Result<BusyGuard<'_>> {
        if self.0.swap(true, Ordering::SeqCst) {
            return Err(LoveMatchError::Busy);
        }
        Ok(BusyGuard(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
