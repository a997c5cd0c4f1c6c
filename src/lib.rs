//! LoveMatch: relationship compatibility checks, future predictions and a
//! specialist chat, persisted in a local JSON store shared by every session
//! that points at the same data directory.
//!
//! The agent service doing the actual analysis sits behind
//! [`agent::AgentGateway`]; admins can switch it off globally and answer by
//! hand, and sessions pick up each other's writes by polling ([`sync`]).

pub mod agent;
pub mod config;
pub mod core;
pub mod sync;
pub mod views;

pub use crate::config::Config;
pub use crate::core::{LoveMatchError, Repositories, Result};
pub use crate::views::AppContext;
