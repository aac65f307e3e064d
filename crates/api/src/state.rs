use std::sync::Arc;

use agentdash_core::agents::AgentCommands;
use agentdash_core::error::CoreError;
use agentdash_core::invocation::InvocationDispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Runs agent CLI processes and generated scripts.
    pub dispatcher: InvocationDispatcher,
    /// Maps agent operations onto invocation requests.
    pub agents: Arc<AgentCommands>,
}

impl AppState {
    /// Build the state from configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, CoreError> {
        let agents = config.agent_commands()?;
        let dispatcher = InvocationDispatcher::new(config.dispatcher_config());

        Ok(Self {
            dispatcher,
            agents: Arc::new(agents),
        })
    }
}
