//! Handlers for agent listing, creation and runs.
//!
//! Each handler maps to exactly one agent CLI invocation. Failures carry the
//! CLI's own stderr back to the dashboard unmodified. Malformed JSON bodies
//! are answered with `BAD_REQUEST` before anything is spawned.

use agentdash_core::agents::{parse_agent_list, NewAgent};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for creating an agent.
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Request body for running an agent.
#[derive(Debug, Default, Deserialize)]
pub struct RunAgentRequest {
    /// Extra arguments appended after the agent name, in order.
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// Result of listing agents.
#[derive(Debug, Serialize)]
pub struct AgentList {
    /// Agent names, or `null` when the CLI output was not a recognizable list.
    pub agents: Option<Vec<String>>,
    /// The CLI's stdout as printed.
    pub raw: String,
}

#[derive(Debug, Serialize)]
pub struct AgentCreated {
    pub name: String,
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct AgentRun {
    pub name: String,
    pub output: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /agents
///
/// Unparseable output is not an error: `agents` is `null` and `raw` holds
/// the text.
pub async fn list_agents(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<AgentList>>> {
    let success = state.dispatcher.execute(state.agents.list()).await?;
    let agents = success.parse_with(parse_agent_list).structured().cloned();

    tracing::debug!(
        parsed = agents.is_some(),
        count = agents.as_ref().map_or(0, Vec::len),
        "Listed agents"
    );

    Ok(Json(DataResponse::ok(AgentList {
        agents,
        raw: success.stdout,
    })))
}

/// POST /agents
///
/// Runs the create-agent script with the validated name and description.
pub async fn create_agent(
    State(state): State<AppState>,
    body: Result<Json<CreateAgentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<AgentCreated>>)> {
    let Json(input) = body?;
    let request = state.agents.create(&NewAgent {
        name: input.name.clone(),
        description: input.description,
    })?;
    let success = state.dispatcher.execute(request).await?;

    tracing::info!(agent = %input.name, "Agent created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::ok(AgentCreated {
            name: input.name,
            output: success.stdout,
        })),
    ))
}

/// POST /agents/{name}/run
pub async fn run_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<RunAgentRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<AgentRun>>> {
    let Json(input) = body?;
    let request = state.agents.run(&name, &input.inputs)?;
    let success = state.dispatcher.execute(request).await?;

    Ok(Json(DataResponse::ok(AgentRun {
        name,
        output: success.stdout,
        stderr: success.stderr,
        exit_code: success.exit_code,
        duration_ms: success.duration_ms,
    })))
}
