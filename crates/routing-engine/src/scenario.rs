//! Seeding an engine from a persisted configuration dump
//!
//! Routing configuration and agent pool memberships are owned by an external
//! store. A [`RoutingScenario`] is the JSON shape of that data: what the store
//! would push into a freshly started engine.
//!
//! ```json
//! {
//!   "organizations": [
//!     { "organization_id": "acme", "default_pool_id": "general",
//!       "rules": [ { "id": "docs", "path_pattern": "/docs/**", "pool_id": "support", "priority": 10 } ] }
//!   ],
//!   "agents": [
//!     { "agent_id": "alice", "display_name": "Alice", "max_concurrent_assignments": 2,
//!       "pools": [ { "pool_id": "support" }, { "pool_id": "general", "priority_rank": 2 } ] }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{AgentProfile, AgentStatus};
use crate::error::{Result, RoutingError};
use crate::ids::{AgentId, ConnectionId, OrganizationId};
use crate::orchestrator::RoutingEngine;
use crate::routing::{OrganizationRoutingConfig, PoolMembership};

fn idle() -> AgentStatus {
    AgentStatus::Idle
}

/// One agent as stored by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub agent_id: AgentId,
    pub display_name: String,

    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Falls back to the engine's default capacity
    #[serde(default)]
    pub max_concurrent_assignments: Option<u32>,

    #[serde(default = "idle")]
    pub status: AgentStatus,

    /// Ordered; the first pool is the agent's primary pool
    #[serde(default)]
    pub pools: Vec<PoolMembership>,
}

/// Organization configs plus agents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingScenario {
    #[serde(default)]
    pub organizations: Vec<OrganizationRoutingConfig>,

    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
}

impl RoutingScenario {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scenario: RoutingScenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.agent_id.as_str().is_empty() {
                return Err(RoutingError::invalid_input(format!("agent #{} has an empty id", index)));
            }
            if agent.max_concurrent_assignments == Some(0) {
                return Err(RoutingError::invalid_input(format!(
                    "agent {} has zero capacity",
                    agent.agent_id
                )));
            }
            if self.agents[..index].iter().any(|a| a.agent_id == agent.agent_id) {
                return Err(RoutingError::invalid_input(format!(
                    "agent {} is defined twice",
                    agent.agent_id
                )));
            }
        }
        Ok(())
    }

    /// The routing config the scenario defines for an organization
    pub fn require_organization(&self, organization_id: &OrganizationId) -> Result<&OrganizationRoutingConfig> {
        self.organizations
            .iter()
            .find(|org| &org.organization_id == organization_id)
            .ok_or_else(|| {
                RoutingError::not_found(format!("organization {} is not defined in the scenario", organization_id))
            })
    }

    /// Push organization configs, agents and memberships into the engine.
    ///
    /// Each agent is registered with a placeholder connection id derived from
    /// its agent id, as if it had just connected.
    pub fn apply(&self, engine: &RoutingEngine) -> Result<()> {
        self.validate()?;

        for organization in &self.organizations {
            engine.set_org_config(organization.clone())?;
        }

        let default_capacity = engine.config().agents.default_max_concurrent_assignments;
        for definition in &self.agents {
            let mut profile = AgentProfile::new(
                definition.display_name.clone(),
                definition.max_concurrent_assignments.unwrap_or(default_capacity),
            )
            .with_status(definition.status);
            profile.avatar_url = definition.avatar_url.clone();

            engine.register_agent(
                definition.agent_id.clone(),
                ConnectionId::from(format!("seed-{}", definition.agent_id)),
                profile,
            );
            engine.set_membership(&definition.agent_id, definition.pools.clone())?;
        }

        info!(
            "🌱 Scenario applied: {} organizations, {} agents",
            self.organizations.len(),
            self.agents.len()
        );
        Ok(())
    }
}
