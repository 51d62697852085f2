//! Visitor records
//!
//! A visitor is an anonymous website user connected through the embedded
//! widget. Visitor records are created on connect and destroyed on disconnect;
//! there is no reconnect identity for visitors beyond the id the widget
//! presents again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, ConnectionId, OrganizationId, PoolId, VisitorId};

/// Visitor engagement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorState {
    /// On the site, not (yet) watching an agent
    Browsing,

    /// Assigned to an agent and watching its simulation
    WatchingSimulation,

    /// Asked for a live call, waiting for an agent to answer
    CallRequested,

    /// On a live call
    InCall,
}

impl std::str::FromStr for VisitorState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "browsing" => Ok(VisitorState::Browsing),
            "watching_simulation" => Ok(VisitorState::WatchingSimulation),
            "call_requested" => Ok(VisitorState::CallRequested),
            "in_call" => Ok(VisitorState::InCall),
            _ => Err(format!("Unknown visitor state: {}", s)),
        }
    }
}

impl std::fmt::Display for VisitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitorState::Browsing => write!(f, "browsing"),
            VisitorState::WatchingSimulation => write!(f, "watching_simulation"),
            VisitorState::CallRequested => write!(f, "call_requested"),
            VisitorState::InCall => write!(f, "in_call"),
        }
    }
}

/// Live record of one connected visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRecord {
    pub visitor_id: VisitorId,
    pub connection_id: ConnectionId,
    pub organization_id: OrganizationId,
    pub current_url: String,
    pub assigned_agent_id: Option<AgentId>,
    pub state: VisitorState,

    /// Pool the visitor was last routed through (`None` for global fallback)
    pub matched_pool_id: Option<PoolId>,

    pub connected_at: DateTime<Utc>,

    /// Set once, the first time the visitor starts watching a simulation
    pub first_interaction_at: Option<DateTime<Utc>>,
}

impl VisitorRecord {
    pub(crate) fn new(
        visitor_id: VisitorId,
        connection_id: ConnectionId,
        organization_id: OrganizationId,
        current_url: String,
    ) -> Self {
        Self {
            visitor_id,
            connection_id,
            organization_id,
            current_url,
            assigned_agent_id: None,
            state: VisitorState::Browsing,
            matched_pool_id: None,
            connected_at: Utc::now(),
            first_interaction_at: None,
        }
    }

    /// Move to `state`, stamping the first interaction when it happens
    pub(crate) fn transition(&mut self, state: VisitorState) {
        self.state = state;
        if state == VisitorState::WatchingSimulation && self.first_interaction_at.is_none() {
            self.first_interaction_at = Some(Utc::now());
        }
    }
}
