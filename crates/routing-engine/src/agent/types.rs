//! Core types for agent management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, ConnectionId, VisitorId};

/// Agent status enumeration
///
/// Represents the current operational status of an agent. The status
/// determines routing eligibility: only `Idle` and `InSimulation` agents can
/// receive new visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Connected with no visitors assigned
    Idle,

    /// Connected and presenting a simulation to one or more visitors
    InSimulation,

    /// On a live call with exactly one visitor
    InCall,

    /// Connected but temporarily unavailable (manual or heartbeat staleness)
    Away,

    /// Logged out or disconnected
    Offline,
}

impl AgentStatus {
    /// Whether the scheduler may consider an agent in this status at all
    pub fn is_routable(&self) -> bool {
        matches!(self, AgentStatus::Idle | AgentStatus::InSimulation)
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" | "Idle" | "IDLE" => Ok(AgentStatus::Idle),
            "in_simulation" | "InSimulation" | "IN_SIMULATION" => Ok(AgentStatus::InSimulation),
            "in_call" | "InCall" | "IN_CALL" => Ok(AgentStatus::InCall),
            "away" | "Away" | "AWAY" => Ok(AgentStatus::Away),
            "offline" | "Offline" | "OFFLINE" => Ok(AgentStatus::Offline),
            _ => Err(format!("Unknown agent status: {}", s)),
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::InSimulation => write!(f, "in_simulation"),
            AgentStatus::InCall => write!(f, "in_call"),
            AgentStatus::Away => write!(f, "away"),
            AgentStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Agent profile as loaded from the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Human-readable agent name
    pub display_name: String,

    /// Avatar shown to visitors (optional)
    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Current agent status
    pub status: AgentStatus,

    /// Maximum number of visitors that may be routed to this agent at once
    pub max_concurrent_assignments: u32,
}

impl AgentProfile {
    /// Create an idle profile with the given capacity
    pub fn new(display_name: impl Into<String>, max_concurrent_assignments: u32) -> Self {
        Self {
            display_name: display_name.into(),
            avatar_url: None,
            status: AgentStatus::Idle,
            max_concurrent_assignments,
        }
    }

    /// Builder-style status override
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }
}

/// Live record of one connected agent
///
/// Invariants maintained by the registry:
/// - `current_assignments.len() <= profile.max_concurrent_assignments`
/// - `profile.status == InCall` exactly when `current_call_visitor_id` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub connection_id: ConnectionId,
    pub profile: AgentProfile,

    /// Visitors currently routed to this agent, in assignment order
    pub current_assignments: Vec<VisitorId>,

    pub current_call_visitor_id: Option<VisitorId>,
    pub connected_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl AgentRecord {
    pub(crate) fn new(agent_id: AgentId, connection_id: ConnectionId, profile: AgentProfile) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            connection_id,
            profile,
            current_assignments: Vec::new(),
            current_call_visitor_id: None,
            connected_at: now,
            last_activity_at: now,
        }
    }

    pub fn status(&self) -> AgentStatus {
        self.profile.status
    }

    /// Number of visitors currently assigned
    pub fn load(&self) -> usize {
        self.current_assignments.len()
    }

    pub fn is_at_capacity(&self) -> bool {
        self.load() >= self.profile.max_concurrent_assignments as usize
    }

    pub fn has_assignment(&self, visitor_id: &VisitorId) -> bool {
        self.current_assignments.contains(visitor_id)
    }

    /// Idle with nothing assigned; eligible for round-robin selection
    pub fn is_idle_zero_load(&self) -> bool {
        self.profile.status == AgentStatus::Idle && self.current_assignments.is_empty()
    }

    /// Bring the stored status back in line with the assignment/call state.
    ///
    /// A held call always wins; otherwise `Idle` and `InSimulation` track
    /// whether anything is assigned. `Away` and `Offline` are left alone.
    pub(crate) fn reconcile_status(&mut self) {
        if self.current_call_visitor_id.is_some() {
            self.profile.status = AgentStatus::InCall;
            return;
        }
        self.profile.status = match self.profile.status {
            AgentStatus::Idle | AgentStatus::InSimulation | AgentStatus::InCall => {
                if self.current_assignments.is_empty() {
                    AgentStatus::Idle
                } else {
                    AgentStatus::InSimulation
                }
            }
            other => other,
        };
    }
}
