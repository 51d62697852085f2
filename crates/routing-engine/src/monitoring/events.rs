//! # Outbound Routing Events
//!
//! The engine never talks to the transport layer. Whatever needs to be pushed
//! to agents or visitors after a background sweep is described by a
//! [`RoutingEvent`] and published on the server's broadcast channel; the
//! connection layer subscribes and turns events into socket messages.
//!
//! ```rust
//! use engage_routing::monitoring::RoutingEvent;
//! use engage_routing::AgentId;
//!
//! let event = RoutingEvent::AgentMarkedAway { agent_id: AgentId::from("a1") };
//! let json = serde_json::to_string(&event).unwrap();
//! assert_eq!(json, r#"{"type":"agent_marked_away","agent_id":"a1"}"#);
//! ```

use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, VisitorId};
use crate::orchestrator::{ReassignmentOutcome, StaleAgentSweep};

/// Notification produced by background routing work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingEvent {
    /// The agent stopped heartbeating and no longer receives visitors
    AgentMarkedAway { agent_id: AgentId },

    /// The visitor now watches a different agent
    VisitorReassigned {
        visitor_id: VisitorId,
        from_agent_id: AgentId,
        to_agent_id: AgentId,
    },

    /// The visitor lost its agent and nobody in its pool could take it
    VisitorUnassigned {
        visitor_id: VisitorId,
        from_agent_id: AgentId,
    },
}

impl RoutingEvent {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            RoutingEvent::AgentMarkedAway { agent_id } => agent_id,
            RoutingEvent::VisitorReassigned { to_agent_id, .. } => to_agent_id,
            RoutingEvent::VisitorUnassigned { from_agent_id, .. } => from_agent_id,
        }
    }

    /// Events describing where an agent's visitors went
    pub fn from_reassignment(from: &AgentId, outcome: &ReassignmentOutcome) -> Vec<RoutingEvent> {
        let moved = outcome.reassigned.iter().map(|(visitor, to)| RoutingEvent::VisitorReassigned {
            visitor_id: visitor.clone(),
            from_agent_id: from.clone(),
            to_agent_id: to.clone(),
        });
        let stranded = outcome.unassigned.iter().map(|visitor| RoutingEvent::VisitorUnassigned {
            visitor_id: visitor.clone(),
            from_agent_id: from.clone(),
        });
        moved.chain(stranded).collect()
    }

    /// The away notice for a stale agent followed by its visitors' moves
    pub fn from_sweep(sweep: &StaleAgentSweep) -> Vec<RoutingEvent> {
        let mut events = vec![RoutingEvent::AgentMarkedAway { agent_id: sweep.agent_id.clone() }];
        events.extend(Self::from_reassignment(&sweep.agent_id, &sweep.outcome));
        events
    }
}
