//! Visitor management for the routing engine

use tracing::{debug, info};

use crate::ids::{AgentId, ConnectionId, OrganizationId, VisitorId};
use crate::visitor::{VisitorRecord, VisitorState};

use super::core::RoutingEngine;

impl RoutingEngine {
    /// Register a visitor connection.
    ///
    /// Re-registering a known visitor id replaces the old record after
    /// detaching it from whatever agent it was assigned to and withdrawing
    /// its pending call requests.
    pub fn register_visitor(
        &self,
        visitor_id: VisitorId,
        connection_id: ConnectionId,
        organization_id: OrganizationId,
        page_url: impl Into<String>,
    ) -> VisitorRecord {
        let mut state = self.state.lock();

        if let Some(previous) = state.visitors.shift_remove(&visitor_id) {
            if let Some(agent_id) = previous.assigned_agent_id {
                state.detach(&agent_id, &visitor_id);
            }
            state.calls.drop_requests_from(&visitor_id);
            debug!("👁️ Visitor {} re-registered, old record dropped", visitor_id);
        }

        let record = VisitorRecord::new(visitor_id.clone(), connection_id, organization_id, page_url.into());
        info!(
            "👁️ Visitor registered: {} (org {}, {})",
            visitor_id, record.organization_id, record.current_url
        );
        state.visitors.insert(visitor_id, record.clone());
        record
    }

    /// Drop a visitor, detaching it from its agent and withdrawing its
    /// pending call requests.
    ///
    /// Live calls are left alone so that a reconnecting visitor can resume
    /// them with [`reconnect_call`](RoutingEngine::reconnect_call).
    pub fn unregister_visitor(&self, visitor_id: &VisitorId) -> Option<VisitorRecord> {
        let mut state = self.state.lock();
        let record = state.visitors.shift_remove(visitor_id)?;
        if let Some(agent_id) = &record.assigned_agent_id {
            state.detach(agent_id, visitor_id);
        }
        let withdrawn = state.calls.drop_requests_from(visitor_id);
        if !withdrawn.is_empty() {
            debug!("🚫 Dropped {} pending requests of visitor {}", withdrawn.len(), visitor_id);
        }
        info!("👋 Visitor unregistered: {}", visitor_id);
        Some(record)
    }

    pub fn visitor(&self, visitor_id: &VisitorId) -> Option<VisitorRecord> {
        self.state.lock().visitors.get(visitor_id).cloned()
    }

    pub fn visitor_by_connection(&self, connection_id: &ConnectionId) -> Option<VisitorRecord> {
        self.state
            .lock()
            .visitors
            .values()
            .find(|visitor| &visitor.connection_id == connection_id)
            .cloned()
    }

    /// Visitors without an agent, in registration order
    pub fn unassigned_visitors(&self) -> Vec<VisitorRecord> {
        self.state
            .lock()
            .visitors
            .values()
            .filter(|visitor| visitor.assigned_agent_id.is_none())
            .cloned()
            .collect()
    }

    /// Page navigation; the assignment is kept until the caller re-routes
    pub fn update_visitor_url(&self, visitor_id: &VisitorId, page_url: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        match state.visitors.get_mut(visitor_id) {
            Some(visitor) => {
                visitor.current_url = page_url.into();
                debug!("🧭 Visitor {} navigated to {}", visitor_id, visitor.current_url);
                true
            }
            None => false,
        }
    }

    pub fn update_visitor_state(&self, visitor_id: &VisitorId, visitor_state: VisitorState) -> bool {
        let mut state = self.state.lock();
        match state.visitors.get_mut(visitor_id) {
            Some(visitor) => {
                visitor.transition(visitor_state);
                true
            }
            None => false,
        }
    }

    /// Assign a visitor to a specific agent.
    ///
    /// Returns `false` when either is unknown or the agent is at capacity.
    pub fn assign_visitor(&self, visitor_id: &VisitorId, agent_id: &AgentId) -> bool {
        self.state.lock().assign(visitor_id, agent_id)
    }

    /// Take a visitor off an agent. The visitor is left unassigned if it
    /// pointed at that agent.
    pub fn remove_visitor_from_agent(&self, agent_id: &AgentId, visitor_id: &VisitorId) -> bool {
        let mut state = self.state.lock();
        let removed = state.detach(agent_id, visitor_id);
        if let Some(visitor) = state.visitors.get_mut(visitor_id) {
            if visitor.assigned_agent_id.as_ref() == Some(agent_id) {
                visitor.assigned_agent_id = None;
            }
        }
        removed
    }
}
