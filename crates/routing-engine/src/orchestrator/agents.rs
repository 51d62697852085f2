//! Agent management for the routing engine
//!
//! Registration (including reconnects), status changes, heartbeats and pool
//! membership.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::{AgentProfile, AgentRecord, AgentStatus};
use crate::error::Result;
use crate::ids::{AgentId, ConnectionId, PoolId, VisitorId};
use crate::routing::PoolMembership;
use crate::visitor::VisitorState;

use super::core::RoutingEngine;

/// Outcome of [`RoutingEngine::register_agent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    /// Agent record after registration
    pub agent: AgentRecord,

    /// `true` when an existing record was updated in place
    pub reconnected: bool,

    /// Visitors dropped because the new profile lowered capacity below the
    /// current load; they are now unassigned
    pub detached_visitors: Vec<VisitorId>,
}

impl RoutingEngine {
    /// Register an agent connection.
    ///
    /// A known `agent_id` is a reconnect: the connection handle and profile
    /// are replaced while assignments and call state are kept. The stored
    /// status is reconciled with that state afterwards.
    pub fn register_agent(
        &self,
        agent_id: AgentId,
        connection_id: ConnectionId,
        profile: AgentProfile,
    ) -> AgentRegistration {
        let mut state = self.state.lock();

        let Some(existing) = state.agents.get_mut(&agent_id) else {
            let mut record = AgentRecord::new(agent_id.clone(), connection_id, profile);
            record.reconcile_status();
            info!(
                "👤 Agent registered: {} ({}), capacity {}",
                record.profile.display_name, agent_id, record.profile.max_concurrent_assignments
            );
            state.agents.insert(agent_id, record.clone());
            return AgentRegistration {
                agent: record,
                reconnected: false,
                detached_visitors: Vec::new(),
            };
        };

        info!(
            "🔄 Agent reconnecting: {} ({}), connection {} -> {}",
            profile.display_name, agent_id, existing.connection_id, connection_id
        );
        existing.connection_id = connection_id;
        existing.profile = profile;
        existing.last_activity_at = Utc::now();

        let capacity = existing.profile.max_concurrent_assignments as usize;
        let detached_visitors = if existing.current_assignments.len() > capacity {
            existing.current_assignments.split_off(capacity)
        } else {
            Vec::new()
        };
        existing.reconcile_status();
        let agent = existing.clone();

        for visitor_id in &detached_visitors {
            if let Some(visitor) = state.visitors.get_mut(visitor_id) {
                visitor.assigned_agent_id = None;
            }
        }
        if !detached_visitors.is_empty() {
            warn!(
                "⚠️ Agent {} capacity lowered to {}, detached {} visitors",
                agent_id,
                capacity,
                detached_visitors.len()
            );
        }

        AgentRegistration {
            agent,
            reconnected: true,
            detached_visitors,
        }
    }

    /// Remove an agent for good.
    ///
    /// Returns the visitors that were assigned to it; each is left unassigned.
    /// Pool memberships and round-robin history are dropped, and a live call
    /// the agent held is ended.
    pub fn unregister_agent(&self, agent_id: &AgentId) -> Vec<VisitorId> {
        let mut state = self.state.lock();
        let Some(agent) = state.agents.shift_remove(agent_id) else {
            return Vec::new();
        };

        let mut affected = agent.current_assignments.clone();
        for visitor_id in state.orphan_visitors_of(agent_id) {
            if !affected.contains(&visitor_id) {
                affected.push(visitor_id);
            }
        }

        if let Some(call_id) = state.calls.call_for_agent(agent_id).map(|c| c.call_id.clone()) {
            if let Some(call) = state.calls.finish(&call_id) {
                if let Some(visitor) = state.visitors.get_mut(&call.visitor_id) {
                    visitor.transition(VisitorState::Browsing);
                }
                info!("📴 Call {} ended because agent {} left", call.call_id, agent_id);
            }
        }

        state.pools.remove_agent(agent_id);
        state.ledger.forget(agent_id);

        info!(
            "👋 Agent unregistered: {} ({} visitors affected)",
            agent_id,
            affected.len()
        );
        affected
    }

    pub fn agent(&self, agent_id: &AgentId) -> Option<AgentRecord> {
        self.state.lock().agents.get(agent_id).cloned()
    }

    pub fn agent_by_connection(&self, connection_id: &ConnectionId) -> Option<AgentRecord> {
        self.state
            .lock()
            .agents
            .values()
            .find(|agent| &agent.connection_id == connection_id)
            .cloned()
    }

    /// Every registered agent, in registration order
    pub fn agents(&self) -> Vec<AgentRecord> {
        self.state.lock().agents.values().cloned().collect()
    }

    /// Manual status change (away, offline, back to idle).
    ///
    /// `InCall` cannot be set here, and an agent holding a call keeps
    /// `InCall` until the call ends. `Idle`/`InSimulation` follow the agent's
    /// assignment list.
    pub fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> bool {
        let mut state = self.state.lock();
        let Some(agent) = state.agents.get_mut(agent_id) else {
            return false;
        };

        if status == AgentStatus::InCall {
            warn!("⚠️ Refusing to set agent {} in_call without a call", agent_id);
            return false;
        }
        if agent.current_call_visitor_id.is_some() {
            warn!("⚠️ Agent {} is on a call, ignoring status {}", agent_id, status);
            return false;
        }

        agent.profile.status = status;
        agent.reconcile_status();
        info!("🔄 Agent {} status -> {}", agent_id, agent.profile.status);
        true
    }

    /// Put the agent on a call with `visitor_id`, or take it off (`None`)
    pub fn set_agent_in_call(&self, agent_id: &AgentId, visitor_id: Option<VisitorId>) -> bool {
        self.state.lock().set_in_call(agent_id, visitor_id)
    }

    /// Record agent liveness
    pub fn heartbeat(&self, agent_id: &AgentId) -> bool {
        let mut state = self.state.lock();
        match state.agents.get_mut(agent_id) {
            Some(agent) => {
                agent.last_activity_at = Utc::now();
                debug!("💓 Heartbeat from agent {}", agent_id);
                true
            }
            None => false,
        }
    }

    /// Replace the agent's pool memberships; the first entry is its primary
    /// pool
    pub fn set_membership(&self, agent_id: &AgentId, memberships: Vec<PoolMembership>) -> Result<()> {
        let mut state = self.state.lock();
        state.pools.set_membership(agent_id, memberships)?;
        info!(
            "🏷️ Agent {} pools: {:?}",
            agent_id,
            state
                .pools
                .memberships(agent_id)
                .iter()
                .map(|m| format!("{}#{}", m.pool_id, m.priority_rank))
                .collect::<Vec<_>>()
        );
        Ok(())
    }

    pub fn add_agent_to_pool(&self, agent_id: &AgentId, pool_id: &PoolId, priority_rank: u32) -> Result<()> {
        self.state.lock().pools.add_to_pool(agent_id, pool_id, priority_rank)
    }

    pub fn remove_agent_from_pool(&self, agent_id: &AgentId, pool_id: &PoolId) -> bool {
        self.state.lock().pools.remove_from_pool(agent_id, pool_id)
    }

    /// Rank of the agent in the pool (1 when unset)
    pub fn priority_rank(&self, agent_id: &AgentId, pool_id: &PoolId) -> u32 {
        self.state.lock().pools.priority_rank(agent_id, pool_id)
    }

    /// Live records of the pool's registered members
    pub fn agents_in_pool(&self, pool_id: &PoolId) -> Vec<AgentRecord> {
        let state = self.state.lock();
        state
            .pools
            .members(pool_id)
            .iter()
            .filter_map(|agent_id| state.agents.get(agent_id).cloned())
            .collect()
    }

    pub fn agent_pools(&self, agent_id: &AgentId) -> Vec<PoolMembership> {
        self.state.lock().pools.memberships(agent_id).to_vec()
    }

    pub fn agent_primary_pool(&self, agent_id: &AgentId) -> Option<PoolId> {
        self.state.lock().pools.primary_pool(agent_id).cloned()
    }
}
