//! Engine statistics

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::agent::AgentStatus;
use crate::ids::{AgentId, PoolId};

use super::core::RoutingEngine;

/// Load across the pools an agent belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPoolStats {
    /// Visitors assigned to any agent sharing a pool with this agent (the
    /// agent's own load when it belongs to no pool)
    pub pool_visitors: usize,
}

/// Engine-wide snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_agents: usize,
    /// Agents not offline
    pub online_agents: usize,
    /// Assignments held by online agents
    pub total_assignments: usize,
    pub total_visitors: usize,
    /// Agents currently on a call
    pub active_calls: usize,
    pub pending_requests: usize,
    pub pool_count: usize,
    /// Registered member agents per pool
    pub agents_by_pool: BTreeMap<PoolId, usize>,
}

impl RoutingEngine {
    pub fn agent_stats(&self, agent_id: &AgentId) -> Option<AgentPoolStats> {
        let state = self.state.lock();
        let agent = state.agents.get(agent_id)?;

        let memberships = state.pools.memberships(agent_id);
        if memberships.is_empty() {
            return Some(AgentPoolStats { pool_visitors: agent.load() });
        }

        let colleagues: HashSet<&AgentId> = memberships
            .iter()
            .flat_map(|m| state.pools.members(&m.pool_id))
            .collect();
        let pool_visitors = colleagues
            .into_iter()
            .filter_map(|id| state.agents.get(id))
            .map(|agent| agent.load())
            .sum();

        Some(AgentPoolStats { pool_visitors })
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();

        let mut stats = EngineStats {
            total_agents: state.agents.len(),
            total_visitors: state.visitors.len(),
            pending_requests: state.calls.pending_count(),
            pool_count: state.pools.pool_count(),
            ..EngineStats::default()
        };

        for agent in state.agents.values() {
            if agent.status() != AgentStatus::Offline {
                stats.online_agents += 1;
                stats.total_assignments += agent.load();
            }
            if agent.current_call_visitor_id.is_some() {
                stats.active_calls += 1;
            }
        }

        for pool_id in state.pools.pool_ids() {
            let registered = state
                .pools
                .members(pool_id)
                .iter()
                .filter(|id| state.agents.contains_key(*id))
                .count();
            stats.agents_by_pool.insert(pool_id.clone(), registered);
        }

        stats
    }
}
