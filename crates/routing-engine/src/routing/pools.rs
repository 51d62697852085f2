//! Pool and tier registry
//!
//! Two inverse indexes (pool -> agents, agent -> memberships) kept consistent
//! by routing every mutation through this type. Memberships are stored as an
//! ordered list per agent; the first entry is the agent's primary pool.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::ids::{AgentId, PoolId};

/// Rank used when an agent has no explicit rank in a pool
pub const DEFAULT_PRIORITY_RANK: u32 = 1;

fn default_rank() -> u32 {
    DEFAULT_PRIORITY_RANK
}

/// An agent's membership in one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMembership {
    pub pool_id: PoolId,

    /// 1 is the primary tier; larger numbers are overflow tiers
    #[serde(default = "default_rank")]
    pub priority_rank: u32,
}

impl PoolMembership {
    pub fn new(pool_id: impl Into<PoolId>, priority_rank: u32) -> Self {
        Self { pool_id: pool_id.into(), priority_rank }
    }

    /// Primary-tier membership
    pub fn primary(pool_id: impl Into<PoolId>) -> Self {
        Self::new(pool_id, DEFAULT_PRIORITY_RANK)
    }
}

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pool_agents: HashMap<PoolId, Vec<AgentId>>,
    agent_pools: HashMap<AgentId, Vec<PoolMembership>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the agent's entire membership set.
    ///
    /// Duplicate pools keep their first occurrence. Rank 0 is rejected and
    /// leaves the previous memberships untouched.
    pub fn set_membership(&mut self, agent_id: &AgentId, memberships: Vec<PoolMembership>) -> Result<()> {
        if let Some(bad) = memberships.iter().find(|m| m.priority_rank == 0) {
            return Err(RoutingError::invalid_input(format!(
                "agent {} pool {}: priority rank starts at 1",
                agent_id, bad.pool_id
            )));
        }

        self.remove_agent(agent_id);

        let mut deduped: Vec<PoolMembership> = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if deduped.iter().any(|m| m.pool_id == membership.pool_id) {
                continue;
            }
            self.pool_agents
                .entry(membership.pool_id.clone())
                .or_default()
                .push(agent_id.clone());
            deduped.push(membership);
        }

        if !deduped.is_empty() {
            self.agent_pools.insert(agent_id.clone(), deduped);
        }
        Ok(())
    }

    /// Add (or re-rank) a single membership
    pub fn add_to_pool(&mut self, agent_id: &AgentId, pool_id: &PoolId, priority_rank: u32) -> Result<()> {
        if priority_rank == 0 {
            return Err(RoutingError::invalid_input(format!(
                "agent {} pool {}: priority rank starts at 1",
                agent_id, pool_id
            )));
        }

        let memberships = self.agent_pools.entry(agent_id.clone()).or_default();
        if let Some(existing) = memberships.iter_mut().find(|m| &m.pool_id == pool_id) {
            existing.priority_rank = priority_rank;
            return Ok(());
        }
        memberships.push(PoolMembership::new(pool_id.clone(), priority_rank));
        self.pool_agents
            .entry(pool_id.clone())
            .or_default()
            .push(agent_id.clone());
        Ok(())
    }

    /// Returns whether a membership was removed
    pub fn remove_from_pool(&mut self, agent_id: &AgentId, pool_id: &PoolId) -> bool {
        let Some(memberships) = self.agent_pools.get_mut(agent_id) else {
            return false;
        };
        let before = memberships.len();
        memberships.retain(|m| &m.pool_id != pool_id);
        let removed = memberships.len() != before;
        if memberships.is_empty() {
            self.agent_pools.remove(agent_id);
        }

        if removed {
            self.detach_from_pool(agent_id, pool_id);
        }
        removed
    }

    /// Drop every membership the agent has
    pub fn remove_agent(&mut self, agent_id: &AgentId) {
        if let Some(memberships) = self.agent_pools.remove(agent_id) {
            for membership in memberships {
                self.detach_from_pool(agent_id, &membership.pool_id);
            }
        }
    }

    fn detach_from_pool(&mut self, agent_id: &AgentId, pool_id: &PoolId) {
        if let Some(agents) = self.pool_agents.get_mut(pool_id) {
            agents.retain(|a| a != agent_id);
            if agents.is_empty() {
                self.pool_agents.remove(pool_id);
            }
        }
    }

    pub fn priority_rank(&self, agent_id: &AgentId, pool_id: &PoolId) -> u32 {
        self.agent_pools
            .get(agent_id)
            .and_then(|memberships| memberships.iter().find(|m| &m.pool_id == pool_id))
            .map(|m| m.priority_rank)
            .unwrap_or(DEFAULT_PRIORITY_RANK)
    }

    /// Member agent ids of a pool, in the order they joined
    pub fn members(&self, pool_id: &PoolId) -> &[AgentId] {
        self.pool_agents.get(pool_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn memberships(&self, agent_id: &AgentId) -> &[PoolMembership] {
        self.agent_pools.get(agent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn primary_pool(&self, agent_id: &AgentId) -> Option<&PoolId> {
        self.memberships(agent_id).first().map(|m| &m.pool_id)
    }

    pub fn is_member(&self, agent_id: &AgentId, pool_id: &PoolId) -> bool {
        self.memberships(agent_id).iter().any(|m| &m.pool_id == pool_id)
    }

    /// Pools that currently have at least one member
    pub fn pool_ids(&self) -> impl Iterator<Item = &PoolId> {
        self.pool_agents.keys()
    }

    pub fn pool_count(&self) -> usize {
        self.pool_agents.len()
    }
}
