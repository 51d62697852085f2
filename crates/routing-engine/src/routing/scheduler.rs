//! Tiered dispatcher
//!
//! Picks the single best agent for a new visitor:
//!
//! 1. Pool members are partitioned into tiers by priority rank and tiers are
//!    visited lowest rank first. The first tier that yields an agent wins.
//! 2. Inside a tier, agents that are in a call, away, offline, at capacity or
//!    explicitly excluded are skipped.
//! 3. Idle agents with nothing assigned are chosen round-robin: the one whose
//!    most recent assignment is oldest (never assigned counts as oldest).
//! 4. Otherwise the least loaded eligible agent is chosen; ties go to the
//!    agent seen first.
//!
//! Without a pool the whole agent set is one tier.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use tracing::debug;

use super::pools::PoolRegistry;
use crate::agent::AgentRecord;
use crate::ids::{AgentId, PoolId};

/// Round-robin bookkeeping: a global assignment counter and, per agent, the
/// counter value at its most recent assignment.
#[derive(Debug, Default)]
pub struct AssignmentLedger {
    counter: u64,
    last_assignment: HashMap<AgentId, u64>,
}

impl AssignmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new assignment for the agent and return its order value
    pub fn record(&mut self, agent_id: &AgentId) -> u64 {
        self.counter += 1;
        self.last_assignment.insert(agent_id.clone(), self.counter);
        self.counter
    }

    /// Order value of the agent's latest assignment; 0 when never assigned
    pub fn order_of(&self, agent_id: &AgentId) -> u64 {
        self.last_assignment.get(agent_id).copied().unwrap_or(0)
    }

    pub fn forget(&mut self, agent_id: &AgentId) {
        self.last_assignment.remove(agent_id);
    }

    pub fn total_assignments(&self) -> u64 {
        self.counter
    }
}

fn is_eligible(agent: &AgentRecord, exclude: Option<&AgentId>) -> bool {
    agent.status().is_routable()
        && !agent.is_at_capacity()
        && exclude.is_none_or(|excluded| excluded != &agent.agent_id)
}

/// Intra-tier selection over one set of candidates
pub fn select_in_tier<'a, I>(
    candidates: I,
    ledger: &AssignmentLedger,
    exclude: Option<&AgentId>,
) -> Option<&'a AgentRecord>
where
    I: IntoIterator<Item = &'a AgentRecord>,
{
    let mut idle_best: Option<(&AgentRecord, u64)> = None;
    let mut least_loaded: Option<&AgentRecord> = None;

    for agent in candidates {
        if !is_eligible(agent, exclude) {
            continue;
        }

        if agent.is_idle_zero_load() {
            let order = ledger.order_of(&agent.agent_id);
            if idle_best.is_none_or(|(_, best)| order < best) {
                idle_best = Some((agent, order));
            }
        }

        if least_loaded.is_none_or(|best| agent.load() < best.load()) {
            least_loaded = Some(agent);
        }
    }

    idle_best.map(|(agent, _)| agent).or(least_loaded)
}

/// Select an agent, optionally restricted to a pool's tiers
pub fn select_agent<'a>(
    agents: &'a IndexMap<AgentId, AgentRecord>,
    pools: &PoolRegistry,
    ledger: &AssignmentLedger,
    pool_id: Option<&PoolId>,
    exclude: Option<&AgentId>,
) -> Option<&'a AgentRecord> {
    let Some(pool_id) = pool_id else {
        return select_in_tier(agents.values(), ledger, exclude);
    };

    let mut tiers: BTreeMap<u32, Vec<&AgentRecord>> = BTreeMap::new();
    for member in pools.members(pool_id) {
        if let Some(agent) = agents.get(member) {
            tiers
                .entry(pools.priority_rank(member, pool_id))
                .or_default()
                .push(agent);
        }
    }

    for (rank, tier) in tiers {
        if let Some(agent) = select_in_tier(tier, ledger, exclude) {
            debug!("🎯 pool {} tier {} -> agent {}", pool_id, rank, agent.agent_id);
            return Some(agent);
        }
    }

    debug!("🎯 pool {} has no available agent", pool_id);
    None
}
