//! Call lifecycle operations
//!
//! Every lookup miss returns `None` (or an empty list); callers decide whether
//! to re-route or tell the UI the offer expired.

use chrono::Utc;
use tracing::{info, warn};

use crate::calls::{ActiveCall, CallRequest};
use crate::ids::{AgentId, CallId, OrganizationId, RequestId, VisitorId};
use crate::visitor::VisitorState;

use super::core::RoutingEngine;

impl RoutingEngine {
    /// Offer a call from a visitor to an agent.
    ///
    /// The visitor moves to `call_requested`; the agent is untouched until it
    /// accepts. Returns `None` when the visitor or agent is unknown.
    pub fn create_request(
        &self,
        visitor_id: &VisitorId,
        agent_id: &AgentId,
        organization_id: &OrganizationId,
        page_url: impl Into<String>,
    ) -> Option<CallRequest> {
        let mut state = self.state.lock();
        if !state.agents.contains_key(agent_id) {
            warn!("⚠️ Call request for unknown agent {}", agent_id);
            return None;
        }
        let visitor = state.visitors.get_mut(visitor_id)?;
        visitor.transition(VisitorState::CallRequested);

        let request = state.calls.open_request(
            RequestId::generate(&self.config.calls.request_id_prefix),
            visitor_id.clone(),
            agent_id.clone(),
            organization_id.clone(),
            page_url.into(),
        );
        info!(
            "📞 Call request {} from visitor {} to agent {}",
            request.request_id, visitor_id, agent_id
        );
        Some(request)
    }

    /// Agent accepts: the request becomes an active call and both parties go
    /// in-call.
    ///
    /// A request whose agent or visitor has since disappeared is consumed and
    /// yields `None`. A request is left pending when either party is already
    /// on another call.
    pub fn accept_request(&self, request_id: &RequestId) -> Option<ActiveCall> {
        let mut state = self.state.lock();
        let request = state.calls.request(request_id)?.clone();

        let agent_busy = match state.agents.get(&request.agent_id) {
            Some(agent) => agent.current_call_visitor_id.is_some(),
            None => {
                state.calls.take_request(request_id);
                warn!("⚠️ Request {} expired: agent {} is gone", request_id, request.agent_id);
                return None;
            }
        };
        if !state.visitors.contains_key(&request.visitor_id) {
            state.calls.take_request(request_id);
            warn!("⚠️ Request {} expired: visitor {} is gone", request_id, request.visitor_id);
            return None;
        }
        if agent_busy || state.calls.call_for_visitor(&request.visitor_id).is_some() {
            warn!("⚠️ Request {} not accepted: a party is already on a call", request_id);
            return None;
        }

        state.calls.take_request(request_id);
        let call = state.calls.start_call(
            CallId::generate(&self.config.calls.call_id_prefix),
            request.visitor_id.clone(),
            request.agent_id.clone(),
            Utc::now(),
        );
        if let Some(visitor) = state.visitors.get_mut(&request.visitor_id) {
            visitor.transition(VisitorState::InCall);
        }
        state.set_in_call(&request.agent_id, Some(request.visitor_id.clone()));

        info!(
            "✅ Call {} started: agent {} with visitor {}",
            call.call_id, call.agent_id, call.visitor_id
        );
        Some(call)
    }

    /// Agent declines: only this request is removed. The visitor stays
    /// `call_requested` so the caller can re-route it with the rejecting
    /// agent excluded.
    pub fn reject_request(&self, request_id: &RequestId) -> Option<CallRequest> {
        let request = self.state.lock().calls.take_request(request_id)?;
        info!("❌ Call request {} rejected by agent {}", request_id, request.agent_id);
        Some(request)
    }

    /// Visitor withdraws: the request is removed and the visitor goes back to
    /// watching the simulation.
    pub fn cancel_request(&self, request_id: &RequestId) -> Option<CallRequest> {
        let mut state = self.state.lock();
        let request = state.calls.take_request(request_id)?;
        if let Some(visitor) = state.visitors.get_mut(&request.visitor_id) {
            visitor.transition(VisitorState::WatchingSimulation);
        }
        info!("🚫 Call request {} cancelled by visitor {}", request_id, request.visitor_id);
        Some(request)
    }

    /// Hang up: stamps the end time, the visitor goes back to browsing and the
    /// agent leaves the call.
    pub fn end_call(&self, call_id: &CallId) -> Option<ActiveCall> {
        let mut state = self.state.lock();
        let call = state.calls.finish(call_id)?;
        if let Some(visitor) = state.visitors.get_mut(&call.visitor_id) {
            visitor.transition(VisitorState::Browsing);
        }
        state.set_in_call(&call.agent_id, None);
        info!(
            "📴 Call {} ended after {}s",
            call_id,
            call.duration().map(|d| d.num_seconds()).unwrap_or_default()
        );
        Some(call)
    }

    /// Resume a call under a new call id after the visitor's connection was
    /// replaced (page reload, navigation).
    ///
    /// Any call the agent or the visitor was on is discarded; the new call
    /// keeps the agent's original start time when there was one. Both parties
    /// are forced in-call. The visitor rejoins the agent's assignments unless
    /// the agent is at capacity, in which case it stays unassigned.
    pub fn reconnect_call(&self, visitor_id: &VisitorId, agent_id: &AgentId, call_id: CallId) -> Option<ActiveCall> {
        let mut state = self.state.lock();
        if !state.visitors.contains_key(visitor_id) || !state.agents.contains_key(agent_id) {
            warn!(
                "⚠️ Cannot reconnect call {}: visitor {} or agent {} not found",
                call_id, visitor_id, agent_id
            );
            return None;
        }

        let agent_call = state.calls.call_for_agent(agent_id).map(|c| c.call_id.clone());
        let visitor_call = state.calls.call_for_visitor(visitor_id).map(|c| c.call_id.clone());

        let previous_agent_call = agent_call.and_then(|id| state.calls.discard(&id));
        let previous_visitor_call = visitor_call.and_then(|id| state.calls.discard(&id));

        // A visitor call with another agent leaves that agent free
        if let Some(other) = previous_visitor_call.as_ref().filter(|c| &c.agent_id != agent_id) {
            let other_agent = other.agent_id.clone();
            state.set_in_call(&other_agent, None);
        }

        let started_at = previous_agent_call
            .as_ref()
            .or(previous_visitor_call.as_ref())
            .map(|c| c.started_at)
            .unwrap_or_else(Utc::now);

        let previous_agent = state
            .visitors
            .get(visitor_id)
            .and_then(|v| v.assigned_agent_id.clone())
            .filter(|prev| prev != agent_id);
        if let Some(previous_agent) = previous_agent {
            state.detach(&previous_agent, visitor_id);
        }

        // The agent's assignment list and the visitor's link move together
        let holds_visitor = match state.agents.get_mut(agent_id) {
            Some(agent) if agent.has_assignment(visitor_id) => true,
            Some(agent) if !agent.is_at_capacity() => {
                agent.current_assignments.push(visitor_id.clone());
                true
            }
            _ => {
                warn!(
                    "⚠️ Agent {} is at capacity, visitor {} rejoins the call unassigned",
                    agent_id, visitor_id
                );
                false
            }
        };

        let call = state
            .calls
            .start_call(call_id, visitor_id.clone(), agent_id.clone(), started_at);
        if let Some(visitor) = state.visitors.get_mut(visitor_id) {
            visitor.assigned_agent_id = holds_visitor.then(|| agent_id.clone());
            visitor.transition(VisitorState::InCall);
        }
        state.set_in_call(agent_id, Some(visitor_id.clone()));

        info!(
            "🔗 Visitor {} reconnected to call {} with agent {}",
            visitor_id, call.call_id, agent_id
        );
        Some(call)
    }

    /// Pending requests for an agent, oldest first
    pub fn waiting_requests(&self, agent_id: &AgentId) -> Vec<CallRequest> {
        self.state.lock().calls.waiting_for(agent_id)
    }

    /// Longest-waiting pending request for an agent
    pub fn next_waiting_request(&self, agent_id: &AgentId) -> Option<CallRequest> {
        self.state.lock().calls.next_waiting(agent_id)
    }

    pub fn call_request(&self, request_id: &RequestId) -> Option<CallRequest> {
        self.state.lock().calls.request(request_id).cloned()
    }

    pub fn active_call(&self, call_id: &CallId) -> Option<ActiveCall> {
        self.state.lock().calls.call(call_id).cloned()
    }

    pub fn active_call_for_visitor(&self, visitor_id: &VisitorId) -> Option<ActiveCall> {
        self.state.lock().calls.call_for_visitor(visitor_id).cloned()
    }

    pub fn active_call_for_agent(&self, agent_id: &AgentId) -> Option<ActiveCall> {
        self.state.lock().calls.call_for_agent(agent_id).cloned()
    }
}
