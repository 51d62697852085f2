use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{ActiveCall, CallRequest};
use crate::ids::{AgentId, CallId, OrganizationId, RequestId, VisitorId};

/// Pending requests and live calls
///
/// Pure bookkeeping; visitor and agent state transitions are applied by the
/// engine around these calls.
#[derive(Debug, Default)]
pub struct CallBook {
    pending: HashMap<RequestId, CallRequest>,
    active: HashMap<CallId, ActiveCall>,
    next_sequence: u64,
}

impl CallBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_request(
        &mut self,
        request_id: RequestId,
        visitor_id: VisitorId,
        agent_id: AgentId,
        organization_id: OrganizationId,
        page_url: String,
    ) -> CallRequest {
        self.next_sequence += 1;
        let request = CallRequest {
            request_id: request_id.clone(),
            visitor_id,
            agent_id,
            organization_id,
            page_url,
            requested_at: Utc::now(),
            sequence: self.next_sequence,
        };
        self.pending.insert(request_id, request.clone());
        request
    }

    pub fn request(&self, request_id: &RequestId) -> Option<&CallRequest> {
        self.pending.get(request_id)
    }

    pub fn take_request(&mut self, request_id: &RequestId) -> Option<CallRequest> {
        self.pending.remove(request_id)
    }

    /// Drop every pending request from a visitor
    pub fn drop_requests_from(&mut self, visitor_id: &VisitorId) -> Vec<CallRequest> {
        let ids: Vec<RequestId> = self
            .pending
            .values()
            .filter(|r| &r.visitor_id == visitor_id)
            .map(|r| r.request_id.clone())
            .collect();
        ids.iter().filter_map(|id| self.pending.remove(id)).collect()
    }

    /// Pending requests for an agent, oldest first
    pub fn waiting_for(&self, agent_id: &AgentId) -> Vec<CallRequest> {
        let mut requests: Vec<CallRequest> = self
            .pending
            .values()
            .filter(|r| &r.agent_id == agent_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.sequence);
        requests
    }

    pub fn next_waiting(&self, agent_id: &AgentId) -> Option<CallRequest> {
        self.pending
            .values()
            .filter(|r| &r.agent_id == agent_id)
            .min_by_key(|r| r.sequence)
            .cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn start_call(
        &mut self,
        call_id: CallId,
        visitor_id: VisitorId,
        agent_id: AgentId,
        started_at: DateTime<Utc>,
    ) -> ActiveCall {
        let call = ActiveCall {
            call_id: call_id.clone(),
            visitor_id,
            agent_id,
            started_at,
            ended_at: None,
        };
        self.active.insert(call_id, call.clone());
        call
    }

    /// Remove a call, stamping its end time
    pub fn finish(&mut self, call_id: &CallId) -> Option<ActiveCall> {
        let mut call = self.active.remove(call_id)?;
        call.ended_at = Some(Utc::now());
        Some(call)
    }

    /// Remove a call without stamping it (it is being replaced)
    pub fn discard(&mut self, call_id: &CallId) -> Option<ActiveCall> {
        self.active.remove(call_id)
    }

    pub fn call(&self, call_id: &CallId) -> Option<&ActiveCall> {
        self.active.get(call_id)
    }

    pub fn call_for_visitor(&self, visitor_id: &VisitorId) -> Option<&ActiveCall> {
        self.active.values().find(|c| &c.visitor_id == visitor_id)
    }

    pub fn call_for_agent(&self, agent_id: &AgentId) -> Option<&ActiveCall> {
        self.active.values().find(|c| &c.agent_id == agent_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
