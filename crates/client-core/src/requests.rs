use std::collections::HashMap;

use thiserror::Error;

use crate::types::{ConnectionRequest, RequestStatus, ReviewDecision};

/// Errors raised when a review cannot be applied to the local projection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestTransitionError {
    #[error("connection request '{0}' is not in the received list")]
    Unknown(String),
    #[error("connection request '{id}' cannot move from {from} to {to}")]
    Forbidden {
        id: String,
        from: RequestStatus,
        to: RequestStatus,
    },
}

/// Client projection of the requests the signed-in user received.
///
/// Accepted requests stay listed with their new status; rejected ones leave
/// the list. Resolutions are remembered so a stale server snapshot cannot
/// move a request back to `interested` or bring a rejected one back.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    received: Vec<ConnectionRequest>,
    resolved: HashMap<String, RequestStatus>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> &[ConnectionRequest] {
        &self.received
    }

    pub fn get(&self, request_id: &str) -> Option<&ConnectionRequest> {
        self.received.iter().find(|request| request.id == request_id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &ConnectionRequest> {
        self.received
            .iter()
            .filter(|request| request.status == RequestStatus::Interested)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    /// Replace the list with a server snapshot.
    pub fn reconcile(&mut self, snapshot: Vec<ConnectionRequest>) {
        self.received = snapshot
            .into_iter()
            .filter_map(|mut request| {
                if let Some(&known) = self.resolved.get(&request.id) {
                    request.status = known;
                } else if request.status.is_terminal() {
                    self.resolved.insert(request.id.clone(), request.status);
                }
                (request.status != RequestStatus::Rejected).then_some(request)
            })
            .collect();
    }

    /// Check that `decision` is a legal move for `request_id` without applying it.
    pub fn check_review(
        &self,
        request_id: &str,
        decision: ReviewDecision,
    ) -> Result<(), RequestTransitionError> {
        let request = self
            .get(request_id)
            .ok_or_else(|| RequestTransitionError::Unknown(request_id.to_owned()))?;
        let next = decision.status();
        if !request.status.can_transition_to(next) {
            return Err(RequestTransitionError::Forbidden {
                id: request_id.to_owned(),
                from: request.status,
                to: next,
            });
        }
        Ok(())
    }

    /// Apply a review the API confirmed.
    pub fn apply_review(
        &mut self,
        request_id: &str,
        decision: ReviewDecision,
    ) -> Result<RequestStatus, RequestTransitionError> {
        self.check_review(request_id, decision)?;
        let next = decision.status();
        self.resolved.insert(request_id.to_owned(), next);

        match decision {
            ReviewDecision::Accept => {
                if let Some(request) = self
                    .received
                    .iter_mut()
                    .find(|request| request.id == request_id)
                {
                    request.status = next;
                }
            }
            ReviewDecision::Reject => self.received.retain(|request| request.id != request_id),
        }
        Ok(next)
    }

    pub fn clear(&mut self) {
        self.received.clear();
        self.resolved.clear();
    }
}
