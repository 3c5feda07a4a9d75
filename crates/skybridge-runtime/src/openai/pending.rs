//! In-flight request tracking for one connection.
//!
//! Entries are keyed by a connection-local ticket rather than the guest's id:
//! the id space belongs to the guest and may contain duplicates, and each
//! inbound request must be answered independently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use skybridge_core::{RequestId, RequestMethod};
use tokio_util::sync::CancellationToken;

/// One request awaiting its response.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub(crate) id: RequestId,
    pub(crate) method: RequestMethod,
    pub(crate) cancel: CancellationToken,
}

/// Connection-local ticket for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Ticket(u64);

#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    next: AtomicU64,
    entries: Mutex<HashMap<Ticket, PendingRequest>>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track a new request.
    pub(crate) fn insert(&self, id: RequestId, method: RequestMethod) -> (Ticket, CancellationToken) {
        let ticket = Ticket(self.next.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                ticket,
                PendingRequest {
                    id,
                    method,
                    cancel: cancel.clone(),
                },
            );
        (ticket, cancel)
    }

    /// Claim the right to answer `ticket`.
    ///
    /// Returns `false` if the request was already answered or drained.
    pub(crate) fn complete(&self, ticket: Ticket) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ticket)
            .is_some()
    }

    /// Remove and return every pending request.
    pub(crate) fn drain(&self) -> Vec<PendingRequest> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, request)| request)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
