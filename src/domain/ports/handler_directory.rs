//! Candidate handler pool port.

use crate::domain::models::Handler;

/// Read-only snapshot of the moderator/admin pool.
///
/// Listing is synchronous: the pool is maintained in memory by the
/// user-management collaborator and a run takes one snapshot per execution.
/// Iteration order must be stable so assignment stays deterministic.
pub trait HandlerDirectory: Send + Sync {
    fn list_candidates(&self) -> Vec<Handler>;
}
