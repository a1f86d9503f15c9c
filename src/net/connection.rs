//! Session identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Count live sessions for the heartbeat and for graceful shutdown
//! - Enforce the max_sessions limit before an upgrade is accepted

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::observability::metrics;

/// Unique identifier for a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0.simple())
    }
}

/// Tracks live sessions and caps how many may run at once.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    /// Current count of live sessions.
    active_count: Arc<AtomicU64>,
    /// One permit per allowed session.
    limit: Arc<Semaphore>,
}

impl SessionTracker {
    /// Create a tracker allowing `max_sessions` concurrent sessions.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            active_count: Arc::new(AtomicU64::new(0)),
            limit: Arc::new(Semaphore::new(max_sessions)),
        }
    }

    /// Reserve a slot for a new session, or `None` when the limit is reached.
    /// The returned guard releases the slot when dropped.
    pub fn try_track(&self) -> Option<SessionGuard> {
        let permit = Arc::clone(&self.limit).try_acquire_owned().ok()?;
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_session_opened();
        Some(SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
            _permit: permit,
        })
    }

    /// Get current live session count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every session has finished or the timeout elapses.
    /// Returns `true` when drained.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let drained = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}

/// Guard that tracks a session's lifetime.
/// Decrements the live count and frees the slot when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    /// Get this session's ID.
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_session_released();
        tracing::trace!(session_id = %self.id, "Session slot released");
    }
}
