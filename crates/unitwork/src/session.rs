//! The session boundary between the runner and a transactional store.
//!
//! A session ties a sequence of storage operations to one atomic commit
//! boundary. The backend is an explicit, passed-in dependency so the
//! lifecycle manager can run against a substitute store in tests.

use async_trait::async_trait;

use crate::OpResult;

/// A transactional storage backend that can hand out session handles.
///
/// One handle belongs to exactly one [`SessionRunner`] invocation and is
/// never shared across concurrent invocations. `end` consumes the handle,
/// so a released session cannot be touched again.
///
/// Contract:
/// - `commit` makes every write staged through the session observable,
///   atomically; `abort` discards them all.
/// - After `commit` or `abort` the handle is settled; `end` only releases
///   whatever the backend still holds for it. Ending an unsettled session
///   must discard its writes.
/// - The backend owns any retry of transient commit contention; the runner
///   propagates whatever `commit` reports.
///
/// [`SessionRunner`]: crate::runner::SessionRunner
#[async_trait]
pub trait SessionBackend: Send + Sync {
    type Session: Send + Sync;

    async fn open(&self) -> OpResult<Self::Session>;

    async fn commit(&self, session: &mut Self::Session) -> OpResult<()>;

    async fn abort(&self, session: &mut Self::Session) -> OpResult<()>;

    async fn end(&self, session: Self::Session) -> OpResult<()>;
}
