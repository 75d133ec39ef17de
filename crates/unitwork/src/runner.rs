//! Session lifecycle management.
//!
//! [`SessionRunner`] owns the open → run → commit/abort → end sequence for
//! a unit of work. Units never touch commit or release themselves; they
//! receive a borrowed session handle and report success or failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use uuid::Uuid;

use crate::OpResult;
use crate::session::SessionBackend;

/// Future returned by a unit of work, borrowing the session it runs under.
pub type UnitFuture<'s, T> = Pin<Box<dyn Future<Output = OpResult<T>> + Send + 's>>;

/// A caller-supplied unit of work for [`SessionRunner::execute_batch`].
pub type UnitOfWork<S, T> = Box<dyn for<'s> FnOnce(&'s S) -> UnitFuture<'s, T> + Send>;

/// Runs units of work inside the backend's atomic commit boundary.
///
/// Every invocation opens exactly one session and releases it exactly once,
/// on every exit path: normal completion, unit failure, or a failing
/// commit. Release is `end`'s consumption of the handle, so a skipped
/// release cannot compile.
pub struct SessionRunner<B: SessionBackend> {
    backend: Arc<B>,
}

impl<B: SessionBackend> Clone for SessionRunner<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: SessionBackend> SessionRunner<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one unit of work atomically.
    ///
    /// Commits when the unit returns `Ok`, aborts when it returns `Err`;
    /// the unit's failure is re-raised unchanged. The session is released
    /// afterwards in both cases, and also when the commit itself fails.
    pub async fn execute_single<T, F>(&self, unit: F) -> OpResult<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s B::Session) -> UnitFuture<'s, T> + Send,
    {
        let call_id = Uuid::new_v4();
        let mut session = self.backend.open().await?;
        tracing::debug!(%call_id, "session opened");

        let outcome = unit(&session).await;
        let outcome = self.settle(call_id, &mut session, outcome).await;
        self.release(call_id, session, outcome).await
    }

    /// Run an ordered sequence of units of work under one shared session.
    ///
    /// Units execute strictly in input order, never overlapping. The first
    /// failure aborts the whole batch; units that already ran are not
    /// committed separately. On success the results preserve input order.
    pub async fn execute_batch<T>(&self, units: Vec<UnitOfWork<B::Session, T>>) -> OpResult<Vec<T>>
    where
        T: Send + 'static,
    {
        let call_id = Uuid::new_v4();
        let mut session = self.backend.open().await?;
        tracing::debug!(%call_id, units = units.len(), "session opened for batch");

        let mut results = Vec::with_capacity(units.len());
        let mut failure = None;
        for unit in units {
            match unit(&session).await {
                Ok(value) => results.push(value),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let outcome = match failure {
            None => Ok(results),
            Some(err) => Err(err),
        };
        let outcome = self.settle(call_id, &mut session, outcome).await;
        self.release(call_id, session, outcome).await
    }

    /// Commit on success, abort on failure. An abort failure is logged
    /// only; the unit's original error is what surfaces.
    async fn settle<T>(
        &self,
        call_id: Uuid,
        session: &mut B::Session,
        outcome: OpResult<T>,
    ) -> OpResult<T> {
        match outcome {
            Ok(value) => {
                self.backend.commit(session).await?;
                tracing::debug!(%call_id, "session committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = self.backend.abort(session).await {
                    tracing::error!(%call_id, "failed to abort session: {abort_err}");
                }
                Err(err)
            }
        }
    }

    /// Release the session unconditionally. A release failure surfaces
    /// only when nothing failed before it; it never masks an earlier
    /// failure.
    async fn release<T>(
        &self,
        call_id: Uuid,
        session: B::Session,
        outcome: OpResult<T>,
    ) -> OpResult<T> {
        match self.backend.end(session).await {
            Ok(()) => outcome,
            Err(end_err) => match outcome {
                Ok(_) => Err(end_err),
                Err(err) => {
                    tracing::error!(%call_id, "failed to release session: {end_err}");
                    Err(err)
                }
            },
        }
    }
}

impl<B: SessionBackend> std::fmt::Debug for SessionRunner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner").finish_non_exhaustive()
    }
}
