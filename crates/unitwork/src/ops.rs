//! Method combinators for business operations.
//!
//! Two wrappers, composable and independent:
//!
//! - [`transactional`] runs an operation inside [`SessionRunner`]'s atomic
//!   boundary and injects the session into the operation's [`OpContext`].
//! - [`classify`] normalizes raw failures into [`DomainError`]s while
//!   letting already-classified ones pass through untouched.
//!
//! When both are applied, `classify` sits closer to the operation, so a
//! classified error still travels the runner's abort path.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::OpResult;
use crate::error::{DomainError, OpError};
use crate::runner::SessionRunner;
use crate::session::SessionBackend;

/// Trailing options carried by every business operation call.
///
/// This replaces the convention of hiding a session inside an untyped
/// last argument: the session slot is an explicit field, and a wrapper
/// that injects one always builds a fresh copy. The caller's context is
/// never mutated, so a context reused across calls stays session-free.
#[derive(Debug)]
pub struct OpContext<'s, S> {
    /// Session the operation must perform its storage calls through.
    pub session: Option<&'s S>,
    /// Pass-through correlation id, untouched by the wrappers.
    pub request_id: Option<Uuid>,
}

// Contexts only borrow the session, so they are copyable for any `S`.
impl<S> Clone for OpContext<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for OpContext<'_, S> {}

impl<S> Default for OpContext<'_, S> {
    fn default() -> Self {
        Self {
            session: None,
            request_id: None,
        }
    }
}

impl<'s, S> OpContext<'s, S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: &'s S) -> Self {
        Self {
            session: Some(session),
            request_id: None,
        }
    }

    #[must_use]
    pub fn request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

}

/// An asynchronous business operation over sessions of type `S`.
///
/// Implementors perform their storage reads and writes through
/// `ctx.session`; whether a session is present depends on how the call
/// was wrapped.
#[async_trait]
pub trait Operation<S: Send + Sync>: Send + Sync {
    type Args: Send + 'static;
    type Output: Send + 'static;

    async fn call(&self, args: Self::Args, ctx: OpContext<'_, S>) -> OpResult<Self::Output>;
}

/// Wrap `op` so every call runs inside one atomic session.
pub fn transactional<B, Op>(runner: SessionRunner<B>, op: Op) -> Transactional<B, Op>
where
    B: SessionBackend,
    Op: Operation<B::Session>,
{
    Transactional {
        runner,
        op: Arc::new(op),
    }
}

/// The transaction wrapper returned by [`transactional`].
///
/// Calls arriving without a session get a fresh one via
/// [`SessionRunner::execute_single`]: commit on `Ok`, abort on `Err`,
/// release always. Calls that already carry a session are forwarded
/// unchanged, so nested wrapped operations join the outer transaction
/// instead of opening a second one.
pub struct Transactional<B: SessionBackend, Op> {
    runner: SessionRunner<B>,
    op: Arc<Op>,
}

impl<B: SessionBackend, Op> Clone for Transactional<B, Op> {
    fn clone(&self) -> Self {
        Self {
            runner: self.runner.clone(),
            op: Arc::clone(&self.op),
        }
    }
}

#[async_trait]
impl<B, Op> Operation<B::Session> for Transactional<B, Op>
where
    B: SessionBackend + 'static,
    Op: Operation<B::Session> + 'static,
{
    type Args = Op::Args;
    type Output = Op::Output;

    async fn call(
        &self,
        args: Self::Args,
        ctx: OpContext<'_, B::Session>,
    ) -> OpResult<Self::Output> {
        // An already-present session is never overwritten.
        if ctx.session.is_some() {
            return self.op.call(args, ctx).await;
        }

        let op = Arc::clone(&self.op);
        let request_id = ctx.request_id;
        self.runner
            .execute_single(move |session| {
                Box::pin(async move {
                    // Fresh copy of the caller's context, session filled in.
                    let injected = OpContext {
                        session: Some(session),
                        request_id,
                    };
                    op.call(args, injected).await
                })
            })
            .await
    }
}

/// Wrap `op` so every failure reaching the caller is a [`DomainError`].
pub fn classify<Op>(op: Op, default_message: impl Into<String>) -> Classified<Op> {
    Classified {
        op,
        default_message: default_message.into(),
    }
}

/// The error classification wrapper returned by [`classify`].
///
/// Successes and already-classified [`OpError::Domain`] failures pass
/// through byte-for-byte. Any other failure becomes a server-fault
/// [`DomainError`] with message `"<default>: <detail>"`.
pub struct Classified<Op> {
    op: Op,
    default_message: String,
}

#[async_trait]
impl<S, Op> Operation<S> for Classified<Op>
where
    S: Send + Sync + 'static,
    Op: Operation<S>,
{
    type Args = Op::Args;
    type Output = Op::Output;

    async fn call(&self, args: Self::Args, ctx: OpContext<'_, S>) -> OpResult<Self::Output> {
        match self.op.call(args, ctx).await {
            Ok(value) => Ok(value),
            Err(OpError::Domain(err)) => Err(OpError::Domain(err)),
            Err(raw) => Err(OpError::Domain(DomainError::server_fault(wrap_message(
                &self.default_message,
                &raw.to_string(),
            )))),
        }
    }
}

fn wrap_message(default_message: &str, detail: &str) -> String {
    let detail = if detail.is_empty() {
        "Unknown error"
    } else {
        detail
    };
    format!("{default_message}: {detail}")
}
