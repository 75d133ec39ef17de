//! Atomic unit-of-work execution over transactional session backends.
//!
//! The pieces, from the bottom up:
//!
//! - [`SessionBackend`] — the storage boundary handing out session handles.
//! - [`SessionRunner`] — opens a session, runs one unit of work (or an
//!   ordered batch under a shared session), commits or aborts, and always
//!   releases the handle.
//! - [`transactional`] / [`classify`] — combinators wrapping a business
//!   [`Operation`]: the first injects a session into the call's
//!   [`OpContext`], the second normalizes raw failures into
//!   [`DomainError`]s.
//!
//! Backends included: [`SqlBackend`] over sea-orm and the in-memory
//! [`MemoryBackend`] for tests and substitutes.

pub use error::{DomainError, OpError, Severity};
pub use memory::{MemoryBackend, MemorySession};
pub use ops::{Classified, OpContext, Operation, Transactional, classify, transactional};
pub use runner::{SessionRunner, UnitFuture, UnitOfWork};
pub use session::SessionBackend;
pub use sql::{SqlBackend, SqlSession};

mod error;
mod memory;
mod ops;
mod runner;
mod session;
mod sql;

pub type OpResult<T> = Result<T, OpError>;
