//! The module contains the errors the framework can raise.
//!
//! The split that matters is [`OpError::Domain`] versus everything else:
//! a `Domain` error has already been classified by the application and is
//! passed through untouched, while the remaining variants are raw failures
//! that [`classify`] normalizes before they reach a caller.
//!
//! [`classify`]: crate::ops::classify

use sea_orm::DbErr;
use thiserror::Error;

/// Fault attribution carried by a classified error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// The caller supplied something invalid.
    ClientFault,
    /// The operation itself failed; nothing the caller can fix.
    ServerFault,
}

/// An application-level error that has already been classified.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DomainError {
    pub message: String,
    pub severity: Severity,
}

impl DomainError {
    #[must_use]
    pub fn server_fault(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::ServerFault,
        }
    }

    #[must_use]
    pub fn client_fault(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::ClientFault,
        }
    }
}

/// Framework custom errors.
#[derive(Error, Debug)]
pub enum OpError {
    /// Already classified; wrappers and the runner never rewrap this.
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Database(#[from] DbErr),
    /// Session lifecycle misuse or a failure in a non-SQL backend.
    #[error("session error: {0}")]
    Session(String),
    /// A failure an operation raised that has not been classified yet.
    #[error("{0}")]
    Raw(String),
}

impl PartialEq for OpError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Domain(a), Self::Domain(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Session(a), Self::Session(b)) => a == b,
            (Self::Raw(a), Self::Raw(b)) => a == b,
            _ => false,
        }
    }
}
