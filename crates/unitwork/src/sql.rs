//! sea-orm backed sessions.
//!
//! [`SqlBackend`] maps the session lifecycle onto a database transaction:
//! open begins one, commit/abort settle it, and `end` drops whatever is
//! left, which rolls back an unsettled transaction.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::OpResult;
use crate::error::OpError;
use crate::session::SessionBackend;

/// Session backend over a [`DatabaseConnection`].
#[derive(Debug, Clone)]
pub struct SqlBackend {
    database: DatabaseConnection,
}

impl SqlBackend {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }
}

/// One open database transaction.
pub struct SqlSession {
    txn: Option<DatabaseTransaction>,
}

impl SqlSession {
    /// Connection for the unit of work's statements.
    ///
    /// Fails once the session is settled; the runner only hands out
    /// sessions before commit/abort, so business code will not see that.
    pub fn connection(&self) -> OpResult<&DatabaseTransaction> {
        self.txn
            .as_ref()
            .ok_or_else(|| OpError::Session("session already settled".to_string()))
    }
}

impl std::fmt::Debug for SqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSession")
            .field("settled", &self.txn.is_none())
            .finish()
    }
}

#[async_trait]
impl SessionBackend for SqlBackend {
    type Session = SqlSession;

    async fn open(&self) -> OpResult<SqlSession> {
        Ok(SqlSession {
            txn: Some(self.database.begin().await?),
        })
    }

    async fn commit(&self, session: &mut SqlSession) -> OpResult<()> {
        match session.txn.take() {
            Some(txn) => Ok(txn.commit().await?),
            None => Err(OpError::Session("session already settled".to_string())),
        }
    }

    async fn abort(&self, session: &mut SqlSession) -> OpResult<()> {
        match session.txn.take() {
            Some(txn) => Ok(txn.rollback().await?),
            None => Err(OpError::Session("session already settled".to_string())),
        }
    }

    async fn end(&self, session: SqlSession) -> OpResult<()> {
        // Dropping an unsettled transaction rolls it back.
        drop(session);
        Ok(())
    }
}
