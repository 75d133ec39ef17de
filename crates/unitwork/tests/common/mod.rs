//! Shared test backend: delegates to `MemoryBackend`, counts lifecycle
//! calls, and can be told to fail commit or release.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use unitwork::{MemoryBackend, MemorySession, OpError, OpResult, SessionBackend};

#[derive(Default)]
pub struct CountingBackend {
    pub inner: MemoryBackend,
    pub opened: AtomicUsize,
    pub committed: AtomicUsize,
    pub aborted: AtomicUsize,
    pub ended: AtomicUsize,
    pub fail_commit: AtomicBool,
    pub fail_end: AtomicBool,
}

#[async_trait]
impl SessionBackend for CountingBackend {
    type Session = MemorySession;

    async fn open(&self) -> OpResult<MemorySession> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.open().await
    }

    async fn commit(&self, session: &mut MemorySession) -> OpResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(OpError::Session("commit failed".to_string()));
        }
        self.committed.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(session).await
    }

    async fn abort(&self, session: &mut MemorySession) -> OpResult<()> {
        self.aborted.fetch_add(1, Ordering::SeqCst);
        self.inner.abort(session).await
    }

    async fn end(&self, session: MemorySession) -> OpResult<()> {
        self.ended.fetch_add(1, Ordering::SeqCst);
        self.inner.end(session).await?;
        if self.fail_end.load(Ordering::SeqCst) {
            return Err(OpError::Session("release failed".to_string()));
        }
        Ok(())
    }
}
