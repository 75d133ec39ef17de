//! In-memory substitute backend.
//!
//! A string-keyed map with per-session staged writes: nothing touches the
//! shared map until `commit`, which applies the whole stage under one
//! lock. This is the backend the runner and wrapper tests run against,
//! and a reference for what the [`SessionBackend`] contract means.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::OpResult;
use crate::error::OpError;
use crate::session::SessionBackend;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
enum StagedWrite {
    Put(String, String),
    Delete(String),
}

#[derive(Debug, Default)]
struct SessionState {
    staged: Vec<StagedWrite>,
    settled: bool,
}

/// A session against [`MemoryBackend`]; writes are staged until commit.
#[derive(Debug)]
pub struct MemorySession {
    data: Arc<Mutex<BTreeMap<String, String>>>,
    state: Mutex<SessionState>,
}

impl MemorySession {
    /// Stage a write; visible to `get` through this session only.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> OpResult<()> {
        let mut state = lock(&self.state);
        ensure_open(&state)?;
        state.staged.push(StagedWrite::Put(key.into(), value.into()));
        Ok(())
    }

    /// Stage a delete.
    pub fn delete(&self, key: impl Into<String>) -> OpResult<()> {
        let mut state = lock(&self.state);
        ensure_open(&state)?;
        state.staged.push(StagedWrite::Delete(key.into()));
        Ok(())
    }

    /// Read through the stage first, then the committed map.
    pub fn get(&self, key: &str) -> OpResult<Option<String>> {
        let state = lock(&self.state);
        ensure_open(&state)?;
        for write in state.staged.iter().rev() {
            match write {
                StagedWrite::Put(k, v) if k == key => return Ok(Some(v.clone())),
                StagedWrite::Delete(k) if k == key => return Ok(None),
                _ => {}
            }
        }
        Ok(lock(&self.data).get(key).cloned())
    }
}

fn ensure_open(state: &SessionState) -> OpResult<()> {
    if state.settled {
        return Err(OpError::Session("session already settled".to_string()));
    }
    Ok(())
}

/// Transactional in-memory key/value store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed value for `key`; staged writes of open sessions are not
    /// observable here.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.data).get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.data).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.data).is_empty()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    type Session = MemorySession;

    async fn open(&self) -> OpResult<MemorySession> {
        Ok(MemorySession {
            data: Arc::clone(&self.data),
            state: Mutex::new(SessionState::default()),
        })
    }

    async fn commit(&self, session: &mut MemorySession) -> OpResult<()> {
        let mut state = lock(&session.state);
        ensure_open(&state)?;
        state.settled = true;

        let mut data = lock(&self.data);
        for write in state.staged.drain(..) {
            match write {
                StagedWrite::Put(key, value) => {
                    data.insert(key, value);
                }
                StagedWrite::Delete(key) => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn abort(&self, session: &mut MemorySession) -> OpResult<()> {
        let mut state = lock(&session.state);
        ensure_open(&state)?;
        state.settled = true;
        state.staged.clear();
        Ok(())
    }

    async fn end(&self, session: MemorySession) -> OpResult<()> {
        // An unsettled stage dies with the session.
        drop(session);
        Ok(())
    }
}
