use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::rpc::RpcClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// `init` called while connecting or connected.
    AlreadyInitialized,
    /// Operation needs a ready session.
    NotReady,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::AlreadyInitialized => f.write_str("NearAlreadyInited"),
            SessionError::NotReady => f.write_str("NearNotReady"),
        }
    }
}

impl std::error::Error for SessionError {}

enum Inner {
    Uninitialized,
    Connecting,
    Ready(RpcClient),
}

/// Connection context shared by the bridge operations.
///
/// `Uninitialized -> Connecting -> Ready`; a failed connect goes back to
/// `Uninitialized` so the host may retry.
pub struct Session {
    inner: Mutex<Inner>,
    account_id: Option<String>,
}

impl Session {
    pub fn new(account_id: Option<String>) -> Self {
        Self {
            inner: Mutex::new(Inner::Uninitialized),
            account_id,
        }
    }

    pub fn state(&self) -> SessionState {
        match &*self.lock() {
            Inner::Uninitialized => SessionState::Uninitialized,
            Inner::Connecting => SessionState::Connecting,
            Inner::Ready(_) => SessionState::Ready,
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn begin_connect(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match *inner {
            Inner::Uninitialized => {
                *inner = Inner::Connecting;
                Ok(())
            }
            _ => Err(SessionError::AlreadyInitialized),
        }
    }

    pub fn finish_connect(&self, client: RpcClient) {
        *self.lock() = Inner::Ready(client);
    }

    pub fn fail_connect(&self) {
        *self.lock() = Inner::Uninitialized;
    }

    /// Client of a ready session.
    pub fn client(&self) -> Result<RpcClient, SessionError> {
        match &*self.lock() {
            Inner::Ready(client) => Ok(client.clone()),
            _ => Err(SessionError::NotReady),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
