//!
//! groupgate session store
//! -----------------------
//! Key-value persistence for session records, addressed by opaque token. The
//! decision service and login path depend only on the `SessionStore` contract;
//! the bundled implementation is an in-process map with optional snapshot
//! persistence. A missing token is the anonymous case and is not an error —
//! only infrastructure failure surfaces as `StoreError`.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

use crate::session::SessionRecord;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

pub trait SessionStore: Send + Sync {
    /// Persist a new session record. Failure propagates; login must fail
    /// visibly when the session cannot be recorded.
    fn put(&self, token: &str, record: SessionRecord) -> Result<(), StoreError>;

    /// Fetch a session record. `Ok(None)` means the token is unknown.
    fn get(&self, token: &str) -> Result<Option<SessionRecord>, StoreError>;
}
