//! Session persistence on top of a [`CacheClient`](crate::cache::CacheClient).

mod key;
pub use key::KeyCodec;

mod options;
pub use options::*;

mod session_store;
pub use session_store::SessionStore;

/// Failures reported by a [`SessionStore`].
///
/// Cache-level errors never cross this boundary; callers only ever see one of
/// these two kinds.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The session does not exist, or has expired.
    #[error("session not found")]
    SessionNotFound,

    /// Any other failure: connectivity, a lost optimistic transaction, a
    /// timeout, or a protocol error.
    #[error("unexpected session store error")]
    Unexpected,
}

pub type Result<T> = std::result::Result<T, Error>;
