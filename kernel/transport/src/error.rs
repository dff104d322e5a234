//! Transport layer error taxonomy.
//!
//! Every fallible operation in this crate returns [`NetResult`]. The socket
//! glue converts a [`NetError`] into the errno surfaced by the failing
//! system call via [`NetError::to_errno`].

use std::collections::TryReserveError;

use thiserror::Error;

/// Result alias used throughout the transport runtime.
pub type NetResult<T> = Result<T, NetError>;

/// Transport layer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum NetError {
    /// A (port) or (local, peer) registration already exists, or no
    /// ephemeral port could be found.
    #[error("address already in use")]
    AddressInUse,
    /// Privileged port without privilege, or a bind behind a wildcard bind.
    #[error("permission denied")]
    PermissionDenied,
    /// Enqueue would exceed the queue's byte budget.
    #[error("no buffer space available")]
    OutOfBuffers,
    /// Allocation of an internal node failed.
    #[error("out of memory")]
    OutOfMemory,
    /// Non-blocking consumer found an empty queue.
    #[error("operation would block")]
    WouldBlock,
    /// Blocking consumer's deadline elapsed with no data.
    #[error("operation timed out")]
    TimedOut,
    /// Blocking consumer was interrupted before data arrived.
    #[error("interrupted")]
    Interrupted,
    /// Endpoint or connection could not be located.
    #[error("not found")]
    NotFound,
    /// Connection was reset by the peer while waiting.
    #[error("connection reset")]
    ConnectionReset,
    /// Queue was closed by its owner.
    #[error("queue closed")]
    Closed,
    /// Stale endpoint handle or invalid state for the request.
    #[error("invalid argument")]
    InvalidArgument,
    /// The address family rejected a non-local address.
    #[error("address not available")]
    AddressNotAvailable,
    /// The timer engine has been shut down.
    #[error("timer engine shut down")]
    Shutdown,
}

impl NetError {
    /// Convert to the negative errno value returned to user space.
    pub fn to_errno(&self) -> i32 {
        match self {
            NetError::AddressInUse => -98,        // EADDRINUSE
            NetError::PermissionDenied => -13,    // EACCES
            NetError::OutOfBuffers => -105,       // ENOBUFS
            NetError::OutOfMemory => -12,         // ENOMEM
            NetError::WouldBlock => -11,          // EAGAIN
            NetError::TimedOut => -110,           // ETIMEDOUT
            NetError::Interrupted => -4,          // EINTR
            NetError::NotFound => -2,             // ENOENT
            NetError::ConnectionReset => -104,    // ECONNRESET
            NetError::Closed => -32,              // EPIPE
            NetError::InvalidArgument => -22,     // EINVAL
            NetError::AddressNotAvailable => -99, // EADDRNOTAVAIL
            NetError::Shutdown => -108,           // ESHUTDOWN
        }
    }
}

impl From<TryReserveError> for NetError {
    fn from(_: TryReserveError) -> Self {
        NetError::OutOfMemory
    }
}
