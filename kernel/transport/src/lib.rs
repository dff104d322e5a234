//! Zero-OS Transport Runtime
//!
//! The protocol-independent core shared by the TCP and UDP socket layers:
//! - Endpoint demultiplexing: port reuse chains, connection lookup with
//!   wildcard fallback and ephemeral port allocation
//! - Byte-budgeted buffer queues between the receive path and blocking
//!   `recv()` callers
//! - One shared timer engine for retransmission, keep-alive and connection
//!   timeouts
//! - Reset replies for segments that reach no endpoint
//!
//! # Example
//!
//! ```ignore
//! let stack = TransportStack::start(TransportConfig::default())?;
//! let inet = stack.inet();
//!
//! let listener = inet.create_endpoint(EndpointOptions::empty())?;
//! inet.bind(listener, SockAddrIn::new(Ipv4Addr::UNSPECIFIED, 8080), false)?;
//! inet.set_passive(listener)?;
//!
//! // Receive path
//! match inet.find_connection(local, peer) {
//!     Some(id) => sockets[id].rx.enqueue(buf)?,
//!     None => { inet.reply_with_reset(&segment, &output)?; }
//! }
//! ```

pub mod addr;
pub mod buffer;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fifo;
pub mod manager;
mod port_alloc;
pub mod reset;
pub mod stack;
mod table;
pub mod timer;
pub mod wait;

pub use addr::{AddressModule, SockAddrIn, SockAddrIn6, IPPROTO_TCP};
pub use buffer::{BufferFlags, NetBuffer};
pub use config::{
    TransportConfig, DEFAULT_FIFO_BYTES, EPHEMERAL_PORT_END, EPHEMERAL_PORT_START,
    PRIVILEGED_PORT_LIMIT,
};
pub use endpoint::{Endpoint, EndpointId, EndpointOptions};
pub use error::{NetError, NetResult};
pub use fifo::{BufferQueue, Delivery, FifoStats, ReadNotifier};
pub use manager::{AnyLocalAddress, EndpointInfo, EndpointManager, InterfaceBinder, ManagerStats};
pub use reset::{
    reset_for, tcp_checksum, ResetSegment, SegmentHeader, SegmentInfo, SegmentSender, TcpFlags,
    TCP_HEADER_LEN,
};
pub use stack::TransportStack;
pub use timer::{Timer, TimerEngine, TimerHandle};
pub use wait::{InterruptToken, RecvFlags, Timeout, WaitContext, INFINITE_TIMEOUT_US};
