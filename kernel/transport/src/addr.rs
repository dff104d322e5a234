//! Protocol-domain address modules.
//!
//! The endpoint tables never look inside an address. Hashing, equality,
//! wildcard tests and formatting all go through [`AddressModule`], so the
//! same table code serves IPv4 and IPv6 endpoints.
//!
//! Ports are stored in host byte order; conversion to wire order happens
//! only when a segment header is serialized.

use core::fmt;
use core::hash::Hash;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

/// TCP protocol number, used in checksum pseudo headers.
pub const IPPROTO_TCP: u8 = 6;

/// Address operations for one protocol domain.
///
/// An address is the pair (host address, port). The "wildcard" address is
/// the unspecified host address; the wildcard port is 0.
pub trait AddressModule:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Domain name for diagnostics ("inet", "inet6").
    const FAMILY: &'static str;

    /// Unspecified host address with port 0.
    fn any() -> Self;

    /// Port in host byte order.
    fn port(&self) -> u16;

    fn set_port(&mut self, port: u16);

    /// True if the host part is the unspecified address. The port is ignored.
    fn is_any_address(&self) -> bool;

    /// Compare host parts only.
    fn same_address(&self, other: &Self) -> bool;

    /// One's-complement partial sum of the transport checksum pseudo header.
    ///
    /// The result is not folded; callers add the segment sum and fold.
    fn pseudo_header_sum(src: &Self, dst: &Self, protocol: u8, length: u32) -> u32;

    /// Copy of `self` with the port replaced.
    fn with_port(mut self, port: u16) -> Self {
        self.set_port(port);
        self
    }

    /// Wildcard host and wildcard port.
    fn is_empty(&self) -> bool {
        self.is_any_address() && self.port() == 0
    }
}

/// Add big-endian 16-bit words of `data` to `sum` without folding.
pub(crate) fn sum_words(data: &[u8], mut sum: u32) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    sum
}

// ============================================================================
// IPv4
// ============================================================================

/// IPv4 socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SockAddrIn {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl SockAddrIn {
    pub const fn new(addr: Ipv4Addr, port: u16) -> Self {
        SockAddrIn { addr, port }
    }
}

impl From<SocketAddrV4> for SockAddrIn {
    fn from(sa: SocketAddrV4) -> Self {
        SockAddrIn::new(*sa.ip(), sa.port())
    }
}

impl From<SockAddrIn> for SocketAddrV4 {
    fn from(sa: SockAddrIn) -> Self {
        SocketAddrV4::new(sa.addr, sa.port)
    }
}

impl fmt::Display for SockAddrIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

impl AddressModule for SockAddrIn {
    const FAMILY: &'static str = "inet";

    fn any() -> Self {
        SockAddrIn::new(Ipv4Addr::UNSPECIFIED, 0)
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    fn is_any_address(&self) -> bool {
        self.addr.is_unspecified()
    }

    fn same_address(&self, other: &Self) -> bool {
        self.addr == other.addr
    }

    fn pseudo_header_sum(src: &Self, dst: &Self, protocol: u8, length: u32) -> u32 {
        let mut pseudo = [0u8; 12];
        pseudo[0..4].copy_from_slice(&src.addr.octets());
        pseudo[4..8].copy_from_slice(&dst.addr.octets());
        pseudo[9] = protocol;
        pseudo[10..12].copy_from_slice(&(length as u16).to_be_bytes());
        sum_words(&pseudo, 0)
    }
}

// ============================================================================
// IPv6
// ============================================================================

/// IPv6 socket address. Flow label and scope id are not part of the
/// endpoint identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SockAddrIn6 {
    pub addr: Ipv6Addr,
    pub port: u16,
}

impl SockAddrIn6 {
    pub const fn new(addr: Ipv6Addr, port: u16) -> Self {
        SockAddrIn6 { addr, port }
    }
}

impl From<SocketAddrV6> for SockAddrIn6 {
    fn from(sa: SocketAddrV6) -> Self {
        SockAddrIn6::new(*sa.ip(), sa.port())
    }
}

impl fmt::Display for SockAddrIn6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:{}", self.addr, self.port)
    }
}

impl AddressModule for SockAddrIn6 {
    const FAMILY: &'static str = "inet6";

    fn any() -> Self {
        SockAddrIn6::new(Ipv6Addr::UNSPECIFIED, 0)
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    fn is_any_address(&self) -> bool {
        self.addr.is_unspecified()
    }

    fn same_address(&self, other: &Self) -> bool {
        self.addr == other.addr
    }

    fn pseudo_header_sum(src: &Self, dst: &Self, protocol: u8, length: u32) -> u32 {
        // RFC 8200 section 8.1
        let mut pseudo = [0u8; 40];
        pseudo[0..16].copy_from_slice(&src.addr.octets());
        pseudo[16..32].copy_from_slice(&dst.addr.octets());
        pseudo[32..36].copy_from_slice(&length.to_be_bytes());
        pseudo[39] = protocol;
        sum_words(&pseudo, 0)
    }
}
