//! TCP reset replies.
//!
//! When an inbound segment matches no endpoint, or is invalid for the
//! endpoint it reached, the sender is told to go away with a bare RST
//! (RFC 793, "Reset Generation"):
//!
//! - segment carried ACK: `<SEQ=SEG.ACK><CTL=RST>`
//! - otherwise: `<SEQ=0><ACK=SEG.SEQ+SEG.LEN><CTL=RST,ACK>`, where SYN and
//!   FIN each count as one octet of `SEG.LEN`
//!
//! A RST is never answered. Replies are rate limited per manager so spoofed
//! traffic can't turn the stack into a reset amplifier.

use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::addr::{sum_words, AddressModule, IPPROTO_TCP};
use crate::error::NetResult;

/// Length of a TCP header without options.
pub const TCP_HEADER_LEN: usize = 20;

bitflags! {
    /// TCP control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TcpFlags: u8 {
        const FIN = 0x01;
        const SYN = 0x02;
        const RST = 0x04;
        const PSH = 0x08;
        const ACK = 0x10;
        const URG = 0x20;
        const ECE = 0x40;
        const CWR = 0x80;
    }
}

/// The parts of an inbound segment a reset reply depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo<A: AddressModule> {
    pub source: A,
    pub destination: A,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub payload_len: u32,
}

/// Fixed 20-byte TCP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
}

impl SegmentHeader {
    /// Serialize in wire order.
    pub fn to_bytes(&self) -> [u8; TCP_HEADER_LEN] {
        let mut bytes = [0u8; TCP_HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.seq.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.ack.to_be_bytes());
        // Data offset in 32-bit words, no options.
        bytes[12] = ((TCP_HEADER_LEN / 4) as u8) << 4;
        bytes[13] = self.flags.bits();
        bytes[14..16].copy_from_slice(&self.window.to_be_bytes());
        bytes[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        // Urgent pointer stays zero.
        bytes
    }
}

/// A reset ready to hand to the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSegment<A: AddressModule> {
    pub source: A,
    pub destination: A,
    /// Header with the checksum filled in.
    pub header: SegmentHeader,
}

impl<A: AddressModule> ResetSegment<A> {
    pub fn to_bytes(&self) -> [u8; TCP_HEADER_LEN] {
        self.header.to_bytes()
    }
}

/// Output path for generated segments.
pub trait SegmentSender<A: AddressModule>: Send + Sync {
    /// Transmit a complete TCP segment from `source` to `destination`.
    fn send_segment(&self, source: &A, destination: &A, segment: &[u8]) -> NetResult<()>;
}

/// Internet checksum of a TCP segment, pseudo header included.
///
/// # Arguments
///
/// * `src` - Source address of the segment
/// * `dst` - Destination address of the segment
/// * `segment` - Complete TCP segment (header + payload)
pub fn tcp_checksum<A: AddressModule>(src: &A, dst: &A, segment: &[u8]) -> u16 {
    let mut sum = A::pseudo_header_sum(src, dst, IPPROTO_TCP, segment.len() as u32);
    sum = sum_words(segment, sum);
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Build the reset answering `incoming`, or `None` if it must not be
/// answered.
pub fn reset_for<A: AddressModule>(incoming: &SegmentInfo<A>) -> Option<ResetSegment<A>> {
    if incoming.flags.contains(TcpFlags::RST) {
        return None;
    }

    let (seq, ack, flags) = if incoming.flags.contains(TcpFlags::ACK) {
        (incoming.ack, 0, TcpFlags::RST)
    } else {
        let mut seg_len = incoming.payload_len;
        if incoming.flags.contains(TcpFlags::SYN) {
            seg_len = seg_len.wrapping_add(1);
        }
        if incoming.flags.contains(TcpFlags::FIN) {
            seg_len = seg_len.wrapping_add(1);
        }
        (0, incoming.seq.wrapping_add(seg_len), TcpFlags::RST | TcpFlags::ACK)
    };

    let source = incoming.destination;
    let destination = incoming.source;
    let mut header = SegmentHeader {
        src_port: source.port(),
        dst_port: destination.port(),
        seq,
        ack,
        flags,
        window: 0,
        checksum: 0,
    };
    header.checksum = tcp_checksum(&source, &destination, &header.to_bytes());

    Some(ResetSegment {
        source,
        destination,
        header,
    })
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Token bucket refilled once per window.
#[derive(Debug)]
pub(crate) struct ResetLimiter {
    /// 0 disables limiting.
    limit: u32,
    window: Duration,
    window_start: Option<Instant>,
    tokens: u32,
}

impl ResetLimiter {
    pub(crate) fn new(limit: u32, window: Duration) -> Self {
        ResetLimiter {
            limit,
            window,
            window_start: None,
            tokens: limit,
        }
    }

    /// Take a token if one is left in the current window.
    pub(crate) fn allow(&mut self, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }
        let expired = match self.window_start {
            Some(start) => now.saturating_duration_since(start) >= self.window,
            None => true,
        };
        if expired {
            self.window_start = Some(now);
            self.tokens = self.limit;
        }
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }
}
