//! Socket payload buffers.
//!
//! A [`NetBuffer`] is the unit handed between the receive path and the
//! socket queues. Cloning is cheap: the payload is a reference-counted
//! [`Bytes`] view, so a peeking reader and the queue share storage until
//! one of them mutates its copy.

use bitflags::bitflags;
use bytes::{Bytes, BytesMut};

bitflags! {
    /// Link-level delivery markers carried with the payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferFlags: u32 {
        /// Received as a link broadcast.
        const BROADCAST = 1 << 0;
        /// Received on a multicast group address.
        const MULTICAST = 1 << 1;
    }
}

// ============================================================================
// NetBuffer
// ============================================================================

/// A clonable chunk of payload bytes.
///
/// # Copy-on-write
///
/// Mutating methods never touch storage shared with another clone. If the
/// payload is shared the bytes are copied first; readers holding an older
/// clone keep seeing the original contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetBuffer {
    data: Bytes,
    flags: BufferFlags,
}

impl NetBuffer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        NetBuffer {
            data: data.into(),
            flags: BufferFlags::empty(),
        }
    }

    pub fn with_flags(data: impl Into<Bytes>, flags: BufferFlags) -> Self {
        NetBuffer {
            data: data.into(),
            flags,
        }
    }

    /// Copy `data` into a new buffer.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        NetBuffer::new(Bytes::copy_from_slice(data))
    }

    /// Payload length in bytes. This is what queue budgets account.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: BufferFlags) {
        self.flags = flags;
    }

    /// Consume the buffer and return the payload view.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Remove and return the first `len` bytes.
    ///
    /// Returns `None` if fewer than `len` bytes are present. The returned
    /// slice shares storage; no copy is made.
    pub fn pull_head(&mut self, len: usize) -> Option<Bytes> {
        if len > self.data.len() {
            return None;
        }
        Some(self.data.split_to(len))
    }

    /// Drop `len` bytes from the tail. Returns `false` if the buffer is
    /// shorter than `len`.
    pub fn trim_tail(&mut self, len: usize) -> bool {
        let Some(keep) = self.data.len().checked_sub(len) else {
            return false;
        };
        self.data.truncate(keep);
        true
    }

    /// Append `tail` to the payload.
    pub fn push_tail(&mut self, tail: &[u8]) {
        let mut owned = self.make_mut(tail.len());
        owned.extend_from_slice(tail);
        self.data = owned.freeze();
    }

    /// Overwrite bytes starting at `offset`.
    ///
    /// Returns `false` (and leaves the buffer untouched) if the write would
    /// run past the end of the payload.
    pub fn write_at(&mut self, offset: usize, src: &[u8]) -> bool {
        match offset.checked_add(src.len()) {
            Some(end) if end <= self.data.len() => {
                let mut owned = self.make_mut(0);
                owned[offset..end].copy_from_slice(src);
                self.data = owned.freeze();
                true
            }
            _ => false,
        }
    }

    /// Private, writable copy of the payload with room for `extra` bytes.
    fn make_mut(&mut self, extra: usize) -> BytesMut {
        let mut owned = BytesMut::with_capacity(self.data.len() + extra);
        owned.extend_from_slice(&self.data);
        owned
    }
}

impl From<Vec<u8>> for NetBuffer {
    fn from(v: Vec<u8>) -> Self {
        NetBuffer::new(v)
    }
}

impl From<&'static [u8]> for NetBuffer {
    fn from(s: &'static [u8]) -> Self {
        NetBuffer::new(Bytes::from_static(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_isolated_from_writes() {
        let mut original = NetBuffer::copy_from_slice(b"hello world");
        let peeked = original.clone();

        assert!(original.write_at(0, b"HELLO"));
        original.push_tail(b"!");

        assert_eq!(original.data(), b"HELLO world!");
        assert_eq!(peeked.data(), b"hello world");
    }

    #[test]
    fn test_write_past_end_rejected() {
        let mut buf = NetBuffer::copy_from_slice(b"abc");
        assert!(!buf.write_at(2, b"xy"));
        assert!(!buf.write_at(usize::MAX, b"x"));
        assert_eq!(buf.data(), b"abc");
    }

    #[test]
    fn test_pull_and_trim() {
        let mut buf = NetBuffer::from(b"headerpayloadtrailer".to_vec());
        assert_eq!(buf.pull_head(6).as_deref(), Some(&b"header"[..]));
        assert!(buf.trim_tail(7));
        assert_eq!(buf.data(), b"payload");
        assert!(buf.pull_head(100).is_none());
        assert!(!buf.trim_tail(100));
        assert_eq!(buf.len(), 7);
    }

    #[test]
    fn test_flags_survive_clone() {
        let buf = NetBuffer::with_flags(&b"x"[..], BufferFlags::BROADCAST);
        let copy = buf.clone();
        assert!(copy.flags().contains(BufferFlags::BROADCAST));
        assert!(!copy.flags().contains(BufferFlags::MULTICAST));
    }
}
