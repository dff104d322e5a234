//! Endpoint records and the arena that owns them.
//!
//! The socket layer holds an [`EndpointId`]; the record itself lives in
//! its manager's [`EndpointArena`]. Table indices store ids, never
//! references, so unbinding or releasing an endpoint can't leave a
//! dangling link behind.
//!
//! # Generation counter
//!
//! Every allocation stamps its slot with a fresh generation. A released
//! slot may be reused, but an id minted for the previous occupant no longer
//! matches and is rejected with `InvalidArgument`.

use core::fmt;

use bitflags::bitflags;

use crate::addr::AddressModule;
use crate::error::{NetError, NetResult};

/// Handle to an endpoint: high 32 bits generation, low 32 bits slot index.
///
/// ```text
/// 63              32 31              0
/// +------------------+----------------+
/// |    Generation    |     Index      |
/// +------------------+----------------+
/// ```
///
/// Generation 0 is never issued, so the all-zero id is always invalid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EndpointId(u64);

impl EndpointId {
    pub const INVALID: EndpointId = EndpointId(0);

    #[inline]
    const fn from_parts(index: u32, generation: u32) -> Self {
        EndpointId(((generation as u64) << 32) | index as u64)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.generation() > 0
    }
}

impl fmt::Debug for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointId(gen={}, idx={})", self.generation(), self.index())
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.generation(), self.index())
    }
}

bitflags! {
    /// Socket options that affect bind conflict checks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EndpointOptions: u32 {
        /// SO_REUSEADDR
        const REUSE_ADDR = 1 << 0;
        /// SO_REUSEPORT
        const REUSE_PORT = 1 << 1;
    }
}

impl EndpointOptions {
    /// Whether this endpoint may share a port with other reusing endpoints.
    #[inline]
    pub fn allows_reuse(self) -> bool {
        self.intersects(EndpointOptions::REUSE_ADDR | EndpointOptions::REUSE_PORT)
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// Addressing state of one socket.
#[derive(Debug, Clone)]
pub struct Endpoint<A: AddressModule> {
    pub(crate) local: A,
    pub(crate) peer: A,
    pub(crate) options: EndpointOptions,
    /// Present in the port map (directly or via a reuse chain).
    pub(crate) bound: bool,
    /// Present in the connection map under `(local, peer)`.
    pub(crate) registered: bool,
    /// Accepted child; shares its parent's port without being chained.
    pub(crate) spawned: bool,
}

impl<A: AddressModule> Endpoint<A> {
    pub(crate) fn new(options: EndpointOptions) -> Self {
        Endpoint {
            local: A::any(),
            peer: A::any(),
            options,
            bound: false,
            registered: false,
            spawned: false,
        }
    }

    pub fn local(&self) -> A {
        self.local
    }

    pub fn peer(&self) -> A {
        self.peer
    }

    pub fn options(&self) -> EndpointOptions {
        self.options
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }
}

// ============================================================================
// EndpointArena
// ============================================================================

struct Slot<A: AddressModule> {
    generation: u32,
    endpoint: Endpoint<A>,
}

/// Slot storage for endpoint records.
pub(crate) struct EndpointArena<A: AddressModule> {
    slots: Vec<Option<Slot<A>>>,
    free: Vec<u32>,
    /// Starts at 1; 0 is reserved for [`EndpointId::INVALID`].
    next_generation: u32,
    live: usize,
}

impl<A: AddressModule> EndpointArena<A> {
    pub(crate) fn new() -> Self {
        EndpointArena {
            slots: Vec::new(),
            free: Vec::new(),
            next_generation: 1,
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, endpoint: Endpoint<A>) -> NetResult<EndpointId> {
        let index = match self.free.pop() {
            Some(idx) => idx,
            None => {
                let idx = u32::try_from(self.slots.len()).map_err(|_| NetError::OutOfMemory)?;
                self.slots.try_reserve(1)?;
                // Room for every slot on the free list, so remove() never allocates.
                self.free.try_reserve(self.slots.len() + 1)?;
                self.slots.push(None);
                idx
            }
        };

        let generation = self.next_generation;
        // Wrap past 0 so INVALID stays unique.
        self.next_generation = self.next_generation.checked_add(1).unwrap_or(1);

        self.slots[index as usize] = Some(Slot {
            generation,
            endpoint,
        });
        self.live += 1;
        Ok(EndpointId::from_parts(index, generation))
    }

    pub(crate) fn get(&self, id: EndpointId) -> NetResult<&Endpoint<A>> {
        if !id.is_valid() {
            return Err(NetError::InvalidArgument);
        }
        match self.slots.get(id.index() as usize) {
            Some(Some(slot)) if slot.generation == id.generation() => Ok(&slot.endpoint),
            _ => Err(NetError::InvalidArgument),
        }
    }

    pub(crate) fn get_mut(&mut self, id: EndpointId) -> NetResult<&mut Endpoint<A>> {
        if !id.is_valid() {
            return Err(NetError::InvalidArgument);
        }
        match self.slots.get_mut(id.index() as usize) {
            Some(Some(slot)) if slot.generation == id.generation() => Ok(&mut slot.endpoint),
            _ => Err(NetError::InvalidArgument),
        }
    }

    pub(crate) fn remove(&mut self, id: EndpointId) -> NetResult<Endpoint<A>> {
        self.get(id)?;
        let index = id.index() as usize;
        let slot = self.slots[index].take().ok_or(NetError::InvalidArgument)?;
        // Capacity was reserved in insert().
        self.free.push(id.index());
        self.live -= 1;
        Ok(slot.endpoint)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (EndpointId, &Endpoint<A>)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref()
                .map(|s| (EndpointId::from_parts(idx as u32, s.generation), &s.endpoint))
        })
    }
}
