//! Per-domain endpoint manager.
//!
//! [`EndpointManager`] is the single source of truth that maps wire
//! addressing to endpoints for one protocol domain. It owns the endpoint
//! arena, both demultiplexing indices and the ephemeral port PRNG, all
//! behind one lock. Every bind, connect and lookup for the domain is
//! serialized on that lock, so a completed bind is visible to every lookup
//! that starts after it.
//!
//! # Bind rules
//!
//! For a port that already has a reuse chain, a new bind:
//! 1. fails with `AddressInUse` if a member has the same local address,
//!    unless both endpoints enable address or port reuse
//! 2. fails with `PermissionDenied` if a member is bound to the wildcard
//!    address (a wildcard bind must be the last one on its port)
//! 3. is offered to the [`InterfaceBinder`] and then appended to the chain

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spin::Mutex;

use crate::addr::AddressModule;
use crate::config::TransportConfig;
use crate::endpoint::{Endpoint, EndpointArena, EndpointId, EndpointOptions};
use crate::error::{NetError, NetResult};
use crate::port_alloc::find_ephemeral_port;
use crate::reset::{reset_for, ResetLimiter, ResetSegment, SegmentInfo, SegmentSender};
use crate::table::EndpointTable;

// ============================================================================
// Collaborators
// ============================================================================

/// Address-family half of a bind.
///
/// Called with the manager lock held, after the port checks pass. Must not
/// block.
pub trait InterfaceBinder<A: AddressModule>: Send + Sync {
    /// Accept or reject `address` as a local address.
    ///
    /// Typically fails with `AddressNotAvailable` for a specific address
    /// that is not configured on any interface.
    fn bind_address(&self, address: &A) -> NetResult<()>;
}

/// Binder that accepts every address.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyLocalAddress;

impl<A: AddressModule> InterfaceBinder<A> for AnyLocalAddress {
    fn bind_address(&self, _address: &A) -> NetResult<()> {
        Ok(())
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Snapshot of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointInfo<A: AddressModule> {
    pub id: EndpointId,
    pub local: A,
    pub peer: A,
    pub options: EndpointOptions,
    pub bound: bool,
    pub registered: bool,
    pub spawned: bool,
}

impl<A: AddressModule> EndpointInfo<A> {
    fn new(id: EndpointId, ep: &Endpoint<A>) -> Self {
        EndpointInfo {
            id,
            local: ep.local,
            peer: ep.peer,
            options: ep.options,
            bound: ep.bound,
            registered: ep.registered,
            spawned: ep.spawned,
        }
    }
}

/// Manager statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub endpoints: usize,
    pub bound_ports: usize,
    pub connections: usize,
    pub binds: u64,
    pub ephemeral_binds: u64,
    pub lookups: u64,
    pub lookup_misses: u64,
    pub resets_sent: u64,
    /// Resets dropped by the rate limiter.
    pub resets_suppressed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    binds: u64,
    ephemeral_binds: u64,
    lookups: u64,
    lookup_misses: u64,
    resets_sent: u64,
    resets_suppressed: u64,
}

// ============================================================================
// Locked state
// ============================================================================

struct ManagerInner<A: AddressModule> {
    arena: EndpointArena<A>,
    table: EndpointTable<A>,
    rng: ChaCha8Rng,
    limiter: ResetLimiter,
    counters: Counters,
}

impl<A: AddressModule> ManagerInner<A> {
    /// Endpoint referenced from an index. Its absence means the indices
    /// are corrupt.
    fn indexed(&self, id: EndpointId) -> &Endpoint<A> {
        match self.arena.get(id) {
            Ok(ep) => ep,
            Err(_) => {
                error!("{}: index references released endpoint {}", A::FAMILY, id);
                panic!("{}: index references released endpoint {}", A::FAMILY, id);
            }
        }
    }

    fn bind_locked(
        &mut self,
        id: EndpointId,
        address: A,
        binder: &dyn InterfaceBinder<A>,
    ) -> NetResult<A> {
        let port = address.port();
        let options = self.arena.get(id)?.options;

        if let Some(chain) = self.table.port_chain(port) {
            for &member in chain {
                let other = self.indexed(member);
                if other.local.same_address(&address)
                    && !(options.allows_reuse() && other.options.allows_reuse())
                {
                    debug!("{}: bind {} to {}: address in use", A::FAMILY, id, address);
                    return Err(NetError::AddressInUse);
                }
            }
            if chain.iter().any(|&m| self.indexed(m).local.is_any_address()) {
                debug!("{}: bind {} to {}: port is wildcard bound", A::FAMILY, id, address);
                return Err(NetError::PermissionDenied);
            }
        }

        binder.bind_address(&address)?;
        self.table.insert_port(port, id)?;

        let ep = self.arena.get_mut(id)?;
        ep.local = address;
        ep.bound = true;
        self.counters.binds += 1;
        debug!("{}: bound {} to {}", A::FAMILY, id, address);
        Ok(address)
    }

    fn bind_to_ephemeral(
        &mut self,
        id: EndpointId,
        address: A,
        range: &RangeInclusive<u16>,
        binder: &dyn InterfaceBinder<A>,
    ) -> NetResult<A> {
        let ManagerInner { table, rng, .. } = &mut *self;
        let port = find_ephemeral_port(rng, range, |p| !table.is_port_used(p)).ok_or_else(|| {
            warn!("{}: ephemeral ports exhausted", A::FAMILY);
            NetError::AddressInUse
        })?;
        let bound = self.bind_locked(id, address.with_port(port), binder)?;
        self.counters.ephemeral_binds += 1;
        Ok(bound)
    }

    /// Undo a bind made earlier in the same call.
    fn rollback_bind(&mut self, id: EndpointId) {
        let Ok(ep) = self.arena.get_mut(id) else {
            return;
        };
        let port = ep.local.port();
        ep.bound = false;
        ep.local = A::any();
        self.table.remove_port(port, id);
    }
}

// ============================================================================
// EndpointManager
// ============================================================================

/// Endpoint registry and demultiplexer for one protocol domain.
pub struct EndpointManager<A: AddressModule> {
    inner: Mutex<ManagerInner<A>>,
    ephemeral_ports: RangeInclusive<u16>,
    privileged_port_limit: u16,
    binder: Arc<dyn InterfaceBinder<A>>,
}

impl<A: AddressModule> EndpointManager<A> {
    /// Manager accepting any local address.
    pub fn new(config: &TransportConfig) -> Self {
        Self::with_binder(config, Arc::new(AnyLocalAddress))
    }

    /// Manager that delegates the address-family bind to `binder`.
    pub fn with_binder(config: &TransportConfig, binder: Arc<dyn InterfaceBinder<A>>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        EndpointManager {
            inner: Mutex::new(ManagerInner {
                arena: EndpointArena::new(),
                table: EndpointTable::new(),
                rng,
                limiter: ResetLimiter::new(
                    config.reset_rate_limit,
                    Duration::from_millis(config.reset_rate_window_ms),
                ),
                counters: Counters::default(),
            }),
            ephemeral_ports: config.ephemeral_ports.clone(),
            privileged_port_limit: config.privileged_port_limit,
            binder,
        }
    }

    // ========================================================================
    // Endpoint lifecycle
    // ========================================================================

    /// Allocate an unbound endpoint.
    pub fn create_endpoint(&self, options: EndpointOptions) -> NetResult<EndpointId> {
        let id = self.inner.lock().arena.insert(Endpoint::new(options))?;
        trace!("{}: created endpoint {}", A::FAMILY, id);
        Ok(id)
    }

    /// Allocate an accepted child of the listening endpoint `parent`.
    ///
    /// The child shares the parent's local address and port without joining
    /// the port's reuse chain; it becomes reachable once
    /// [`set_connection`](Self::set_connection) registers it.
    pub fn spawn_endpoint(&self, parent: EndpointId) -> NetResult<EndpointId> {
        let mut inner = self.inner.lock();
        let parent_ep = inner.arena.get(parent)?;
        if !parent_ep.bound {
            return Err(NetError::InvalidArgument);
        }
        let mut child = Endpoint::new(parent_ep.options);
        child.local = parent_ep.local;
        child.bound = true;
        child.spawned = true;
        let id = inner.arena.insert(child)?;
        trace!("{}: spawned endpoint {} from {}", A::FAMILY, id, parent);
        Ok(id)
    }

    /// Free an endpoint's slot. It must be unbound first.
    pub fn release_endpoint(&self, id: EndpointId) -> NetResult<()> {
        let mut inner = self.inner.lock();
        let ep = inner.arena.get(id)?;
        if ep.bound || ep.registered {
            return Err(NetError::InvalidArgument);
        }
        inner.arena.remove(id)?;
        trace!("{}: released endpoint {}", A::FAMILY, id);
        Ok(())
    }

    // ========================================================================
    // Bind / Unbind
    // ========================================================================

    /// Bind `id` to `address`. Port 0 picks an ephemeral port.
    ///
    /// # Arguments
    ///
    /// * `id` - Endpoint to bind; must not be bound yet
    /// * `address` - Local address and port
    /// * `privileged` - Whether the caller may bind ports below the
    ///   privileged limit
    ///
    /// # Returns
    ///
    /// The address actually bound.
    ///
    /// # Errors
    ///
    /// * `AddressInUse` - conflicting bind, or no free ephemeral port
    /// * `PermissionDenied` - privileged port, or the port is wildcard bound
    /// * `InvalidArgument` - stale id or already bound
    pub fn bind(&self, id: EndpointId, address: A, privileged: bool) -> NetResult<A> {
        let mut inner = self.inner.lock();
        let ep = inner.arena.get(id)?;
        if ep.bound || ep.registered {
            return Err(NetError::InvalidArgument);
        }

        if address.port() == 0 {
            return inner.bind_to_ephemeral(id, address, &self.ephemeral_ports, &*self.binder);
        }
        if address.port() < self.privileged_port_limit && !privileged {
            debug!("{}: bind {} to {}: privileged port", A::FAMILY, id, address);
            return Err(NetError::PermissionDenied);
        }
        inner.bind_locked(id, address, &*self.binder)
    }

    /// Remove `id` from both indices.
    ///
    /// Removing the head of a reuse chain promotes the next member.
    ///
    /// # Panics
    ///
    /// If a bound, non-spawned endpoint is missing from its port chain, or
    /// a registered endpoint is missing from the connection map. Either
    /// means the indices are corrupt.
    pub fn unbind(&self, id: EndpointId) -> NetResult<()> {
        let mut inner = self.inner.lock();
        let ep = inner.arena.get(id)?.clone();
        if !ep.bound && !ep.registered {
            return Err(NetError::NotFound);
        }

        if ep.registered && !inner.table.remove_connection(ep.local, ep.peer, id) {
            error!("{}: {} missing from connection map ({}, {})", A::FAMILY, id, ep.local, ep.peer);
            panic!("{}: endpoint {} missing from connection map", A::FAMILY, id);
        }
        if ep.bound && !inner.table.remove_port(ep.local.port(), id) && !ep.spawned {
            error!("{}: {} missing from port {} chain", A::FAMILY, id, ep.local.port());
            panic!("{}: endpoint {} missing from port chain", A::FAMILY, id);
        }

        let record = inner.arena.get_mut(id)?;
        record.local = A::any();
        record.peer = A::any();
        record.bound = false;
        record.registered = false;
        debug!("{}: unbound {} from {}", A::FAMILY, id, ep.local);
        Ok(())
    }

    // ========================================================================
    // Connection registration
    // ========================================================================

    /// Register `id` as the connection `(local, peer)`.
    ///
    /// The connection always uses the endpoint's bound port; `local` may
    /// carry that port or 0. The local host is, in order of preference, a
    /// specific host in `local`, the endpoint's specific bound host, or
    /// `interface_local`. An unbound endpoint is first bound to an
    /// ephemeral port, in which case `local` must carry port 0.
    ///
    /// # Errors
    ///
    /// * `AddressInUse` - the pair is already registered
    /// * `InvalidArgument` - stale id, already registered, an explicit port
    ///   on an unbound endpoint, or a `local` that disagrees with the bound
    ///   port or specific bound host
    pub fn set_connection(&self, id: EndpointId, local: A, peer: A, interface_local: A) -> NetResult<()> {
        let mut inner = self.inner.lock();
        let ep = inner.arena.get(id)?;
        if ep.registered {
            return Err(NetError::InvalidArgument);
        }

        let auto_bound = !ep.bound;
        let bound = if auto_bound {
            if local.port() != 0 {
                return Err(NetError::InvalidArgument);
            }
            inner.bind_to_ephemeral(id, local, &self.ephemeral_ports, &*self.binder)?
        } else {
            let bound = ep.local;
            let port_conflict = local.port() != 0 && local.port() != bound.port();
            let host_conflict = !local.is_any_address()
                && !bound.is_any_address()
                && !local.same_address(&bound);
            if port_conflict || host_conflict {
                debug!("{}: connect {} from {}: bound to {}", A::FAMILY, id, local, bound);
                return Err(NetError::InvalidArgument);
            }
            bound
        };

        let host = if !local.is_any_address() {
            local
        } else if !bound.is_any_address() {
            bound
        } else {
            interface_local
        };
        let local = host.with_port(bound.port());

        if let Err(err) = inner.table.insert_connection(local, peer, id) {
            if auto_bound {
                inner.rollback_bind(id);
            }
            debug!("{}: connect {} ({}, {}): {}", A::FAMILY, id, local, peer, err);
            return Err(err);
        }

        let record = inner.arena.get_mut(id)?;
        record.local = local;
        record.peer = peer;
        record.registered = true;
        debug!("{}: connected {} ({}, {})", A::FAMILY, id, local, peer);
        Ok(())
    }

    /// Register `id` as a listener for its local address.
    ///
    /// An unbound endpoint is first bound to an ephemeral port on the
    /// wildcard address.
    pub fn set_passive(&self, id: EndpointId) -> NetResult<()> {
        let mut inner = self.inner.lock();
        let ep = inner.arena.get(id)?;
        if ep.registered {
            return Err(NetError::InvalidArgument);
        }

        let (auto_bound, current) = (!ep.bound, ep.local);
        let local = if auto_bound {
            inner.bind_to_ephemeral(id, A::any(), &self.ephemeral_ports, &*self.binder)?
        } else {
            current
        };
        let any = A::any();

        if let Err(err) = inner.table.insert_connection(local, any, id) {
            if auto_bound {
                inner.rollback_bind(id);
            }
            debug!("{}: listen {} on {}: {}", A::FAMILY, id, local, err);
            return Err(err);
        }

        let record = inner.arena.get_mut(id)?;
        record.peer = any;
        record.registered = true;
        debug!("{}: listening {} on {}", A::FAMILY, id, local);
        Ok(())
    }

    /// Endpoint that should receive a segment from `peer` to `local`.
    ///
    /// Tries the exact pair, then `(local, *)`, then `(*:port, *)`. A miss
    /// is an ordinary outcome.
    pub fn find_connection(&self, local: A, peer: A) -> Option<EndpointId> {
        let mut inner = self.inner.lock();
        inner.counters.lookups += 1;
        let found = inner.table.find(local, peer);
        if found.is_none() {
            inner.counters.lookup_misses += 1;
        }
        found
    }

    // ========================================================================
    // Reset replies
    // ========================================================================

    /// Answer `incoming` with a reset through `sender`.
    ///
    /// # Returns
    ///
    /// The reset that was sent, or `None` if `incoming` was itself a reset
    /// or the rate limiter suppressed the reply.
    pub fn reply_with_reset(
        &self,
        incoming: &SegmentInfo<A>,
        sender: &dyn SegmentSender<A>,
    ) -> NetResult<Option<ResetSegment<A>>> {
        let Some(reset) = reset_for(incoming) else {
            return Ok(None);
        };
        {
            let mut inner = self.inner.lock();
            if !inner.limiter.allow(Instant::now()) {
                inner.counters.resets_suppressed += 1;
                trace!("{}: reset to {} rate limited", A::FAMILY, reset.destination);
                return Ok(None);
            }
        }

        sender.send_segment(&reset.source, &reset.destination, &reset.to_bytes())?;
        self.inner.lock().counters.resets_sent += 1;
        trace!("{}: reset {} -> {}", A::FAMILY, reset.source, reset.destination);
        Ok(Some(reset))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn endpoint(&self, id: EndpointId) -> NetResult<EndpointInfo<A>> {
        let inner = self.inner.lock();
        Ok(EndpointInfo::new(id, inner.arena.get(id)?))
    }

    pub fn local_address(&self, id: EndpointId) -> NetResult<A> {
        Ok(self.inner.lock().arena.get(id)?.local)
    }

    pub fn peer_address(&self, id: EndpointId) -> NetResult<A> {
        Ok(self.inner.lock().arena.get(id)?.peer)
    }

    pub fn is_bound(&self, id: EndpointId) -> NetResult<bool> {
        Ok(self.inner.lock().arena.get(id)?.bound)
    }

    pub fn is_registered(&self, id: EndpointId) -> NetResult<bool> {
        Ok(self.inner.lock().arena.get(id)?.registered)
    }

    /// Replace the reuse options. Takes effect for binds made afterwards.
    pub fn set_options(&self, id: EndpointId, options: EndpointOptions) -> NetResult<()> {
        self.inner.lock().arena.get_mut(id)?.options = options;
        Ok(())
    }

    /// Snapshot of every live endpoint, in slot order.
    pub fn dump(&self) -> Vec<EndpointInfo<A>> {
        let inner = self.inner.lock();
        inner
            .arena
            .iter()
            .map(|(id, ep)| EndpointInfo::new(id, ep))
            .collect()
    }

    pub fn stats(&self) -> ManagerStats {
        let inner = self.inner.lock();
        ManagerStats {
            endpoints: inner.arena.len(),
            bound_ports: inner.table.port_count(),
            connections: inner.table.connection_count(),
            binds: inner.counters.binds,
            ephemeral_binds: inner.counters.ephemeral_binds,
            lookups: inner.counters.lookups,
            lookup_misses: inner.counters.lookup_misses,
            resets_sent: inner.counters.resets_sent,
            resets_suppressed: inner.counters.resets_suppressed,
        }
    }

    pub fn ephemeral_ports(&self) -> &RangeInclusive<u16> {
        &self.ephemeral_ports
    }
}
