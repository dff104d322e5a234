//! Demultiplexing indices for one protocol domain.
//!
//! Two maps over endpoint ids:
//!
//! - **port map**: local port -> reuse chain. The first id in the chain is
//!   the head; further ids were admitted by port sharing and are kept in
//!   bind order, so a wildcard-address bind (always the last one allowed on
//!   a port) sits at the tail.
//! - **connection map**: `(local, peer)` -> endpoint. Listening endpoints are
//!   keyed with a wildcard peer, fully passive ones with a wildcard local
//!   address as well.
//!
//! Neither map owns an endpoint; both store [`EndpointId`]s into the
//! manager's arena. Hashing and equality come from the [`AddressModule`].

use std::collections::HashMap;

use log::trace;

use crate::addr::AddressModule;
use crate::endpoint::EndpointId;
use crate::error::{NetError, NetResult};

pub(crate) struct EndpointTable<A: AddressModule> {
    ports: HashMap<u16, Vec<EndpointId>>,
    connections: HashMap<(A, A), EndpointId>,
}

impl<A: AddressModule> EndpointTable<A> {
    pub(crate) fn new() -> Self {
        EndpointTable {
            ports: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    // ========================================================================
    // Port map
    // ========================================================================

    /// Reuse chain for `port`, head first.
    pub(crate) fn port_chain(&self, port: u16) -> Option<&[EndpointId]> {
        self.ports.get(&port).map(Vec::as_slice)
    }

    pub(crate) fn is_port_used(&self, port: u16) -> bool {
        self.ports.contains_key(&port)
    }

    /// Make `id` the head of a new chain, or append it to the existing one.
    pub(crate) fn insert_port(&mut self, port: u16, id: EndpointId) -> NetResult<()> {
        match self.ports.get_mut(&port) {
            Some(chain) => {
                chain.try_reserve(1)?;
                chain.push(id);
            }
            None => {
                self.ports.try_reserve(1)?;
                let mut chain = Vec::new();
                chain.try_reserve(1)?;
                chain.push(id);
                self.ports.insert(port, chain);
            }
        }
        Ok(())
    }

    /// Remove `id` from `port`'s chain. Removing the head promotes the next
    /// member. Returns `false` if `id` is not chained on `port`.
    pub(crate) fn remove_port(&mut self, port: u16, id: EndpointId) -> bool {
        let Some(chain) = self.ports.get_mut(&port) else {
            return false;
        };
        let Some(pos) = chain.iter().position(|&member| member == id) else {
            return false;
        };
        chain.remove(pos);
        if chain.is_empty() {
            self.ports.remove(&port);
        }
        true
    }

    pub(crate) fn port_count(&self) -> usize {
        self.ports.len()
    }

    // ========================================================================
    // Connection map
    // ========================================================================

    /// Register `id` under `(local, peer)`.
    ///
    /// # Errors
    ///
    /// * `AddressInUse` - the pair is already registered
    /// * `OutOfMemory` - the map could not grow
    pub(crate) fn insert_connection(&mut self, local: A, peer: A, id: EndpointId) -> NetResult<()> {
        if self.connections.contains_key(&(local, peer)) {
            return Err(NetError::AddressInUse);
        }
        self.connections.try_reserve(1)?;
        self.connections.insert((local, peer), id);
        Ok(())
    }

    /// Remove the `(local, peer)` entry if it belongs to `id`.
    pub(crate) fn remove_connection(&mut self, local: A, peer: A, id: EndpointId) -> bool {
        match self.connections.get(&(local, peer)) {
            Some(&owner) if owner == id => {
                self.connections.remove(&(local, peer));
                true
            }
            _ => false,
        }
    }

    /// Most specific endpoint for a segment from `peer` to `local`.
    ///
    /// Lookup order:
    /// 1. exact `(local, peer)`
    /// 2. `(local, *)`
    /// 3. `(*:port, *)`
    pub(crate) fn find(&self, local: A, peer: A) -> Option<EndpointId> {
        let any = A::any();
        if let Some(&id) = self.connections.get(&(local, peer)) {
            return Some(id);
        }
        if let Some(&id) = self.connections.get(&(local, any)) {
            return Some(id);
        }
        let passive = any.with_port(local.port());
        let found = self.connections.get(&(passive, any)).copied();
        if found.is_none() {
            trace!("{}: no endpoint for {} <- {}", A::FAMILY, local, peer);
        }
        found
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
