//! In-process transport driven through a [`MemoryTransportHandle`].
//!
//! Used by tests and tools that want to run the full dispatch loop without a
//! socket: the handle injects events the way a network would and records
//! everything the server sends.

use super::{DisconnectReason, Transport, TransportError, TransportEvent};
use crate::connection::ConnectionId;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use ttt_shared::DeliveryMode;

/// One message handed to the transport by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub connection_id: ConnectionId,
    pub payload: Bytes,
    pub mode: DeliveryMode,
}

#[derive(Debug, Default)]
struct MemoryState {
    events: VecDeque<TransportEvent>,
    pending: HashSet<SocketAddr>,
    peers: HashMap<ConnectionId, SocketAddr>,
    next_id: ConnectionId,
    sent: Vec<SentDatagram>,
    rejected: Vec<SocketAddr>,
    disconnected: Vec<ConnectionId>,
}

type Shared = Arc<Mutex<MemoryState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Transport`] backed by a shared in-memory queue.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Shared,
}

/// Test-side view of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryTransportHandle {
    state: Shared,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryTransportHandle) {
        let state = Arc::new(Mutex::new(MemoryState {
            next_id: 1,
            ..MemoryState::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            MemoryTransportHandle { state },
        )
    }
}

impl Transport for MemoryTransport {
    fn poll(&mut self) -> Vec<TransportEvent> {
        lock(&self.state).events.drain(..).collect()
    }

    fn accept(&mut self, remote: SocketAddr) -> Result<ConnectionId, TransportError> {
        let mut state = lock(&self.state);
        if !state.pending.remove(&remote) {
            return Err(TransportError::NoPendingRequest(remote));
        }
        let connection_id = state.next_id;
        state.next_id += 1;
        state.peers.insert(connection_id, remote);
        state.events.push_back(TransportEvent::Connected {
            connection_id,
            remote,
        });
        Ok(connection_id)
    }

    fn reject(&mut self, remote: SocketAddr) {
        let mut state = lock(&self.state);
        if state.pending.remove(&remote) {
            state.rejected.push(remote);
        }
    }

    fn send(
        &mut self,
        connection_id: ConnectionId,
        payload: &[u8],
        mode: DeliveryMode,
    ) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if !state.peers.contains_key(&connection_id) {
            return Err(TransportError::UnknownPeer(connection_id));
        }
        state.sent.push(SentDatagram {
            connection_id,
            payload: Bytes::copy_from_slice(payload),
            mode,
        });
        Ok(())
    }

    fn disconnect(&mut self, connection_id: ConnectionId) {
        let mut state = lock(&self.state);
        if let Some(remote) = state.peers.remove(&connection_id) {
            state.disconnected.push(connection_id);
            state.events.push_back(TransportEvent::Disconnected {
                connection_id,
                remote,
                reason: DisconnectReason::LocalDisconnect,
            });
        }
    }
}

impl MemoryTransportHandle {
    /// Queues a connection request from `remote`.
    pub fn request_connection(&self, remote: SocketAddr) {
        let mut state = lock(&self.state);
        state.pending.insert(remote);
        state.events.push_back(TransportEvent::ConnectionRequest { remote });
    }

    /// Registers an already-connected peer under a chosen id and queues its
    /// `Connected` event.
    pub fn connect(&self, connection_id: ConnectionId, remote: SocketAddr) {
        let mut state = lock(&self.state);
        state.peers.insert(connection_id, remote);
        state.next_id = state.next_id.max(connection_id + 1);
        state.events.push_back(TransportEvent::Connected {
            connection_id,
            remote,
        });
    }

    /// Queues an inbound reliable-ordered message.
    pub fn receive(&self, connection_id: ConnectionId, payload: impl Into<Bytes>) {
        self.receive_with_mode(connection_id, payload, DeliveryMode::ReliableOrdered);
    }

    pub fn receive_with_mode(
        &self,
        connection_id: ConnectionId,
        payload: impl Into<Bytes>,
        mode: DeliveryMode,
    ) {
        lock(&self.state).events.push_back(TransportEvent::Received {
            connection_id,
            payload: payload.into(),
            mode,
        });
    }

    /// Simulates the peer going away.
    pub fn remote_disconnect(&self, connection_id: ConnectionId, reason: DisconnectReason) {
        let mut state = lock(&self.state);
        if let Some(remote) = state.peers.remove(&connection_id) {
            state.events.push_back(TransportEvent::Disconnected {
                connection_id,
                remote,
                reason,
            });
        }
    }

    /// Queues an arbitrary event.
    pub fn push_event(&self, event: TransportEvent) {
        lock(&self.state).events.push_back(event);
    }

    /// Drains the datagrams sent so far.
    pub fn take_sent(&self) -> Vec<SentDatagram> {
        std::mem::take(&mut lock(&self.state).sent)
    }

    pub fn rejected(&self) -> Vec<SocketAddr> {
        lock(&self.state).rejected.clone()
    }

    /// Ids the server disconnected locally.
    pub fn disconnected(&self) -> Vec<ConnectionId> {
        lock(&self.state).disconnected.clone()
    }

    pub fn is_peer_connected(&self, connection_id: ConnectionId) -> bool {
        lock(&self.state).peers.contains_key(&connection_id)
    }
}
