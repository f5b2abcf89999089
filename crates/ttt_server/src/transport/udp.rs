//! UDP transport backed by renet.
//!
//! `renet_netcode` owns the socket, the connection handshake and peer
//! timeouts; `renet` provides one channel per [`DeliveryMode`] with acks,
//! resends and ordering. This module maps both onto [`Transport`]: a netcode
//! client that finishes its handshake surfaces as a connection request, and a
//! rejected request is disconnected straight away.
//!
//! Clients connect with [`PROTOCOL_ID`] and renet's default channel layout.

use super::{DisconnectReason, Transport, TransportError, TransportEvent};
use crate::config::TransportConfig;
use crate::connection::ConnectionId;
use bytes::Bytes;
use renet::{
    ChannelConfig, ClientId, ConnectionConfig, DefaultChannel, RenetServer, SendType, ServerEvent,
};
use renet_netcode::{NetcodeServerTransport, ServerAuthentication, ServerConfig as NetcodeConfig};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use ttt_shared::DeliveryMode;

/// Netcode protocol id clients must present ("TTT1").
pub const PROTOCOL_ID: u64 = 0x5454_5431;

const CHANNEL_MEMORY_BYTES: usize = 5 * 1024 * 1024;

/// Delivery modes in the order their channels are drained.
const DELIVERY_MODES: [DeliveryMode; 3] = [
    DeliveryMode::ReliableOrdered,
    DeliveryMode::ReliableUnordered,
    DeliveryMode::Unreliable,
];

fn channel_id(mode: DeliveryMode) -> u8 {
    match mode {
        DeliveryMode::ReliableOrdered => DefaultChannel::ReliableOrdered.into(),
        DeliveryMode::ReliableUnordered => DefaultChannel::ReliableUnordered.into(),
        DeliveryMode::Unreliable => DefaultChannel::Unreliable.into(),
    }
}

/// renet's default channel layout with our resend interval.
fn channel_configs(resend_time: Duration) -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            channel_id: channel_id(DeliveryMode::ReliableOrdered),
            max_memory_usage_bytes: CHANNEL_MEMORY_BYTES,
            send_type: SendType::ReliableOrdered { resend_time },
        },
        ChannelConfig {
            channel_id: channel_id(DeliveryMode::ReliableUnordered),
            max_memory_usage_bytes: CHANNEL_MEMORY_BYTES,
            send_type: SendType::ReliableUnordered { resend_time },
        },
        ChannelConfig {
            channel_id: channel_id(DeliveryMode::Unreliable),
            max_memory_usage_bytes: CHANNEL_MEMORY_BYTES,
            send_type: SendType::Unreliable,
        },
    ]
}

fn disconnect_reason(reason: renet::DisconnectReason) -> DisconnectReason {
    match reason {
        renet::DisconnectReason::DisconnectedByClient => DisconnectReason::RemoteDisconnect,
        renet::DisconnectReason::DisconnectedByServer => DisconnectReason::LocalDisconnect,
        renet::DisconnectReason::Transport => DisconnectReason::Timeout,
        _ => DisconnectReason::ProtocolError,
    }
}

#[derive(Debug)]
struct Peer {
    client_id: ClientId,
    remote: SocketAddr,
}

/// Production [`Transport`] over UDP.
pub struct UdpTransport {
    server: RenetServer,
    netcode: NetcodeServerTransport,
    config: TransportConfig,
    local_addr: SocketAddr,
    next_id: ConnectionId,
    peers: HashMap<ConnectionId, Peer>,
    by_client: HashMap<ClientId, ConnectionId>,
    pending: HashMap<SocketAddr, ClientId>,
    last_update: Instant,
    last_latency_report: Instant,
    events: Vec<TransportEvent>,
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("peers", &self.peers)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl UdpTransport {
    /// Binds the socket on `addr` and starts a netcode server on it.
    pub fn bind(addr: SocketAddr, config: TransportConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)?;
        let local_addr = socket.local_addr()?;
        let current_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(io::Error::other)?;

        let public_addresses = if config.public_addresses.is_empty() {
            vec![local_addr]
        } else {
            config.public_addresses.clone()
        };
        let netcode = NetcodeServerTransport::new(
            NetcodeConfig {
                current_time,
                max_clients: config.max_clients,
                protocol_id: PROTOCOL_ID,
                public_addresses,
                authentication: ServerAuthentication::Unsecure,
            },
            socket,
        )?;

        let server = RenetServer::new(ConnectionConfig {
            server_channels_config: channel_configs(config.resend_interval()),
            client_channels_config: channel_configs(config.resend_interval()),
            ..Default::default()
        });
        info!("🌐 UDP transport bound to {}", local_addr);

        let now = Instant::now();
        Ok(Self {
            server,
            netcode,
            config,
            local_addr,
            next_id: 1,
            peers: HashMap::new(),
            by_client: HashMap::new(),
            pending: HashMap::new(),
            last_update: now,
            last_latency_report: now,
            events: Vec::new(),
        })
    }

    /// Number of accepted peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::ClientConnected { client_id } => {
                let Some(remote) = self.netcode.client_addr(client_id) else {
                    warn!("Client {} connected without a known address, dropping", client_id);
                    self.server.disconnect(client_id);
                    return;
                };
                debug!("Connection request from {} (client {})", remote, client_id);
                self.pending.insert(remote, client_id);
                self.events.push(TransportEvent::ConnectionRequest { remote });
            }
            ServerEvent::ClientDisconnected { client_id, reason } => {
                let Some(connection_id) = self.by_client.remove(&client_id) else {
                    // Never accepted, or already dropped locally
                    self.pending.retain(|_, pending| *pending != client_id);
                    return;
                };
                if let Some(peer) = self.peers.remove(&connection_id) {
                    debug!("Peer {} ({}) gone: {:?}", connection_id, peer.remote, reason);
                    self.events.push(TransportEvent::Disconnected {
                        connection_id,
                        remote: peer.remote,
                        reason: disconnect_reason(reason),
                    });
                }
            }
        }
    }

    fn receive_messages(&mut self) {
        for (&connection_id, peer) in &self.peers {
            for mode in DELIVERY_MODES {
                let channel = channel_id(mode);
                while let Some(payload) = self.server.receive_message(peer.client_id, channel) {
                    self.events.push(TransportEvent::Received {
                        connection_id,
                        payload,
                        mode,
                    });
                }
            }
        }
    }

    fn report_latency(&mut self) {
        for (&connection_id, peer) in &self.peers {
            if let Ok(info) = self.server.network_info(peer.client_id) {
                self.events.push(TransportEvent::LatencyUpdate {
                    connection_id,
                    latency: Duration::try_from_secs_f64(info.rtt).unwrap_or_default(),
                });
            }
        }
    }
}

impl Transport for UdpTransport {
    fn poll(&mut self) -> Vec<TransportEvent> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_update);
        self.last_update = now;

        self.server.update(delta);
        if let Err(e) = self.netcode.update(delta, &mut self.server) {
            self.events.push(TransportEvent::NetworkError {
                remote: None,
                error: io::Error::other(e.to_string()),
            });
        }

        while let Some(event) = self.server.get_event() {
            self.handle_server_event(event);
        }
        self.receive_messages();

        if now.duration_since(self.last_latency_report) >= self.config.latency_interval() {
            self.last_latency_report = now;
            self.report_latency();
        }

        std::mem::take(&mut self.events)
    }

    fn accept(&mut self, remote: SocketAddr) -> Result<ConnectionId, TransportError> {
        let client_id = self
            .pending
            .remove(&remote)
            .ok_or(TransportError::NoPendingRequest(remote))?;

        let connection_id = self.next_id;
        self.next_id += 1;
        self.peers.insert(connection_id, Peer { client_id, remote });
        self.by_client.insert(client_id, connection_id);

        self.events.push(TransportEvent::Connected {
            connection_id,
            remote,
        });
        Ok(connection_id)
    }

    fn reject(&mut self, remote: SocketAddr) {
        if let Some(client_id) = self.pending.remove(&remote) {
            self.server.disconnect(client_id);
        }
    }

    fn send(
        &mut self,
        connection_id: ConnectionId,
        payload: &[u8],
        mode: DeliveryMode,
    ) -> Result<(), TransportError> {
        let max = self.config.max_packet_size;
        if payload.len() > max {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max,
            });
        }

        let peer = self
            .peers
            .get(&connection_id)
            .ok_or(TransportError::UnknownPeer(connection_id))?;

        let channel = channel_id(mode);
        if !self.server.can_send_message(peer.client_id, channel, payload.len()) {
            return Err(TransportError::ChannelFull(connection_id));
        }
        self.server
            .send_message(peer.client_id, channel, Bytes::copy_from_slice(payload));
        Ok(())
    }

    fn flush(&mut self) {
        self.netcode.send_packets(&mut self.server);
    }

    fn disconnect(&mut self, connection_id: ConnectionId) {
        let Some(peer) = self.peers.remove(&connection_id) else {
            return;
        };
        self.by_client.remove(&peer.client_id);
        self.server.disconnect(peer.client_id);
        self.events.push(TransportEvent::Disconnected {
            connection_id,
            remote: peer.remote,
            reason: DisconnectReason::LocalDisconnect,
        });
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }
}

/// A renet client stepped by hand against a [`UdpTransport`].
#[cfg(test)]
pub(crate) mod test_client {
    use super::PROTOCOL_ID;
    use renet::{ConnectionConfig, RenetClient};
    use renet_netcode::{ClientAuthentication, NetcodeClientTransport};
    use std::net::{SocketAddr, UdpSocket};
    use std::time::{Instant, SystemTime, UNIX_EPOCH};

    pub(crate) struct TestClient {
        pub client: RenetClient,
        pub netcode: NetcodeClientTransport,
        last_update: Instant,
    }

    impl TestClient {
        pub(crate) fn connect(server_addr: SocketAddr, client_id: u64) -> Self {
            let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
            let current_time = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
            let authentication = ClientAuthentication::Unsecure {
                protocol_id: PROTOCOL_ID,
                client_id,
                server_addr,
                user_data: None,
            };
            Self {
                client: RenetClient::new(ConnectionConfig::default()),
                netcode: NetcodeClientTransport::new(current_time, authentication, socket).unwrap(),
                last_update: Instant::now(),
            }
        }

        /// Runs one client tick: receive, update, send.
        pub(crate) fn step(&mut self) {
            let now = Instant::now();
            let delta = now.duration_since(self.last_update);
            self.last_update = now;

            self.client.update(delta);
            // Errors here mean the server dropped us, which some tests expect
            let _ = self.netcode.update(delta, &mut self.client);
            let _ = self.netcode.send_packets(&mut self.client);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_client::TestClient;
    use super::*;
    use std::thread;

    fn test_config() -> TransportConfig {
        TransportConfig {
            latency_interval_ms: 60_000,
            ..TransportConfig::default()
        }
    }

    fn server(config: TransportConfig) -> UdpTransport {
        UdpTransport::bind("127.0.0.1:0".parse().unwrap(), config).unwrap()
    }

    /// Steps client and server until an event matches, returning every event seen.
    fn pump_until<F>(
        transport: &mut UdpTransport,
        client: &mut TestClient,
        mut found: F,
    ) -> Vec<TransportEvent>
    where
        F: FnMut(&TransportEvent) -> bool,
    {
        let mut seen = Vec::new();
        for _ in 0..400 {
            client.step();
            let events = transport.poll();
            transport.flush();
            let done = events.iter().any(&mut found);
            seen.extend(events);
            if done {
                return seen;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("expected event never arrived, saw {:?}", seen);
    }

    fn pump_client_until<F>(transport: &mut UdpTransport, client: &mut TestClient, mut done: F)
    where
        F: FnMut(&mut TestClient) -> bool,
    {
        for _ in 0..400 {
            client.step();
            transport.poll();
            transport.flush();
            if done(client) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("client never reached the expected state");
    }

    /// Runs the handshake and accepts the client.
    fn connected(transport: &mut UdpTransport, client_id: u64) -> (ConnectionId, TestClient) {
        let mut client = TestClient::connect(transport.local_addr().unwrap(), client_id);
        let events = pump_until(transport, &mut client, |e| {
            matches!(e, TransportEvent::ConnectionRequest { .. })
        });
        let remote = events
            .iter()
            .find_map(|e| match e {
                TransportEvent::ConnectionRequest { remote } => Some(*remote),
                _ => None,
            })
            .unwrap();
        assert_eq!(remote, client.netcode.addr().unwrap());
        let id = transport.accept(remote).unwrap();
        (id, client)
    }

    #[test]
    fn test_handshake_surfaces_request_then_connected() {
        let mut transport = server(test_config());
        let (id, client) = connected(&mut transport, 11);

        let events = transport.poll();
        assert!(events.iter().any(|e| matches!(
            e,
            TransportEvent::Connected { connection_id, remote }
                if *connection_id == id && *remote == client.netcode.addr().unwrap()
        )));
        assert_eq!(id, 1);
        assert_eq!(transport.peer_count(), 1);
    }

    #[test]
    fn test_accept_without_request_fails() {
        let mut transport = server(test_config());
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        assert!(matches!(
            transport.accept(addr),
            Err(TransportError::NoPendingRequest(a)) if a == addr
        ));
    }

    #[test]
    fn test_rejected_client_is_disconnected() {
        let mut transport = server(test_config());
        let mut client = TestClient::connect(transport.local_addr().unwrap(), 12);
        pump_until(&mut transport, &mut client, |e| {
            matches!(e, TransportEvent::ConnectionRequest { .. })
        });

        transport.reject(client.netcode.addr().unwrap());
        pump_client_until(&mut transport, &mut client, |c| c.client.is_disconnected());
        assert_eq!(transport.peer_count(), 0);
    }

    #[test]
    fn test_messages_arrive_with_their_delivery_mode() {
        let mut transport = server(test_config());
        let (id, mut client) = connected(&mut transport, 13);

        client
            .client
            .send_message(DefaultChannel::ReliableOrdered, vec![0x04]);
        client
            .client
            .send_message(DefaultChannel::Unreliable, vec![0x06, 1, 2]);

        let mut seen = Vec::new();
        for _ in 0..400 {
            client.step();
            seen.extend(transport.poll().into_iter().filter_map(|e| match e {
                TransportEvent::Received {
                    connection_id,
                    payload,
                    mode,
                } if connection_id == id => Some((payload, mode)),
                _ => None,
            }));
            if seen.len() == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(seen.contains(&(Bytes::from_static(&[0x04]), DeliveryMode::ReliableOrdered)));
        assert!(seen.contains(&(Bytes::from_static(&[0x06, 1, 2]), DeliveryMode::Unreliable)));
    }

    #[test]
    fn test_send_reaches_client_on_matching_channel() {
        let mut transport = server(test_config());
        let (id, mut client) = connected(&mut transport, 14);
        transport.poll();

        transport
            .send(id, &[0x02, 0xFF], DeliveryMode::ReliableUnordered)
            .unwrap();
        transport.flush();

        let mut received = None;
        pump_client_until(&mut transport, &mut client, |c| {
            received = c.client.receive_message(DefaultChannel::ReliableUnordered);
            received.is_some()
        });
        assert_eq!(received.as_deref(), Some(&[0x02, 0xFF][..]));
    }

    #[test]
    fn test_send_rejects_oversized_payload_and_unknown_peer() {
        let mut transport = server(test_config());
        let (id, _client) = connected(&mut transport, 15);

        let big = vec![0u8; 1_201];
        assert!(matches!(
            transport.send(id, &big, DeliveryMode::Unreliable),
            Err(TransportError::PayloadTooLarge { len: 1_201, max: 1_200 })
        ));
        assert!(matches!(
            transport.send(999, &[1], DeliveryMode::Unreliable),
            Err(TransportError::UnknownPeer(999))
        ));
    }

    #[test]
    fn test_remote_disconnect() {
        let mut transport = server(test_config());
        let (id, mut client) = connected(&mut transport, 16);
        transport.poll();

        client.netcode.disconnect();
        let events = pump_until(&mut transport, &mut client, |e| {
            matches!(e, TransportEvent::Disconnected { .. })
        });
        assert!(events.iter().any(|e| matches!(
            e,
            TransportEvent::Disconnected {
                connection_id,
                reason: DisconnectReason::RemoteDisconnect,
                ..
            } if *connection_id == id
        )));
        assert_eq!(transport.peer_count(), 0);
    }

    #[test]
    fn test_local_disconnect_drops_client() {
        let mut transport = server(test_config());
        let (id, mut client) = connected(&mut transport, 17);
        transport.poll();

        transport.disconnect(id);
        assert!(transport.poll().iter().any(|e| matches!(
            e,
            TransportEvent::Disconnected { reason: DisconnectReason::LocalDisconnect, .. }
        )));
        pump_client_until(&mut transport, &mut client, |c| c.client.is_disconnected());

        // Unknown ids are ignored
        transport.disconnect(id);
        assert!(!transport
            .poll()
            .iter()
            .any(|e| matches!(e, TransportEvent::Disconnected { .. })));
    }

    #[test]
    fn test_latency_is_reported_for_accepted_peers() {
        let config = TransportConfig {
            latency_interval_ms: 0,
            ..TransportConfig::default()
        };
        let mut transport = server(config);
        let (id, mut client) = connected(&mut transport, 18);

        let events = pump_until(&mut transport, &mut client, |e| {
            matches!(e, TransportEvent::LatencyUpdate { .. })
        });
        assert!(events.iter().any(|e| matches!(
            e,
            TransportEvent::LatencyUpdate { connection_id, .. } if *connection_id == id
        )));
    }
}
