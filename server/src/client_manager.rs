//! Connection tracking for participants talking to the server
//!
//! Every socket address that completes the `Connect` handshake gets a
//! participant id. That id is what sessions, votes and scores refer to.
//! The manager also watches for participants that stop sending packets so
//! their seats can be released.

use log::info;
use shared::ParticipantId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected participant
#[derive(Debug)]
pub struct Client {
    pub id: ParticipantId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: ParticipantId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing has been heard from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Assigns participant ids and maps them to socket addresses
///
/// Ids start at 1 and are never reused while the server runs, so a stale
/// packet from a previous connection cannot act as a newer participant.
pub struct ClientManager {
    clients: HashMap<ParticipantId, Client>,
    next_client_id: ParticipantId,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Registers a new connection
    ///
    /// Returns None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<ParticipantId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Returns true if the client was found and removed
    pub fn remove_client(&mut self, client_id: &ParticipantId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ParticipantId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Marks the client at `addr` as alive and returns its id
    pub fn touch(&mut self, addr: SocketAddr) -> Option<ParticipantId> {
        let client = self.clients.values_mut().find(|client| client.addr == addr)?;
        client.touch();
        Some(client.id)
    }

    /// Removes clients that have gone quiet and returns their ids
    ///
    /// The caller is responsible for taking them out of their sessions.
    pub fn check_timeouts(&mut self) -> Vec<ParticipantId> {
        let timed_out: Vec<ParticipantId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(self.timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn get_client_addr(&self, client_id: ParticipantId) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    /// Resolves participant ids to addresses, skipping unknown ids
    pub fn get_client_addrs(&self, client_ids: &[ParticipantId]) -> Vec<(ParticipantId, SocketAddr)> {
        client_ids
            .iter()
            .filter_map(|id| self.get_client_addr(*id).map(|addr| (*id, addr)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
