//! The connection directory: live outbound handles per room.
//!
//! Each socket task owns the receiving half of an unbounded channel and
//! writes whatever arrives to its socket. The directory keeps the sending
//! halves, keyed by room and connection id, so the engine can deliver
//! events without ever awaiting on a socket.
//!
//! A send into a channel whose task has ended fails immediately. The
//! directory drops that handle on the spot and reports the id, so the
//! caller can mark the player disconnected.

use std::collections::HashMap;

use inkround_protocol::{ConnectionId, Recipient, RoomId, ServerEvent};
use tokio::sync::mpsc;

use crate::SessionError;

/// What a socket task is asked to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Encode and write one event.
    Event(ServerEvent),
    /// Close the socket and stop.
    Close,
}

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Creates the channel pair for one socket task.
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// Live connections of every room.
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    rooms: HashMap<RoomId, HashMap<ConnectionId, OutboundSender>>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the handle for `connection_id`, replacing any previous one.
    pub fn register(&mut self, room_id: &RoomId, connection_id: ConnectionId, sender: OutboundSender) {
        tracing::debug!(%room_id, %connection_id, "connection registered");
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id, sender);
    }

    /// Drops the handle for `connection_id`.
    ///
    /// When `sender` is given, the entry is removed only if it still holds
    /// that same channel; a stale socket task cannot evict the handle of a
    /// newer socket that reused the id. Returns whether anything was removed.
    pub fn unregister(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        sender: Option<&OutboundSender>,
    ) -> bool {
        let Some(conns) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let matches = match (conns.get(connection_id), sender) {
            (Some(current), Some(sender)) => current.same_channel(sender),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches {
            conns.remove(connection_id);
            if conns.is_empty() {
                self.rooms.remove(room_id);
            }
            tracing::debug!(%room_id, %connection_id, "connection unregistered");
        }
        matches
    }

    /// Whether `connection_id` has a live handle in the room.
    pub fn contains(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|conns| conns.contains_key(connection_id))
    }

    /// Number of live handles in the room.
    pub fn live_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, HashMap::len)
    }

    /// Ids of the room's live handles, in no particular order.
    pub fn connections(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|conns| conns.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Sends one event to one connection.
    ///
    /// # Errors
    /// - [`SessionError::UnknownConnection`] if no handle is registered.
    /// - [`SessionError::SendFailed`] if the socket task is gone; the handle
    ///   is removed before returning.
    pub fn send(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        event: ServerEvent,
    ) -> Result<(), SessionError> {
        let sender = self
            .rooms
            .get(room_id)
            .and_then(|conns| conns.get(connection_id))
            .ok_or_else(|| SessionError::UnknownConnection {
                room_id: room_id.clone(),
                connection_id: connection_id.clone(),
            })?;
        if sender.send(Outbound::Event(event)).is_err() {
            tracing::debug!(%room_id, %connection_id, "send failed, dropping connection");
            self.unregister(room_id, connection_id, None);
            return Err(SessionError::SendFailed(connection_id.clone()));
        }
        Ok(())
    }

    /// Sends `event` to every live handle in the room except `except`.
    ///
    /// One failed send never stops the rest. Returns the ids whose send
    /// failed; those handles have already been removed.
    pub fn broadcast(
        &mut self,
        room_id: &RoomId,
        event: &ServerEvent,
        except: Option<&ConnectionId>,
    ) -> Vec<ConnectionId> {
        let Some(conns) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        let failed: Vec<ConnectionId> = conns
            .iter()
            .filter(|(id, _)| Some(*id) != except)
            .filter(|(_, sender)| sender.send(Outbound::Event(event.clone())).is_err())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &failed {
            tracing::debug!(%room_id, connection_id = %id, "broadcast failed, dropping connection");
            self.unregister(room_id, id, None);
        }
        failed
    }

    /// Resolves `recipient` and delivers `event`. Returns the failed ids.
    pub fn deliver(
        &mut self,
        room_id: &RoomId,
        recipient: &Recipient,
        event: ServerEvent,
    ) -> Vec<ConnectionId> {
        match recipient {
            Recipient::All => self.broadcast(room_id, &event, None),
            Recipient::AllExcept(skip) => self.broadcast(room_id, &event, Some(skip)),
            Recipient::Connection(id) => match self.send(room_id, id, event) {
                Ok(()) => Vec::new(),
                Err(SessionError::SendFailed(id)) => vec![id],
                // Not registered: nothing to drop, nobody to notify.
                Err(SessionError::UnknownConnection { .. }) => Vec::new(),
            },
        }
    }

    /// Asks every socket of the room to close and forgets them all.
    /// Returns how many handles there were.
    pub fn close_room(&mut self, room_id: &RoomId) -> usize {
        let Some(conns) = self.rooms.remove(room_id) else {
            return 0;
        };
        for sender in conns.values() {
            let _ = sender.send(Outbound::Close);
        }
        conns.len()
    }
}
