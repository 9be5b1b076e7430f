//! What a room operation wants done once it returns.
//!
//! Room methods never touch sockets or spawn tasks. They mutate state and
//! return an [`Outbox`]: addressed events in delivery order plus, at most,
//! one instruction for the room's round timer.

use std::time::Duration;

use inkround_protocol::{ConnectionId, Recipient, ServerEvent};
use inkround_timer::TimerKey;

/// Instruction for the room's round timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    /// Fire `key` after `after`, replacing any pending timer.
    Arm { key: TimerKey, after: Duration },
    /// The turn ended; drop any pending timer.
    Cancel,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outbox {
    pub messages: Vec<(Recipient, ServerEvent)>,
    pub timer: Option<TimerCommand>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox with a single event for one connection.
    pub fn reply(connection_id: &ConnectionId, event: ServerEvent) -> Self {
        let mut outbox = Self::new();
        outbox.to(connection_id, event);
        outbox
    }

    pub fn to_all(&mut self, event: ServerEvent) {
        self.messages.push((Recipient::All, event));
    }

    pub fn to_all_except(&mut self, connection_id: &ConnectionId, event: ServerEvent) {
        self.messages
            .push((Recipient::AllExcept(connection_id.clone()), event));
    }

    pub fn to(&mut self, connection_id: &ConnectionId, event: ServerEvent) {
        self.messages
            .push((Recipient::Connection(connection_id.clone()), event));
    }

    pub fn arm_timer(&mut self, key: TimerKey, after: Duration) {
        self.timer = Some(TimerCommand::Arm { key, after });
    }

    pub fn cancel_timer(&mut self) {
        self.timer = Some(TimerCommand::Cancel);
    }

    /// Appends `other`'s events; its timer command wins if it has one.
    pub fn extend(&mut self, other: Outbox) {
        self.messages.extend(other.messages);
        if other.timer.is_some() {
            self.timer = other.timer;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.timer.is_none()
    }

    /// Events that `connection_id` would receive, in order.
    pub fn events_for<'a>(&'a self, connection_id: &'a ConnectionId) -> impl Iterator<Item = &'a ServerEvent> + 'a {
        self.messages.iter().filter_map(move |(to, event)| {
            let hit = match to {
                Recipient::All => true,
                Recipient::AllExcept(skip) => skip != connection_id,
                Recipient::Connection(id) => id == connection_id,
            };
            hit.then_some(event)
        })
    }
}
