//! The engine: one service object owning every room, every live
//! connection handle and every round timer.
//!
//! Callers hold it behind a `tokio::sync::Mutex` and call its methods
//! with the lock held. No method awaits: each one decodes nothing,
//! mutates state, then pushes the resulting events into per-connection
//! channels, so every operation is atomic with respect to the others.

use std::collections::BTreeMap;
use std::time::Instant;

use inkround_protocol::{
    ClientMessage, ConfigPatch, ConnectionId, GameType, RoomId, RoomListing, ServerEvent,
};
use inkround_room::{Outbox, RoomError, RoomRegistry, TimerCommand};
use inkround_session::{ConnectionDirectory, OutboundSender};
use inkround_timer::{FiredReceiver, RoundTimers, TimerKey};

/// Monotonic "now" that follows Tokio's clock, so paused-time tests
/// drive scoring and expiry too.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Rooms, connections and timers of one server.
#[derive(Debug)]
pub struct Engine {
    registry: RoomRegistry,
    directory: ConnectionDirectory,
    timers: RoundTimers,
}

impl Engine {
    /// Wraps `registry` and returns the channel expired round timers
    /// arrive on. Feed every key from it back into
    /// [`round_timer_fired`](Self::round_timer_fired).
    pub fn new(registry: RoomRegistry) -> (Self, FiredReceiver) {
        let (timers, fired) = RoundTimers::new();
        let engine = Self {
            registry,
            directory: ConnectionDirectory::new(),
            timers,
        };
        (engine, fired)
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Room entry points (what an HTTP layer would call)
    // -----------------------------------------------------------------------

    /// # Errors
    /// [`RoomError::NameConflict`] on a duplicate name.
    pub fn create_room(
        &mut self,
        name: &str,
        password: Option<&str>,
        game_type: GameType,
        config: Option<&ConfigPatch>,
    ) -> Result<RoomId, RoomError> {
        self.registry
            .create_room(name, password, game_type, config, now())
    }

    pub fn list_rooms(&self) -> Vec<RoomListing> {
        self.registry.rooms()
    }

    pub fn word_set_metadata(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.word_set_metadata()
    }

    pub fn room_exists(&self, room_id: &RoomId) -> bool {
        self.registry.contains(room_id)
    }

    /// Live connection handles in a room.
    pub fn live_connections(&self, room_id: &RoomId) -> usize {
        self.directory.live_count(room_id)
    }

    /// Whether the room has a round timer pending.
    pub fn timer_armed(&self, room_id: &RoomId) -> bool {
        self.timers.is_armed(room_id)
    }

    /// Broadcasts `ROOM_CLOSED`, closes every socket of the room and
    /// deletes it. Returns `false` for an unknown room.
    pub fn close_room(&mut self, room_id: &RoomId) -> bool {
        if self.registry.remove(room_id).is_none() {
            return false;
        }
        self.directory
            .broadcast(room_id, &ServerEvent::RoomClosed {}, None);
        let closed = self.directory.close_room(room_id);
        self.timers.cancel(room_id);
        tracing::info!(%room_id, connections = closed, "room closed");
        true
    }

    /// Deletes rooms that stayed empty past the grace period, with their
    /// handles and timers. Returns the removed ids.
    pub fn cleanup_empty_rooms(&mut self) -> Vec<RoomId> {
        let removed = self.registry.cleanup_empty_rooms(now());
        for room_id in &removed {
            self.directory.close_room(room_id);
            self.timers.cancel(room_id);
        }
        self.timers.prune();
        removed
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Registers a freshly accepted socket. Returns `false` if the room
    /// does not exist; the caller should close the socket.
    pub fn connect(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        sender: OutboundSender,
    ) -> bool {
        let Some(room) = self.registry.get_mut(room_id) else {
            tracing::debug!(%room_id, %connection_id, "connect to unknown room");
            return false;
        };
        room.mark_occupied();
        self.directory
            .register(room_id, connection_id.clone(), sender);
        true
    }

    /// The socket behind `sender` is gone.
    ///
    /// Only forgets the handle if it is still the registered one, so a
    /// stale task never disconnects a newer socket on the same id.
    pub fn disconnect(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        sender: &OutboundSender,
    ) {
        if !self
            .directory
            .unregister(room_id, connection_id, Some(sender))
        {
            return;
        }
        let Some(room) = self.registry.get_mut(room_id) else {
            return;
        };
        let outbox = room.disconnect(connection_id);
        if self.directory.live_count(room_id) == 0 {
            room.mark_empty(now());
        }
        self.dispatch(room_id, outbox);
    }

    // -----------------------------------------------------------------------
    // Inbound messages
    // -----------------------------------------------------------------------

    /// Applies one decoded client message.
    ///
    /// Only `JOIN` is accepted from a connection that has not joined.
    /// Rule violations come back to the sender as `ERROR`; host-only
    /// requests from anyone else are ignored.
    pub fn handle(&mut self, room_id: &RoomId, connection_id: &ConnectionId, msg: ClientMessage) {
        let now = now();
        let outbox = match msg {
            ClientMessage::Join {
                nickname,
                password,
                token,
            } => self
                .registry
                .join(
                    room_id,
                    connection_id,
                    &nickname,
                    password.as_deref(),
                    token.as_deref(),
                    now,
                )
                .map(|(_, outbox)| outbox)
                .unwrap_or_else(|err| error_reply(connection_id, err)),
            ClientMessage::CloseRoom => {
                let authorized = self.registry.get(room_id).and_then(|room| {
                    room.nickname_of(connection_id)
                        .map(|nickname| room.authorize_close(nickname))
                });
                match authorized {
                    Some(Ok(())) => {
                        self.close_room(room_id);
                        return;
                    }
                    Some(Err(err)) => error_reply(connection_id, err),
                    None => return,
                }
            }
            msg => {
                let Some(room) = self.registry.get_mut(room_id) else {
                    return;
                };
                let Some(nickname) = room.nickname_of(connection_id).map(str::to_string) else {
                    tracing::debug!(%room_id, %connection_id, "message before join ignored");
                    return;
                };
                match msg {
                    ClientMessage::ToggleReady { is_ready } => room.set_ready(&nickname, is_ready),
                    ClientMessage::UpdateConfig { config } => room.update_config(&nickname, &config),
                    ClientMessage::StartGame => room
                        .start_game(&nickname, now)
                        .unwrap_or_else(|err| error_reply(connection_id, err)),
                    ClientMessage::Chat { text } => room.chat(&nickname, &text, now),
                    ClientMessage::DrawStroke { stroke } => {
                        let mut outbox = Outbox::new();
                        if room.record_stroke(&nickname, stroke.clone()) {
                            outbox.to_all_except(connection_id, ServerEvent::DrawStroke(stroke));
                        }
                        outbox
                    }
                    ClientMessage::UndoStroke => room.undo_stroke(&nickname),
                    ClientMessage::StartRound => room.start_round(now),
                    ClientMessage::ClearCanvas => room.clear_canvas(&nickname),
                    ClientMessage::LeaveRoom => room.leave(&nickname, now),
                    ClientMessage::ReturnToLobby => room
                        .return_to_lobby(&nickname)
                        .unwrap_or_else(|err| error_reply(connection_id, err)),
                    ClientMessage::Join { .. } | ClientMessage::CloseRoom => Outbox::new(),
                }
            }
        };
        self.dispatch(room_id, outbox);
    }

    /// A round timer expired. Ends the turn if the key still names it.
    pub fn round_timer_fired(&mut self, key: TimerKey) {
        let room_id = key.room_id.clone();
        let Some(room) = self.registry.get_mut(&room_id) else {
            tracing::debug!(%room_id, "round timer for a removed room");
            return;
        };
        let outbox = room.round_timer_fired(&key, now());
        self.dispatch(&room_id, outbox);
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Applies the timer command, then delivers events in order.
    ///
    /// A connection whose send fails is demoted to disconnected and the
    /// resulting `PLAYER_DISCONNECTED` is delivered in turn, until a pass
    /// completes without failures.
    fn dispatch(&mut self, room_id: &RoomId, outbox: Outbox) {
        let mut pending = outbox;
        loop {
            let Outbox { messages, timer } = pending;
            match timer {
                Some(TimerCommand::Arm { key, after }) => self.timers.arm(key, after),
                Some(TimerCommand::Cancel) => {
                    self.timers.cancel(room_id);
                }
                None => {}
            }

            let mut failed = Vec::new();
            for (recipient, event) in messages {
                failed.extend(self.directory.deliver(room_id, &recipient, event));
            }
            if failed.is_empty() {
                return;
            }

            let Some(room) = self.registry.get_mut(room_id) else {
                return;
            };
            let mut next = Outbox::new();
            for connection_id in &failed {
                tracing::warn!(%room_id, %connection_id, "delivery failed, marking disconnected");
                next.extend(room.disconnect(connection_id));
            }
            if self.directory.live_count(room_id) == 0 {
                room.mark_empty(now());
            }
            pending = next;
        }
    }
}

/// `ERROR` for the requester, except authorization failures, which are
/// dropped.
fn error_reply(connection_id: &ConnectionId, err: RoomError) -> Outbox {
    if err == RoomError::NotAuthorized {
        tracing::debug!(%connection_id, "host-only request ignored");
        return Outbox::new();
    }
    tracing::debug!(%connection_id, error = %err, "request rejected");
    Outbox::reply(
        connection_id,
        ServerEvent::Error {
            message: err.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use inkround_protocol::{Phase, Stroke};
    use inkround_room::RegistryConfig;
    use inkround_session::{Outbound, OutboundReceiver, outbound_channel};

    use super::*;

    struct Client {
        conn: ConnectionId,
        tx: OutboundSender,
        rx: OutboundReceiver,
    }

    impl Client {
        fn events(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(out) = self.rx.try_recv() {
                if let Outbound::Event(event) = out {
                    events.push(event);
                }
            }
            events
        }
    }

    fn engine() -> (Engine, FiredReceiver) {
        Engine::new(RoomRegistry::new(RegistryConfig::default()))
    }

    fn open(engine: &mut Engine, room_id: &RoomId, conn: &str) -> Client {
        let (tx, rx) = outbound_channel();
        let conn = ConnectionId::from(conn);
        assert!(engine.connect(room_id, &conn, tx.clone()));
        Client { conn, tx, rx }
    }

    fn join(engine: &mut Engine, room_id: &RoomId, client: &Client, nickname: &str) {
        engine.handle(
            room_id,
            &client.conn,
            ClientMessage::Join {
                nickname: nickname.into(),
                password: None,
                token: None,
            },
        );
    }

    fn room(engine: &mut Engine) -> RoomId {
        engine
            .create_room("Doodles", None, GameType::Drawing, None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_unknown_room_is_refused() {
        let (mut engine, _fired) = engine();
        let (tx, _rx) = outbound_channel();
        assert!(!engine.connect(&RoomId::from("nope"), &ConnectionId::from("c1"), tx));
    }

    #[tokio::test]
    async fn test_message_before_join_is_ignored() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let mut ada = open(&mut engine, &id, "c1");
        engine.handle(&id, &ada.conn, ClientMessage::Chat { text: "hi".into() });
        assert!(ada.events().is_empty());
    }

    #[tokio::test]
    async fn test_join_replies_to_joiner_and_announces() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let mut ada = open(&mut engine, &id, "c1");
        let mut bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");

        let ada_events = ada.events();
        assert!(matches!(ada_events[0], ServerEvent::JoinSuccess { is_host: true, .. }));
        assert!(matches!(
            ada_events.last(),
            Some(ServerEvent::PlayerJoined { total_players: 2, .. })
        ));
        let bob_events = bob.events();
        assert!(matches!(bob_events[0], ServerEvent::JoinSuccess { is_host: false, .. }));
    }

    #[tokio::test]
    async fn test_nickname_taken_is_reported_as_error() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let ada = open(&mut engine, &id, "c1");
        let mut imposter = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &imposter, "ada");

        assert_eq!(
            imposter.events(),
            vec![ServerEvent::Error {
                message: "Nickname \"ada\" is already taken in this room.".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_start_game_by_non_host_is_silent() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let ada = open(&mut engine, &id, "c1");
        let mut bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        bob.events();

        engine.handle(&id, &bob.conn, ClientMessage::StartGame);
        assert!(bob.events().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_marks_player_and_stamps_empty() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let ada = open(&mut engine, &id, "c1");
        let mut bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        bob.events();

        engine.disconnect(&id, &ada.conn, &ada.tx);
        assert_eq!(
            bob.events(),
            vec![ServerEvent::PlayerDisconnected {
                nickname: "ada".into()
            }]
        );
        assert!(engine.registry().get(&id).unwrap().empty_since().is_none());

        engine.disconnect(&id, &bob.conn, &bob.tx);
        assert!(engine.registry().get(&id).unwrap().empty_since().is_some());
    }

    #[tokio::test]
    async fn test_stale_socket_cannot_evict_newer_handle() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let old = open(&mut engine, &id, "c1");
        join(&mut engine, &id, &old, "ada");
        let newer = open(&mut engine, &id, "c1");

        engine.disconnect(&id, &old.conn, &old.tx);

        assert_eq!(engine.live_connections(&id), 1);
        assert!(engine.registry().get(&id).unwrap().player("ada").unwrap().connected);
        drop(newer);
    }

    #[tokio::test]
    async fn test_failed_delivery_demotes_connection() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let ada = open(&mut engine, &id, "c1");
        let bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        let Client { rx, .. } = bob;
        drop(rx);

        engine.handle(&id, &ada.conn, ClientMessage::Chat { text: "hi".into() });

        let room = engine.registry().get(&id).unwrap();
        assert!(!room.player("bob").unwrap().connected);
        assert_eq!(engine.live_connections(&id), 1);
    }

    #[tokio::test]
    async fn test_stroke_is_relayed_to_everyone_but_drawer() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let mut ada = open(&mut engine, &id, "c1");
        let mut bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        for client in [&ada, &bob] {
            engine.handle(&id, &client.conn, ClientMessage::ToggleReady { is_ready: true });
        }
        engine.handle(&id, &ada.conn, ClientMessage::StartGame);
        let drawer = engine.registry().get(&id).unwrap().game().unwrap().drawer().unwrap().to_string();
        let (drawing, watching) = if drawer == "ada" {
            (&mut ada, &mut bob)
        } else {
            (&mut bob, &mut ada)
        };
        drawing.events();
        watching.events();

        let stroke = Stroke::with_action_id("g1");
        engine.handle(&id, &drawing.conn, ClientMessage::DrawStroke { stroke: stroke.clone() });

        assert!(drawing.events().is_empty());
        assert_eq!(watching.events(), vec![ServerEvent::DrawStroke(stroke)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_timer_ends_turn() {
        let (mut engine, mut fired) = engine();
        let id = engine
            .create_room(
                "Quick",
                None,
                GameType::Drawing,
                Some(&ConfigPatch {
                    round_duration: Some(5),
                    ..ConfigPatch::default()
                }),
            )
            .unwrap();
        let ada = open(&mut engine, &id, "c1");
        let bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        for client in [&ada, &bob] {
            engine.handle(&id, &client.conn, ClientMessage::ToggleReady { is_ready: true });
        }
        engine.handle(&id, &ada.conn, ClientMessage::StartGame);
        engine.handle(&id, &ada.conn, ClientMessage::StartRound);
        assert!(engine.timer_armed(&id));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let key = fired.recv().await.unwrap();
        engine.round_timer_fired(key);

        let game = engine.registry().get(&id).unwrap().game().unwrap();
        assert_eq!(game.phase(), Phase::DrawerPreparing);
        assert!(game.last_word().is_some());
    }

    #[tokio::test]
    async fn test_return_to_lobby_disarms_timer_and_admits_new_players() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let ada = open(&mut engine, &id, "c1");
        let bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        for client in [&ada, &bob] {
            engine.handle(&id, &client.conn, ClientMessage::ToggleReady { is_ready: true });
        }
        engine.handle(&id, &ada.conn, ClientMessage::StartGame);
        engine.handle(&id, &ada.conn, ClientMessage::StartRound);
        assert!(engine.timer_armed(&id));

        engine.handle(&id, &bob.conn, ClientMessage::ReturnToLobby);
        assert!(engine.timer_armed(&id), "bob is not the host");

        engine.handle(&id, &ada.conn, ClientMessage::ReturnToLobby);
        assert!(!engine.timer_armed(&id));

        let mut cyd = open(&mut engine, &id, "c3");
        join(&mut engine, &id, &cyd, "cyd");
        assert!(matches!(
            cyd.events().first(),
            Some(ServerEvent::JoinSuccess { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_room_by_host_closes_sockets() {
        let (mut engine, _fired) = engine();
        let id = room(&mut engine);
        let ada = open(&mut engine, &id, "c1");
        let mut bob = open(&mut engine, &id, "c2");
        join(&mut engine, &id, &ada, "ada");
        join(&mut engine, &id, &bob, "bob");
        bob.events();

        engine.handle(&id, &bob.conn, ClientMessage::CloseRoom);
        assert!(engine.room_exists(&id), "bob is not the host");

        engine.handle(&id, &ada.conn, ClientMessage::CloseRoom);
        assert!(!engine.room_exists(&id));
        assert_eq!(bob.rx.try_recv().unwrap(), Outbound::Event(ServerEvent::RoomClosed {}));
        assert_eq!(bob.rx.try_recv().unwrap(), Outbound::Close);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_empty_rooms_after_grace() {
        let (mut engine, _fired) = engine();
        let idle = room(&mut engine);
        let busy = engine
            .create_room("Busy", None, GameType::Drawing, None)
            .unwrap();
        let _ada = open(&mut engine, &busy, "c1");

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(engine.cleanup_empty_rooms(), vec![idle.clone()]);
        assert!(!engine.room_exists(&idle));
        assert!(engine.room_exists(&busy));
    }
}
