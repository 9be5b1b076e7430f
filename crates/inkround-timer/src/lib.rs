//! Deferred round timers and drawing-phase deadlines for Inkround.
//!
//! A drawing phase ends either early (everyone guessed) or when its clock
//! runs out. The clock is a Tokio task per room that sleeps for the round
//! duration and then posts a [`TimerKey`] on a channel. Whoever drains
//! that channel owns the game state and decides whether the key still
//! names the current turn; a key for a turn that already ended is ignored.
//!
//! ```text
//! start_active_round ──arm(key, 60s)──→ [sleep task] ──key──→ fired channel
//!        end_round   ──cancel(room)───→ (task aborted)
//! ```
//!
//! # Integration
//!
//! ```ignore
//! let (mut timers, mut fired) = RoundTimers::new();
//! timers.arm(TimerKey::new(room_id, 1, "ada", "apple"), Duration::from_secs(60));
//! while let Some(key) = fired.recv().await {
//!     engine.lock().await.round_timer_fired(key);
//! }
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use inkround_protocol::RoomId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// TimerKey
// ---------------------------------------------------------------------------

/// Identifies the turn a timer was armed for.
///
/// `turn` alone tells turns apart; drawer and word are checked too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub room_id: RoomId,
    /// Per-room sequence number of the turn, never reused.
    pub turn: u64,
    /// Nickname of the drawer when the timer was armed.
    pub drawer: String,
    /// The secret word when the timer was armed.
    pub word: String,
}

impl TimerKey {
    pub fn new(
        room_id: RoomId,
        turn: u64,
        drawer: impl Into<String>,
        word: impl Into<String>,
    ) -> Self {
        Self {
            room_id,
            turn,
            drawer: drawer.into(),
            word: word.into(),
        }
    }
}

pub type FiredReceiver = mpsc::UnboundedReceiver<TimerKey>;

// ---------------------------------------------------------------------------
// RoundTimers
// ---------------------------------------------------------------------------

/// At most one pending round timer per room.
///
/// Must be used from within a Tokio runtime: arming spawns a task.
#[derive(Debug)]
pub struct RoundTimers {
    fired: mpsc::UnboundedSender<TimerKey>,
    pending: HashMap<RoomId, JoinHandle<()>>,
}

impl RoundTimers {
    /// Creates the timer set and the channel expired keys arrive on.
    pub fn new() -> (Self, FiredReceiver) {
        let (fired, rx) = mpsc::unbounded_channel();
        (
            Self {
                fired,
                pending: HashMap::new(),
            },
            rx,
        )
    }

    /// Schedules `key` to be posted after `after`.
    ///
    /// Replaces (and aborts) any timer already pending for the same room.
    pub fn arm(&mut self, key: TimerKey, after: Duration) {
        let room_id = key.room_id.clone();
        debug!(%room_id, drawer = %key.drawer, secs = after.as_secs_f64(), "round timer armed");
        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            trace!(room_id = %key.room_id, "round timer expired");
            // Receiver gone means the server is shutting down.
            let _ = fired.send(key);
        });
        if let Some(previous) = self.pending.insert(room_id, handle) {
            previous.abort();
        }
    }

    /// Aborts the room's pending timer. Returns whether one was pending.
    pub fn cancel(&mut self, room_id: &RoomId) -> bool {
        match self.pending.remove(room_id) {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                if was_pending {
                    debug!(%room_id, "round timer cancelled");
                }
                was_pending
            }
            None => false,
        }
    }

    /// Whether the room has a timer that has not fired yet.
    pub fn is_armed(&self, room_id: &RoomId) -> bool {
        self.pending
            .get(room_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Forgets the bookkeeping of timers that already fired.
    pub fn prune(&mut self) {
        self.pending.retain(|_, handle| !handle.is_finished());
    }
}

impl Drop for RoundTimers {
    fn drop(&mut self) {
        for handle in self.pending.values() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// The running clock of one drawing phase.
///
/// Keeps a monotonic start/end for scoring and a wall-clock end for
/// clients, which render their own countdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadline {
    started: Instant,
    length: Duration,
    ends_unix: f64,
}

impl Deadline {
    /// Starts a clock of `length` at `now`.
    pub fn start(now: Instant, length: Duration) -> Self {
        Self {
            started: now,
            length,
            ends_unix: unix_now() + length.as_secs_f64(),
        }
    }

    /// Time since the clock started.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Time left, zero once expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.length.saturating_sub(self.elapsed(now))
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// Wall-clock end as Unix seconds.
    pub fn ends_unix(&self) -> f64 {
        self.ends_unix
    }
}

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
