//! The shared canvas: an append-only stroke ledger with grouped undo.

use inkround_protocol::{ServerEvent, Stroke};

use crate::{Outbox, Room};

/// Strokes of the current turn in arrival order.
#[derive(Debug, Clone, Default)]
pub struct StrokeLedger {
    strokes: Vec<Stroke>,
}

impl StrokeLedger {
    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Removes the last gesture.
    ///
    /// If the last stroke carries an `actionId`, every stroke with that id
    /// goes, wherever it sits in the ledger; otherwise just the last
    /// stroke. Returns `false` if the ledger was empty.
    pub fn undo(&mut self) -> bool {
        let Some(last) = self.strokes.last() else {
            return false;
        };
        match last.action_id().cloned() {
            Some(action_id) => self.strokes.retain(|s| s.action_id() != Some(&action_id)),
            None => {
                self.strokes.pop();
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn as_slice(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

impl Room {
    /// Appends a stroke from `nickname` if they are the active drawer.
    ///
    /// Returns whether it was accepted; the caller relays accepted strokes
    /// to everyone but the author.
    pub fn record_stroke(&mut self, nickname: &str, stroke: Stroke) -> bool {
        let Some(game) = self.game.as_mut() else {
            return false;
        };
        if !game.is_active_drawer(nickname) {
            tracing::trace!(room_id = %self.id, %nickname, "stroke from non-drawer dropped");
            return false;
        }
        game.strokes.push(stroke);
        true
    }

    /// Undoes the drawer's last gesture and resends the whole canvas.
    pub fn undo_stroke(&mut self, nickname: &str) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(game) = self.game.as_mut() else {
            return outbox;
        };
        if !game.is_active_drawer(nickname) || !game.strokes.undo() {
            return outbox;
        }
        outbox.to_all(ServerEvent::StrokeHistoryUpdate {
            history: game.strokes.as_slice().to_vec(),
        });
        outbox
    }

    /// Wipes the canvas. Only the active drawer may.
    pub fn clear_canvas(&mut self, nickname: &str) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(game) = self.game.as_mut() else {
            return outbox;
        };
        if !game.is_active_drawer(nickname) {
            return outbox;
        }
        game.strokes.clear();
        tracing::debug!(room_id = %self.id, %nickname, "canvas cleared");
        outbox.to_all(ServerEvent::ClearCanvas {});
        outbox
    }
}
