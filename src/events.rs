// ============================================================================
// EVENTS - change notifications for renderers, status bars, previews
// ============================================================================

use std::cell::RefCell;

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Something observable about the editing session changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorEvent {
    /// Document pixels or dimensions changed (edit, load, resize, undo, redo).
    DocumentChanged,
    /// Zoom or pan changed; scrollbars should resync.
    ViewportChanged,
    /// The rect/lasso selection or a tool highlight changed.
    SelectionChanged,
    /// Grid dimensions, colors, visibility or rulers changed.
    GridChanged,
}

/// Fan-out channel: every subscriber sees every event.
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<Vec<Sender<EditorEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> Receiver<EditorEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    pub fn emit(&self, event: EditorEvent) {
        self.subscribers.borrow_mut().retain(|tx| match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}
