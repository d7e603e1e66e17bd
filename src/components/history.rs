use std::collections::VecDeque;

use image::RgbaImage;

use crate::canvas::RasterDocument;

/// Default number of undo steps kept.
pub const MAX_HISTORY_STEPS: usize = 50;

// ============================================================================
// HISTORY ENTRY - full-document snapshot
// ============================================================================

/// Immutable deep copy of the document pixels, captured *before* an edit.
#[derive(Clone)]
pub struct HistoryEntry {
    description: String,
    pixels: RgbaImage,
}

impl HistoryEntry {
    pub fn capture(description: &str, doc: &RasterDocument) -> Self {
        Self {
            description: description.to_string(),
            pixels: doc.pixels().clone(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}

// ============================================================================
// HISTORY MANAGER - bounded linear undo/redo
// ============================================================================

/// Linear undo/redo over whole-document snapshots. The oldest undo entry is
/// evicted once more than `max_history_size` are stored.
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_HISTORY_STEPS)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
        }
    }

    /// Snapshot `doc` before an edit. Always clears the redo stack.
    pub fn push(&mut self, description: &str, doc: &RasterDocument) {
        self.redo_stack.clear();
        self.undo_stack.push_back(HistoryEntry::capture(description, doc));
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    /// Pop the latest snapshot, parking a copy of `current` on the redo
    /// stack. `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &RasterDocument) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack
            .push_back(HistoryEntry::capture(&entry.description, current));
        Some(entry)
    }

    /// Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self, current: &RasterDocument) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop_back()?;
        self.undo_stack
            .push_back(HistoryEntry::capture(&entry.description, current));
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
