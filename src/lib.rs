//! Editing engine for grid-based sprite sheets: a single RGBA document cut
//! into a cols×rows grid, with per-cell and free-form pixel tools and linear
//! undo/redo.
//!
//! Hosts own the window and rendering. They feed pointer and key input into a
//! [`Session`] and redraw when an [`EditorEvent`] arrives.

pub mod canvas;
pub mod components;
pub mod error;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
pub mod viewport;

pub use canvas::{RasterDocument, Selection};
pub use components::history::{HistoryEntry, HistoryManager};
pub use components::tools::{CursorHint, Modifiers, PointerButton, PointerEvent, Tool};
pub use error::{EditorError, Result};
pub use events::{EditorEvent, EventBus};
pub use geometry::{PixelRect, Point, Polygon};
pub use grid::{Cell, GridConfig, GridLayout, RulerAxis};
pub use project::Session;
pub use settings::EditorSettings;
pub use viewport::ViewportTransform;
