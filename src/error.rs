use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the outer editing surfaces (file I/O, presets, scale).
/// Geometry and gesture handling never fail; they clamp or no-op instead.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to load {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no document is loaded")]
    NoDocument,

    #[error("unknown resize preset index {0}")]
    UnknownPreset(usize),

    #[error("scale factor must be a positive finite number, got {0}")]
    InvalidScaleFactor(f32),
}

pub type Result<T> = std::result::Result<T, EditorError>;
