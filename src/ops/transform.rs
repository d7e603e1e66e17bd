// ============================================================================
// TRANSFORM OPERATIONS - resampling and document resize presets
// ============================================================================

use image::{RgbaImage, imageops};

/// The one filter every resize, scale and swap-resize path uses.
pub const EDIT_INTERPOLATION: imageops::FilterType = imageops::FilterType::Lanczos3;

/// Resample `src` to `width × height` with [`EDIT_INTERPOLATION`].
/// Zero targets clamp to 1 px; same-size requests return an exact copy.
pub fn resample(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    imageops::resize(src, width, height, EDIT_INTERPOLATION)
}

// ---------------------------------------------------------------------------
//  Document resize presets
// ---------------------------------------------------------------------------

/// A whole-document target size offered by the resize command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizePreset {
    pub width: u32,
    pub height: u32,
}

impl ResizePreset {
    /// Display label, including the per-cell size of the default 3×3 grid.
    pub fn label(&self) -> String {
        format!(
            "{} × {}  (cell {}×{})",
            self.width,
            self.height,
            self.width / 3,
            self.height / 3
        )
    }
}

pub const RESIZE_PRESETS: [ResizePreset; 5] = [
    ResizePreset { width: 768, height: 768 },
    ResizePreset { width: 1536, height: 1536 },
    ResizePreset { width: 1920, height: 1920 },
    ResizePreset { width: 2400, height: 2400 },
    ResizePreset { width: 3072, height: 3072 },
];

/// 1536 × 1536.
pub const DEFAULT_PRESET_INDEX: usize = 1;

pub fn preset(index: usize) -> Option<ResizePreset> {
    RESIZE_PRESETS.get(index).copied()
}
