/// Session-wide editor knobs that are not part of the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    eraser_size: u32,
    /// Rect-selection handle pick radius, in screen pixels.
    pub handle_size: f32,
    /// Zoom step used by the zoom-in button (zoom-out uses 0.8).
    pub zoom_step: f32,
}

pub const MIN_ERASER_SIZE: u32 = 2;
pub const MAX_ERASER_SIZE: u32 = 100;

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            eraser_size: 20,
            handle_size: 6.0,
            zoom_step: 1.25,
        }
    }
}

impl EditorSettings {
    /// Eraser diameter in image pixels.
    pub fn eraser_size(&self) -> u32 {
        self.eraser_size
    }

    pub fn set_eraser_size(&mut self, size: u32) {
        self.eraser_size = size.clamp(MIN_ERASER_SIZE, MAX_ERASER_SIZE);
    }

    pub fn eraser_radius(&self) -> f32 {
        self.eraser_size as f32 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eraser_size_is_clamped() {
        let mut s = EditorSettings::default();
        assert_eq!(s.eraser_size(), 20);
        s.set_eraser_size(0);
        assert_eq!(s.eraser_size(), MIN_ERASER_SIZE);
        s.set_eraser_size(1000);
        assert_eq!(s.eraser_size(), MAX_ERASER_SIZE);
    }
}
