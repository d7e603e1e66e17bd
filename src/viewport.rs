use crate::geometry::Point;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 32.0;
/// Zoom factor per wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 1.15;
/// Fraction of the view the image occupies after "fit".
pub const FIT_MARGIN: f32 = 0.95;

/// Zoom/pan mapping between widget coordinates and image coordinates:
/// `widget = image * zoom + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    zoom: f32,
    offset: Point,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self { zoom: 1.0, offset: Point::default() }
    }
}

impl ViewportTransform {
    pub fn new(zoom: f32, offset: Point) -> Self {
        Self { zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM), offset }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn widget_to_image(&self, p: Point) -> Point {
        Point::new((p.x - self.offset.x) / self.zoom, (p.y - self.offset.y) / self.zoom)
    }

    pub fn image_to_widget(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.offset.x, p.y * self.zoom + self.offset.y)
    }

    /// Scale so the whole image fits the view (with margin), centred.
    pub fn fit(&mut self, view_w: f32, view_h: f32, img_w: u32, img_h: u32) {
        if img_w == 0 || img_h == 0 || view_w <= 0.0 || view_h <= 0.0 {
            return;
        }
        let sx = view_w / img_w as f32;
        let sy = view_h / img_h as f32;
        self.zoom = (sx.min(sy) * FIT_MARGIN).clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = Point::new(
            (view_w - img_w as f32 * self.zoom) / 2.0,
            (view_h - img_h as f32 * self.zoom) / 2.0,
        );
    }

    /// Zoom by `factor` keeping the widget-space `anchor` fixed.
    pub fn zoom_around(&mut self, factor: f32, anchor: Point) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let image_anchor = self.widget_to_image(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = Point::new(
            anchor.x - image_anchor.x * self.zoom,
            anchor.y - image_anchor.y * self.zoom,
        );
    }

    /// Mouse-wheel zoom: one notch in or out around the cursor.
    pub fn wheel(&mut self, delta_y: f32, mouse: Point) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y > 0.0 { WHEEL_ZOOM_STEP } else { 1.0 / WHEEL_ZOOM_STEP };
        self.zoom_around(factor, mouse);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset = Point::new(self.offset.x + dx, self.offset.y + dy);
    }
}
