// ============================================================================
// GRID LAYOUT - cols × rows partition of the document into cells
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::canvas::RasterDocument;
use crate::geometry::{PixelRect, Point};

pub const MIN_GRID_DIM: u32 = 1;
pub const MAX_GRID_DIM: u32 = 20;

/// Two ruler offsets on the same axis closer than this are the same ruler.
pub const RULER_TOLERANCE: f32 = 0.005;

/// Default pick distance (image pixels) for removing a ruler line.
pub const RULER_HIT_THRESHOLD: f32 = 8.0;

/// Grid-addressed cell. Ordered row-major (row first, then column).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
}

impl Cell {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Which way a ruler line runs. A horizontal ruler sits at a relative *y*
/// offset inside every cell; a vertical one at a relative *x* offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RulerAxis {
    #[default]
    Horizontal,
    Vertical,
}

impl RulerAxis {
    pub fn toggled(self) -> Self {
        match self {
            RulerAxis::Horizontal => RulerAxis::Vertical,
            RulerAxis::Vertical => RulerAxis::Horizontal,
        }
    }
}

/// A line for an external renderer, in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    pub from: Point,
    pub to: Point,
}

impl LineSegment {
    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { from: Point::new(x1, y1), to: Point::new(x2, y2) }
    }
}

/// Authoritative grid settings. Only reachable mutably through
/// [`GridLayout`] setters so dependent caches see every change.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    cols: u32,
    rows: u32,
    line_color: Rgba<u8>,
    guide_color: Rgba<u8>,
    ruler_color: Rgba<u8>,
    show_grid: bool,
    show_guides: bool,
    show_rulers: bool,
    h_rulers: Vec<f32>,
    v_rulers: Vec<f32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: 3,
            rows: 3,
            line_color: Rgba([255, 0, 0, 180]),
            guide_color: Rgba([0, 180, 255, 120]),
            ruler_color: Rgba([0, 255, 120, 200]),
            show_grid: true,
            show_guides: true,
            show_rulers: true,
            h_rulers: Vec::new(),
            v_rulers: Vec::new(),
        }
    }
}

impl GridConfig {
    pub fn cols(&self) -> u32 {
        self.cols
    }
    pub fn rows(&self) -> u32 {
        self.rows
    }
    pub fn line_color(&self) -> Rgba<u8> {
        self.line_color
    }
    pub fn guide_color(&self) -> Rgba<u8> {
        self.guide_color
    }
    pub fn ruler_color(&self) -> Rgba<u8> {
        self.ruler_color
    }
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }
    pub fn show_guides(&self) -> bool {
        self.show_guides
    }
    pub fn show_rulers(&self) -> bool {
        self.show_rulers
    }
    /// Horizontal ruler offsets (relative y), ascending.
    pub fn h_rulers(&self) -> &[f32] {
        &self.h_rulers
    }
    /// Vertical ruler offsets (relative x), ascending.
    pub fn v_rulers(&self) -> &[f32] {
        &self.v_rulers
    }
}

#[derive(Clone, Debug, Default)]
pub struct GridLayout {
    config: GridConfig,
    revision: u64,
}

impl GridLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(cols: u32, rows: u32) -> Self {
        let mut grid = Self::new();
        grid.set_dimensions(cols, rows);
        grid
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn cols(&self) -> u32 {
        self.config.cols
    }

    pub fn rows(&self) -> u32 {
        self.config.rows
    }

    /// Bumped by every setter; caches keyed on it rebuild when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    pub fn set_dimensions(&mut self, cols: u32, rows: u32) {
        self.config.cols = cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        self.config.rows = rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        self.touch();
    }

    pub fn set_line_color(&mut self, color: Rgba<u8>) {
        self.config.line_color = color;
        self.touch();
    }

    pub fn set_guide_color(&mut self, color: Rgba<u8>) {
        self.config.guide_color = color;
        self.touch();
    }

    pub fn set_ruler_color(&mut self, color: Rgba<u8>) {
        self.config.ruler_color = color;
        self.touch();
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.config.show_grid = show;
        self.touch();
    }

    pub fn set_show_guides(&mut self, show: bool) {
        self.config.show_guides = show;
        self.touch();
    }

    pub fn set_show_rulers(&mut self, show: bool) {
        self.config.show_rulers = show;
        self.touch();
    }

    // ------------------------------------------------------------------
    // Cell geometry
    // ------------------------------------------------------------------

    /// Rectangle of `cell` in a `width × height` image. The last column and
    /// row absorb the integer-division remainder.
    pub fn cell_rect(&self, width: u32, height: u32, cell: Cell) -> PixelRect {
        let cw = width / self.config.cols;
        let ch = height / self.config.rows;
        let x = cell.col * cw;
        let y = cell.row * ch;
        let w = if cell.col + 1 == self.config.cols { width.saturating_sub(x) } else { cw };
        let h = if cell.row + 1 == self.config.rows { height.saturating_sub(y) } else { ch };
        PixelRect::new(x as i32, y as i32, w, h)
    }

    /// Cell containing pixel `(px, py)`, or `None` outside the image.
    ///
    /// Uses the same floor cell size as [`cell_rect`](Self::cell_rect) so
    /// pixels in the remainder band resolve to the last column/row.
    pub fn cell_at(&self, width: u32, height: u32, px: i32, py: i32) -> Option<Cell> {
        if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
            return None;
        }
        let last_col = self.config.cols - 1;
        let last_row = self.config.rows - 1;
        let cw = width / self.config.cols;
        let ch = height / self.config.rows;
        let col = if cw == 0 { last_col } else { (px as u32 / cw).min(last_col) };
        let row = if ch == 0 { last_row } else { (py as u32 / ch).min(last_row) };
        Some(Cell::new(col, row))
    }

    pub fn cell_at_point(&self, width: u32, height: u32, p: Point) -> Option<Cell> {
        let (px, py) = p.to_pixel();
        self.cell_at(width, height, px, py)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let cols = self.config.cols;
        (0..self.config.rows).flat_map(move |row| (0..cols).map(move |col| Cell::new(col, row)))
    }

    /// One crop per cell in row-major order: the frames an animation preview plays.
    pub fn cell_crops(&self, doc: &RasterDocument) -> Vec<RgbaImage> {
        let (w, h) = doc.dimensions();
        self.cells().map(|cell| doc.crop(self.cell_rect(w, h, cell))).collect()
    }

    // ------------------------------------------------------------------
    // Overlay lines (rendering only)
    // ------------------------------------------------------------------

    /// Interior cell boundaries.
    pub fn grid_lines(&self, width: u32, height: u32) -> Vec<LineSegment> {
        let cw = width / self.config.cols;
        let ch = height / self.config.rows;
        let (w, h) = (width as f32, height as f32);
        let vertical = (1..self.config.cols).map(|c| {
            let x = (c * cw) as f32;
            LineSegment::new(x, 0.0, x, h)
        });
        let horizontal = (1..self.config.rows).map(|r| {
            let y = (r * ch) as f32;
            LineSegment::new(0.0, y, w, y)
        });
        vertical.chain(horizontal).collect()
    }

    /// Centre cross inside every cell.
    pub fn guide_lines(&self, width: u32, height: u32) -> Vec<LineSegment> {
        let mut lines = Vec::with_capacity((self.config.cols * self.config.rows * 2) as usize);
        for cell in self.cells() {
            let r = self.cell_rect(width, height, cell);
            let cx = (r.x + r.width as i32 / 2) as f32;
            let cy = (r.y + r.height as i32 / 2) as f32;
            lines.push(LineSegment::new(cx, r.y as f32, cx, r.bottom() as f32));
            lines.push(LineSegment::new(r.x as f32, cy, r.right() as f32, cy));
        }
        lines
    }

    /// Every stored ruler offset drawn inside every cell.
    pub fn ruler_lines(&self, width: u32, height: u32) -> Vec<LineSegment> {
        let mut lines = Vec::new();
        for cell in self.cells() {
            let r = self.cell_rect(width, height, cell);
            for &rel in &self.config.h_rulers {
                let y = r.y as f32 + rel * r.height as f32;
                lines.push(LineSegment::new(r.x as f32, y, r.right() as f32, y));
            }
            for &rel in &self.config.v_rulers {
                let x = r.x as f32 + rel * r.width as f32;
                lines.push(LineSegment::new(x, r.y as f32, x, r.bottom() as f32));
            }
        }
        lines
    }

    // ------------------------------------------------------------------
    // Rulers
    // ------------------------------------------------------------------

    /// Store a ruler at relative offset `rel` (clamped to `[0, 1]`). Returns
    /// `false` when an existing ruler on that axis is within tolerance.
    pub fn add_ruler(&mut self, axis: RulerAxis, rel: f32) -> bool {
        if !rel.is_finite() {
            return false;
        }
        let rel = rel.clamp(0.0, 1.0);
        let store = match axis {
            RulerAxis::Horizontal => &mut self.config.h_rulers,
            RulerAxis::Vertical => &mut self.config.v_rulers,
        };
        if store.iter().any(|&r| (r - rel).abs() < RULER_TOLERANCE) {
            return false;
        }
        let at = store.partition_point(|&r| r < rel);
        store.insert(at, rel);
        self.touch();
        true
    }

    pub fn add_h_ruler(&mut self, rel: f32) -> bool {
        self.add_ruler(RulerAxis::Horizontal, rel)
    }

    pub fn add_v_ruler(&mut self, rel: f32) -> bool {
        self.add_ruler(RulerAxis::Vertical, rel)
    }

    /// Remove the ruler whose line (inside the cell under the click) is
    /// nearest to `(px, py)`, if within `threshold` pixels.
    pub fn remove_nearest_ruler(
        &mut self,
        width: u32,
        height: u32,
        px: f32,
        py: f32,
        threshold: f32,
    ) -> bool {
        let Some(cell) = self.cell_at_point(width, height, Point::new(px, py)) else {
            return false;
        };
        let r = self.cell_rect(width, height, cell);

        let mut best: Option<(RulerAxis, usize, f32)> = None;
        let mut consider = |axis: RulerAxis, idx: usize, dist: f32| {
            if best.is_none_or(|(_, _, d)| dist < d) {
                best = Some((axis, idx, dist));
            }
        };
        for (i, &rel) in self.config.h_rulers.iter().enumerate() {
            let y = r.y as f32 + rel * r.height as f32;
            consider(RulerAxis::Horizontal, i, (py - y).abs());
        }
        for (i, &rel) in self.config.v_rulers.iter().enumerate() {
            let x = r.x as f32 + rel * r.width as f32;
            consider(RulerAxis::Vertical, i, (px - x).abs());
        }

        match best {
            Some((axis, idx, dist)) if dist <= threshold => {
                match axis {
                    RulerAxis::Horizontal => self.config.h_rulers.remove(idx),
                    RulerAxis::Vertical => self.config.v_rulers.remove(idx),
                };
                self.touch();
                true
            }
            _ => false,
        }
    }

    pub fn clear_rulers(&mut self) {
        self.config.h_rulers.clear();
        self.config.v_rulers.clear();
        self.touch();
    }
}
