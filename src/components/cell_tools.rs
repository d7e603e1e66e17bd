// ============================================================================
// CELL TOOLS - grid-addressed move, swap, scale and ruler placement
// ============================================================================

use std::collections::BTreeSet;

use crate::components::tools::{CursorHint, Modifiers, PointerButton, PointerEvent, ToolContext, ToolHandler};
use crate::error::{EditorError, Result};
use crate::geometry::{PixelRect, Point};
use crate::grid::{Cell, GridLayout, RULER_HIT_THRESHOLD, RulerAxis};
use crate::ops::canvas_ops;

fn cell_under(ctx: &ToolContext<'_>, p: Point) -> Option<(Cell, PixelRect)> {
    let (w, h) = ctx.image_size();
    let cell = ctx.grid.cell_at_point(w, h, p)?;
    Some((cell, ctx.grid.cell_rect(w, h, cell)))
}

// ---------------------------------------------------------------------------
//  Cell move
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default)]
enum CellMoveGesture {
    #[default]
    Idle,
    Dragging {
        cell: Cell,
        rect: PixelRect,
        start: Point,
        delta: (i32, i32),
    },
}

/// Shifts a single cell's content inside its own rectangle.
///
/// The undo snapshot is taken on release, and only when the delta is
/// nonzero, so a click without a drag leaves no empty undo step.
#[derive(Default)]
pub struct CellMoveTool {
    gesture: CellMoveGesture,
}

impl CellMoveTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(cell, dx, dy)` of the drag in progress, for the renderer's preview.
    pub fn preview(&self) -> Option<(Cell, i32, i32)> {
        match self.gesture {
            CellMoveGesture::Dragging { cell, delta, .. } => Some((cell, delta.0, delta.1)),
            CellMoveGesture::Idle => None,
        }
    }
}

impl ToolHandler for CellMoveTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        if let Some((cell, rect)) = cell_under(ctx, event.pos) {
            self.gesture = CellMoveGesture::Dragging { cell, rect, start: event.pos, delta: (0, 0) };
            ctx.selection_changed();
        }
    }

    fn on_move(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if let CellMoveGesture::Dragging { start, delta, .. } = &mut self.gesture {
            let d = (event.pos - *start).truncated();
            if d != *delta {
                *delta = d;
                ctx.selection_changed();
            }
        }
    }

    fn on_release(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        self.on_move(ctx, event);
        if let CellMoveGesture::Dragging { cell, rect, delta: (dx, dy), .. } = std::mem::take(&mut self.gesture) {
            if (dx, dy) != (0, 0) {
                log::debug!("cell ({}, {}) moved by ({dx}, {dy})", cell.col, cell.row);
                ctx.commit("Move Cell", |doc| canvas_ops::move_cell_content(doc, rect, dx, dy));
            }
            ctx.selection_changed();
        }
    }

    fn cursor_hint(&self) -> CursorHint {
        match self.gesture {
            CellMoveGesture::Dragging { .. } => CursorHint::Grabbing,
            CellMoveGesture::Idle => CursorHint::Grab,
        }
    }

    fn reset(&mut self) {
        self.gesture = CellMoveGesture::Idle;
    }
}

// ---------------------------------------------------------------------------
//  Cell swap
// ---------------------------------------------------------------------------

/// Two-click swap: the first click marks cell A, the second exchanges A
/// with the clicked cell (or cancels when it is A again).
#[derive(Default)]
pub struct CellSwapTool {
    pending: Option<Cell>,
}

impl CellSwapTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<Cell> {
        self.pending
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

impl ToolHandler for CellSwapTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let Some((cell, rect_b)) = cell_under(ctx, event.pos) else {
            return;
        };
        match self.pending.take() {
            None => self.pending = Some(cell),
            Some(first) if first == cell => {}
            Some(first) if first.col >= ctx.grid.cols() || first.row >= ctx.grid.rows() => {
                log::debug!("swap anchor {first:?} no longer on the grid; restarting");
                self.pending = Some(cell);
            }
            Some(first) => {
                let (w, h) = ctx.image_size();
                let rect_a = ctx.grid.cell_rect(w, h, first);
                ctx.commit("Swap Cells", |doc| canvas_ops::swap_cells(doc, rect_a, rect_b));
            }
        }
        ctx.selection_changed();
    }

    fn on_move(&mut self, _ctx: &mut ToolContext<'_>, _event: &PointerEvent) {}

    fn on_release(&mut self, _ctx: &mut ToolContext<'_>, _event: &PointerEvent) {}

    fn cursor_hint(&self) -> CursorHint {
        CursorHint::PointingHand
    }

    // The pending cell is a highlight, not a drag; it survives tool switches.
    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
//  Cell scale
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CellScaleTool {
    selected: BTreeSet<Cell>,
}

impl CellScaleTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected cells in row-major order.
    pub fn selected(&self) -> impl Iterator<Item = Cell> + '_ {
        self.selected.iter().copied()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, cell: Cell) -> bool {
        self.selected.contains(&cell)
    }

    pub fn select_all(&mut self, grid: &GridLayout) {
        self.selected = grid.cells().collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Shift-click toggles; a plain click selects only that cell, or clears
    /// the selection when it was already the only one.
    pub fn click(&mut self, cell: Cell, modifiers: Modifiers) {
        if modifiers.contains(Modifiers::SHIFT) {
            if !self.selected.remove(&cell) {
                self.selected.insert(cell);
            }
        } else if self.selected.len() == 1 && self.selected.contains(&cell) {
            self.selected.clear();
        } else {
            self.selected.clear();
            self.selected.insert(cell);
        }
    }

    /// Scale every selected cell's content by `factor` about its centre.
    /// Returns `Ok(false)` when nothing is selected.
    pub fn apply(&mut self, ctx: &mut ToolContext<'_>, factor: f32) -> Result<bool> {
        if !factor.is_finite() || factor <= 0.0 {
            log::warn!("rejected cell scale factor {factor}");
            return Err(EditorError::InvalidScaleFactor(factor));
        }
        let (cols, rows) = (ctx.grid.cols(), ctx.grid.rows());
        self.selected.retain(|c| c.col < cols && c.row < rows);
        if self.selected.is_empty() {
            return Ok(false);
        }
        let (w, h) = ctx.image_size();
        let rects: Vec<PixelRect> = self.selected.iter().map(|&c| ctx.grid.cell_rect(w, h, c)).collect();
        let scaled = ctx.commit("Scale Cells", |doc| canvas_ops::scale_cells(doc, &rects, factor));
        log::debug!("scaled {scaled} cells by {factor}");
        Ok(true)
    }
}

impl ToolHandler for CellScaleTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        if let Some((cell, _)) = cell_under(ctx, event.pos) {
            self.click(cell, event.modifiers);
            ctx.selection_changed();
        }
    }

    fn on_move(&mut self, _ctx: &mut ToolContext<'_>, _event: &PointerEvent) {}

    fn on_release(&mut self, _ctx: &mut ToolContext<'_>, _event: &PointerEvent) {}

    fn cursor_hint(&self) -> CursorHint {
        CursorHint::PointingHand
    }

    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
//  Cell ruler
// ---------------------------------------------------------------------------

/// Left click places a ruler at the click's relative offset inside its cell
/// (repeated in every cell); right click removes the nearest ruler.
#[derive(Default)]
pub struct CellRulerTool {
    axis: RulerAxis,
}

impl CellRulerTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(&self) -> RulerAxis {
        self.axis
    }

    pub fn set_axis(&mut self, axis: RulerAxis) {
        self.axis = axis;
    }

    pub fn toggle_axis(&mut self) {
        self.axis = self.axis.toggled();
    }
}

impl ToolHandler for CellRulerTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        let p = event.pos;
        let changed = match event.button {
            PointerButton::Primary => {
                let Some((_, r)) = cell_under(ctx, p) else {
                    return;
                };
                let rel = match self.axis {
                    RulerAxis::Horizontal => (p.y - r.y as f32) / r.height.max(1) as f32,
                    RulerAxis::Vertical => (p.x - r.x as f32) / r.width.max(1) as f32,
                };
                ctx.grid.add_ruler(self.axis, rel)
            }
            PointerButton::Secondary => {
                let (w, h) = ctx.image_size();
                ctx.grid.remove_nearest_ruler(w, h, p.x, p.y, RULER_HIT_THRESHOLD)
            }
            PointerButton::Middle => false,
        };
        if changed {
            ctx.grid_changed();
        }
    }

    fn on_move(&mut self, _ctx: &mut ToolContext<'_>, _event: &PointerEvent) {}

    fn on_release(&mut self, _ctx: &mut ToolContext<'_>, _event: &PointerEvent) {}

    fn cursor_hint(&self) -> CursorHint {
        match self.axis {
            RulerAxis::Horizontal => CursorHint::ResizeVertical,
            RulerAxis::Vertical => CursorHint::ResizeHorizontal,
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{RasterDocument, Selection};
    use crate::components::history::HistoryManager;
    use crate::events::EventBus;
    use crate::settings::EditorSettings;
    use image::{Rgba, RgbaImage};

    struct Fixture {
        document: RasterDocument,
        history: HistoryManager,
        grid: GridLayout,
        selection: Selection,
        settings: EditorSettings,
        events: EventBus,
    }

    impl Fixture {
        /// 3×3 grid of 10 px cells, each filled with a distinct opaque color.
        fn new() -> Self {
            let pixels = RgbaImage::from_fn(30, 30, |x, y| {
                let id = (y / 10) * 3 + x / 10;
                Rgba([id as u8 * 20, x as u8, y as u8, 255])
            });
            Self {
                document: RasterDocument::from_image(pixels),
                history: HistoryManager::default(),
                grid: GridLayout::with_dimensions(3, 3),
                selection: Selection::None,
                settings: EditorSettings::default(),
                events: EventBus::new(),
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                document: &mut self.document,
                history: &mut self.history,
                grid: &mut self.grid,
                selection: &mut self.selection,
                settings: &self.settings,
                events: &self.events,
                zoom: 1.0,
            }
        }

        fn click(&mut self, tool: &mut dyn ToolHandler, x: f32, y: f32, button: PointerButton, modifiers: Modifiers) {
            let ev = PointerEvent::new(Point::new(x, y), button, modifiers);
            tool.on_press(&mut self.ctx(), &ev);
            tool.on_release(&mut self.ctx(), &ev);
        }

        fn cell(&self, col: u32, row: u32) -> RgbaImage {
            let r = self.grid.cell_rect(30, 30, Cell::new(col, row));
            self.document.crop(r)
        }
    }

    #[test]
    fn cell_move_defers_history_until_nonzero_delta() {
        let mut fx = Fixture::new();
        let mut tool = CellMoveTool::new();
        fx.click(&mut tool, 15.0, 15.0, PointerButton::Primary, Modifiers::empty());
        assert!(!fx.history.can_undo());

        let press = PointerEvent::primary(Point::new(15.0, 15.0));
        let release = PointerEvent::primary(Point::new(18.0, 15.0));
        tool.on_press(&mut fx.ctx(), &press);
        tool.on_move(&mut fx.ctx(), &release);
        assert_eq!(tool.preview(), Some((Cell::new(1, 1), 3, 0)));
        tool.on_release(&mut fx.ctx(), &release);
        assert!(tool.preview().is_none());
        assert_eq!(fx.history.undo_count(), 1);
        // Shifted right by 3 inside the cell; vacated strip is transparent.
        assert_eq!(fx.document.pixels().get_pixel(11, 15)[3], 0);
        assert_eq!(fx.document.pixels().get_pixel(13, 15)[1], 10);
        // Right neighbour untouched.
        assert_eq!(fx.document.pixels().get_pixel(20, 15)[0], 5 * 20);
    }

    #[test]
    fn swap_second_click_exchanges_cells() {
        let mut fx = Fixture::new();
        let a = fx.cell(0, 0);
        let b = fx.cell(2, 1);
        let mut tool = CellSwapTool::new();
        fx.click(&mut tool, 5.0, 5.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(tool.pending(), Some(Cell::new(0, 0)));
        assert!(!fx.history.can_undo());
        fx.click(&mut tool, 25.0, 15.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(tool.pending(), None);
        assert_eq!(fx.cell(0, 0), b);
        assert_eq!(fx.cell(2, 1), a);
        assert_eq!(fx.history.undo_description(), Some("Swap Cells"));
    }

    #[test]
    fn swap_same_cell_cancels() {
        let mut fx = Fixture::new();
        let before = fx.document.pixels().clone();
        let mut tool = CellSwapTool::new();
        fx.click(&mut tool, 5.0, 5.0, PointerButton::Primary, Modifiers::empty());
        fx.click(&mut tool, 6.0, 6.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(tool.pending(), None);
        assert_eq!(fx.document.pixels(), &before);
        assert!(!fx.history.can_undo());
    }

    #[test]
    fn swap_anchor_outside_shrunk_grid_restarts() {
        let mut fx = Fixture::new();
        let before = fx.document.pixels().clone();
        let mut tool = CellSwapTool::new();
        fx.click(&mut tool, 25.0, 25.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(tool.pending(), Some(Cell::new(2, 2)));

        fx.grid.set_dimensions(2, 2);
        fx.click(&mut tool, 5.0, 5.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(tool.pending(), Some(Cell::new(0, 0)));
        assert_eq!(fx.document.pixels(), &before);
        assert!(!fx.history.can_undo());
    }

    #[test]
    fn scale_click_semantics() {
        let mut tool = CellScaleTool::new();
        let a = Cell::new(0, 0);
        let b = Cell::new(1, 2);
        tool.click(a, Modifiers::empty());
        assert_eq!(tool.selected().collect::<Vec<_>>(), vec![a]);
        tool.click(b, Modifiers::SHIFT);
        assert_eq!(tool.selected_count(), 2);
        assert!(tool.is_selected(b));
        tool.click(a, Modifiers::SHIFT);
        assert_eq!(tool.selected().collect::<Vec<_>>(), vec![b]);
        tool.click(b, Modifiers::empty());
        assert_eq!(tool.selected_count(), 0);
        tool.click(b, Modifiers::empty());
        tool.click(a, Modifiers::empty());
        assert_eq!(tool.selected().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn scale_selected_is_row_major() {
        let grid = GridLayout::with_dimensions(3, 3);
        let mut tool = CellScaleTool::new();
        tool.select_all(&grid);
        let order: Vec<Cell> = tool.selected().collect();
        assert_eq!(order, grid.cells().collect::<Vec<_>>());
    }

    #[test]
    fn scale_apply_rejects_bad_factor_and_empty_selection() {
        let mut fx = Fixture::new();
        let mut tool = CellScaleTool::new();
        assert!(matches!(tool.apply(&mut fx.ctx(), 0.0), Err(EditorError::InvalidScaleFactor(_))));
        assert!(matches!(tool.apply(&mut fx.ctx(), f32::NAN), Err(EditorError::InvalidScaleFactor(_))));
        assert!(!tool.apply(&mut fx.ctx(), 0.5).unwrap());
        assert!(!fx.history.can_undo());
    }

    #[test]
    fn scale_apply_shrinks_about_centre() {
        let mut fx = Fixture::new();
        let mut tool = CellScaleTool::new();
        tool.click(Cell::new(1, 1), Modifiers::empty());
        assert!(tool.apply(&mut fx.ctx(), 0.5).unwrap());
        assert_eq!(fx.history.undo_count(), 1);
        let px = fx.document.pixels();
        assert_eq!(px.get_pixel(10, 10)[3], 0);
        assert_eq!(px.get_pixel(19, 19)[3], 0);
        assert!(px.get_pixel(15, 15)[3] > 200);
        assert_eq!(px.get_pixel(5, 5)[3], 255);
    }

    #[test]
    fn ruler_left_adds_relative_offset_right_removes() {
        let mut fx = Fixture::new();
        let mut tool = CellRulerTool::new();
        assert_eq!(tool.axis(), RulerAxis::Horizontal);
        // y = 13 inside row 1 (10..20) → 0.3
        fx.click(&mut tool, 25.0, 13.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(fx.grid.config().h_rulers().len(), 1);
        assert!((fx.grid.config().h_rulers()[0] - 0.3).abs() < 1e-4);

        // Same offset from another cell dedupes.
        fx.click(&mut tool, 5.0, 3.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(fx.grid.config().h_rulers().len(), 1);

        tool.toggle_axis();
        fx.click(&mut tool, 7.0, 3.0, PointerButton::Primary, Modifiers::empty());
        assert_eq!(fx.grid.config().v_rulers().len(), 1);

        fx.click(&mut tool, 7.5, 25.0, PointerButton::Secondary, Modifiers::empty());
        assert!(fx.grid.config().v_rulers().is_empty());
        assert_eq!(fx.grid.config().h_rulers().len(), 1);
    }
}
