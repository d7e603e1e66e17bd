use image::RgbaImage;

use crate::canvas::{RasterDocument, Selection};
use crate::components::cell_tools::{CellMoveTool, CellRulerTool, CellScaleTool, CellSwapTool};
use crate::components::history::HistoryManager;
use crate::events::{EditorEvent, EventBus};
use crate::geometry::{PixelRect, Point, Polygon};
use crate::grid::GridLayout;
use crate::ops::canvas_ops;
use crate::settings::EditorSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    RectSelect,
    LassoSelect,
    Eraser,
    CellMove,
    CellSwap,
    CellScale,
    CellRuler,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::RectSelect => "Rectangle Select",
            Tool::LassoSelect => "Lasso Select",
            Tool::Eraser => "Eraser",
            Tool::CellMove => "Cell Move",
            Tool::CellSwap => "Cell Swap",
            Tool::CellScale => "Cell Scale",
            Tool::CellRuler => "Cell Ruler",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::RectSelect,
            Tool::LassoSelect,
            Tool::Eraser,
            Tool::CellMove,
            Tool::CellSwap,
            Tool::CellScale,
            Tool::CellRuler,
        ]
    }
}

// ============================================================================
// POINTER INPUT
// ============================================================================

bitflags::bitflags! {
    /// Keyboard modifiers held during a pointer event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// A pointer event already mapped into image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PointerEvent {
    pub pos: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(pos: Point, button: PointerButton, modifiers: Modifiers) -> Self {
        Self { pos, button, modifiers }
    }

    pub fn primary(pos: Point) -> Self {
        Self::new(pos, PointerButton::Primary, Modifiers::empty())
    }
}

/// What the host should show as the mouse cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    Crosshair,
    Move,
    Grab,
    Grabbing,
    ResizeHorizontal,
    ResizeVertical,
    ResizeNwSe,
    ResizeNeSw,
    PointingHand,
}

// ============================================================================
// TOOL CONTEXT - everything a gesture is allowed to touch
// ============================================================================

pub struct ToolContext<'a> {
    pub document: &'a mut RasterDocument,
    pub history: &'a mut HistoryManager,
    pub grid: &'a mut GridLayout,
    pub selection: &'a mut Selection,
    pub settings: &'a EditorSettings,
    pub events: &'a EventBus,
    /// Current viewport zoom, for screen-size hit radii.
    pub zoom: f32,
}

impl ToolContext<'_> {
    pub fn image_size(&self) -> (u32, u32) {
        self.document.dimensions()
    }

    /// Push an undo snapshot, run `edit`, and announce the change.
    pub fn commit<R>(&mut self, description: &str, edit: impl FnOnce(&mut RasterDocument) -> R) -> R {
        self.history.push(description, self.document);
        let out = edit(self.document);
        log::debug!("{description}");
        self.events.emit(EditorEvent::DocumentChanged);
        out
    }

    /// Snapshot only; the edits follow through [`edit_in_place`](Self::edit_in_place).
    pub fn push_history(&mut self, description: &str) {
        self.history.push(description, self.document);
    }

    /// Mutate without a new snapshot (continuation of a stroke already pushed).
    pub fn edit_in_place(&mut self, edit: impl FnOnce(&mut RasterDocument)) {
        edit(self.document);
        self.events.emit(EditorEvent::DocumentChanged);
    }

    pub fn set_selection(&mut self, selection: Selection) {
        if *self.selection != selection {
            *self.selection = selection;
            self.events.emit(EditorEvent::SelectionChanged);
        }
    }

    /// A tool highlight (pending swap cell, scale set, live lasso) changed.
    pub fn selection_changed(&self) {
        self.events.emit(EditorEvent::SelectionChanged);
    }

    pub fn grid_changed(&self) {
        self.events.emit(EditorEvent::GridChanged);
    }
}

/// Shared interface of all gesture state machines.
pub trait ToolHandler {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent);
    fn on_move(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent);
    fn on_release(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent);
    fn cursor_hint(&self) -> CursorHint;
    /// Drop all transient gesture state.
    fn reset(&mut self);
}

// ============================================================================
// RECTANGLE SELECT
// ============================================================================

/// The eight resize handles of a rect selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Top,
    Right,
    Bottom,
    Left,
}

impl Handle {
    /// Corners first so they win hit-tests over edge midpoints.
    const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomRight,
        Handle::BottomLeft,
        Handle::Top,
        Handle::Right,
        Handle::Bottom,
        Handle::Left,
    ];

    fn anchor(self, r: &PixelRect) -> Point {
        let (l, t) = (r.x as f32, r.y as f32);
        let (rt, b) = (r.right() as f32, r.bottom() as f32);
        let (cx, cy) = ((l + rt) / 2.0, (t + b) / 2.0);
        match self {
            Handle::TopLeft => Point::new(l, t),
            Handle::TopRight => Point::new(rt, t),
            Handle::BottomRight => Point::new(rt, b),
            Handle::BottomLeft => Point::new(l, b),
            Handle::Top => Point::new(cx, t),
            Handle::Right => Point::new(rt, cy),
            Handle::Bottom => Point::new(cx, b),
            Handle::Left => Point::new(l, cy),
        }
    }

    pub fn hit_test(rect: &PixelRect, p: Point, radius: f32) -> Option<Handle> {
        Self::ALL.into_iter().find(|h| {
            let a = h.anchor(rect);
            (p.x - a.x).abs() <= radius && (p.y - a.y).abs() <= radius
        })
    }

    fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::BottomLeft | Handle::Left)
    }
    fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight | Handle::Right)
    }
    fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::TopRight | Handle::Top)
    }
    fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::BottomRight | Handle::Bottom)
    }

    /// Drag this handle of `origin` to `p`. The opposite edge never gets
    /// closer than 1 px.
    fn drag(self, origin: &PixelRect, p: Point) -> PixelRect {
        let px = p.x.round() as i32;
        let py = p.y.round() as i32;
        let (mut l, mut t, mut r, mut b) = (origin.x, origin.y, origin.right(), origin.bottom());
        if self.moves_left() {
            l = px.min(r - 1);
        }
        if self.moves_right() {
            r = px.max(l + 1);
        }
        if self.moves_top() {
            t = py.min(b - 1);
        }
        if self.moves_bottom() {
            b = py.max(t + 1);
        }
        PixelRect::from_edges(l, t, r, b)
    }

    pub fn cursor(self) -> CursorHint {
        match self {
            Handle::TopLeft | Handle::BottomRight => CursorHint::ResizeNwSe,
            Handle::TopRight | Handle::BottomLeft => CursorHint::ResizeNeSw,
            Handle::Top | Handle::Bottom => CursorHint::ResizeVertical,
            Handle::Left | Handle::Right => CursorHint::ResizeHorizontal,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum RectGesture {
    #[default]
    Idle,
    Drawing {
        anchor: (i32, i32),
    },
    Moving {
        origin: PixelRect,
        start: Point,
        delta: (i32, i32),
        copy: bool,
    },
    Resizing {
        origin: PixelRect,
        handle: Handle,
        current: PixelRect,
    },
}

#[derive(Default)]
pub struct RectSelectTool {
    gesture: RectGesture,
}

impl RectSelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, RectGesture::Idle)
    }

    /// Rect the host should draw while a move is in progress.
    pub fn preview(&self) -> Option<PixelRect> {
        match &self.gesture {
            RectGesture::Moving { origin, delta, .. } => Some(origin.translated(delta.0, delta.1)),
            RectGesture::Resizing { current, .. } => Some(*current),
            _ => None,
        }
    }
}

impl ToolHandler for RectSelectTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let p = event.pos;
        if let Some(rect) = ctx.selection.rect() {
            let radius = ctx.settings.handle_size / ctx.zoom.max(f32::EPSILON);
            if let Some(handle) = Handle::hit_test(&rect, p, radius) {
                self.gesture = RectGesture::Resizing { origin: rect, handle, current: rect };
                return;
            }
            if rect.contains_point(p) {
                self.gesture = RectGesture::Moving {
                    origin: rect,
                    start: p,
                    delta: (0, 0),
                    copy: event.modifiers.contains(Modifiers::CTRL),
                };
                return;
            }
        }
        let anchor = p.to_pixel();
        self.gesture = RectGesture::Drawing { anchor };
        ctx.set_selection(Selection::Rect(PixelRect::from_corners(anchor, anchor)));
    }

    fn on_move(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        let p = event.pos;
        match &mut self.gesture {
            RectGesture::Idle => {}
            RectGesture::Drawing { anchor } => {
                let rect = PixelRect::from_corners(*anchor, p.to_pixel());
                ctx.set_selection(Selection::Rect(rect));
            }
            RectGesture::Moving { origin, start, delta, .. } => {
                *delta = (p - *start).truncated();
                let moved = origin.translated(delta.0, delta.1);
                ctx.set_selection(Selection::Rect(moved));
            }
            RectGesture::Resizing { origin, handle, current } => {
                *current = handle.drag(origin, p);
                ctx.set_selection(Selection::Rect(*current));
            }
        }
    }

    fn on_release(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        self.on_move(ctx, event);
        match std::mem::take(&mut self.gesture) {
            RectGesture::Idle => {}
            RectGesture::Drawing { anchor } => {
                let rect = PixelRect::from_corners(anchor, event.pos.to_pixel());
                if rect.is_empty() {
                    ctx.set_selection(Selection::None);
                }
            }
            RectGesture::Moving { origin, delta: (dx, dy), copy, .. } => {
                if (dx, dy) == (0, 0) {
                    return;
                }
                if copy {
                    ctx.commit("Copy Selection", |doc| canvas_ops::copy_region(doc, origin, dx, dy));
                } else {
                    ctx.commit("Move Selection", |doc| canvas_ops::move_region(doc, origin, dx, dy));
                }
                ctx.set_selection(Selection::Rect(origin.translated(dx, dy)));
            }
            RectGesture::Resizing { origin, current, .. } => {
                if current.width < 2 || current.height < 2 {
                    ctx.set_selection(Selection::Rect(origin));
                    return;
                }
                if current != origin {
                    ctx.commit("Resize Selection", |doc| canvas_ops::scale_region(doc, origin, current));
                }
                ctx.set_selection(Selection::Rect(current));
            }
        }
    }

    fn cursor_hint(&self) -> CursorHint {
        match &self.gesture {
            RectGesture::Moving { .. } => CursorHint::Move,
            RectGesture::Resizing { handle, .. } => handle.cursor(),
            _ => CursorHint::Crosshair,
        }
    }

    fn reset(&mut self) {
        self.gesture = RectGesture::Idle;
    }
}

// ============================================================================
// LASSO SELECT
// ============================================================================

#[derive(Clone, Debug, Default)]
enum LassoGesture {
    #[default]
    Idle,
    Drawing {
        points: Vec<Point>,
    },
    Dragging {
        last: Point,
    },
}

/// State carried across consecutive drags of the same lasso: the document
/// as it was when the session began and the polygon's position then.
struct LassoMoveSession {
    snapshot: RgbaImage,
    original: Polygon,
    generation: u64,
}

#[derive(Default)]
pub struct LassoSelectTool {
    gesture: LassoGesture,
    session: Option<LassoMoveSession>,
}

impl LassoSelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points of the outline being drawn, for the live preview.
    pub fn drawing_points(&self) -> Option<&[Point]> {
        match &self.gesture {
            LassoGesture::Drawing { points } => Some(points),
            _ => None,
        }
    }

    pub fn has_move_session(&self) -> bool {
        self.session.is_some()
    }

    /// Forget the drag snapshot (selection cleared or replaced).
    pub fn end_session(&mut self) {
        self.session = None;
    }

    fn begin_drag(&mut self, document: &RasterDocument, polygon: &Polygon) {
        let stale = self
            .session
            .as_ref()
            .is_none_or(|s| s.generation != document.generation());
        if stale {
            self.session = Some(LassoMoveSession {
                snapshot: document.pixels().clone(),
                original: polygon.clone(),
                generation: document.generation(),
            });
        }
    }

    fn commit_drag(&mut self, ctx: &mut ToolContext<'_>) {
        let Some(current) = ctx.selection.lasso().cloned() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some((dx, dy)) = canvas_ops::lasso_translation(&session.original, &current) else {
            return;
        };
        if (dx, dy) == (0, 0) {
            return;
        }
        let moved = ctx.commit("Lasso Move", |doc| {
            canvas_ops::commit_lasso_move(doc, &session.snapshot, &session.original, dx, dy)
        });
        if moved {
            session.snapshot = ctx.document.pixels().clone();
            session.original = current;
            session.generation = ctx.document.generation();
        } else {
            self.session = None;
        }
    }
}

impl ToolHandler for LassoSelectTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        if let Some(polygon) = ctx.selection.lasso()
            && polygon.is_closed()
            && polygon.contains(event.pos)
        {
            let polygon = polygon.clone();
            self.begin_drag(ctx.document, &polygon);
            self.gesture = LassoGesture::Dragging { last: event.pos };
            return;
        }
        self.session = None;
        ctx.set_selection(Selection::None);
        self.gesture = LassoGesture::Drawing { points: vec![event.pos] };
    }

    fn on_move(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        match &mut self.gesture {
            LassoGesture::Idle => {}
            LassoGesture::Drawing { points } => {
                if points.last() != Some(&event.pos) {
                    points.push(event.pos);
                    ctx.selection_changed();
                }
            }
            LassoGesture::Dragging { last } => {
                let d = event.pos - *last;
                *last = event.pos;
                if let Some(polygon) = ctx.selection.lasso_mut() {
                    polygon.translate(d.x, d.y);
                    ctx.selection_changed();
                }
            }
        }
    }

    fn on_release(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        self.on_move(ctx, event);
        match std::mem::take(&mut self.gesture) {
            LassoGesture::Idle => {}
            LassoGesture::Drawing { points } => {
                let mut polygon = Polygon::new(points);
                if polygon.has_area_vertices() {
                    polygon.close();
                    ctx.set_selection(Selection::Lasso(polygon));
                } else {
                    ctx.selection_changed();
                }
            }
            LassoGesture::Dragging { .. } => self.commit_drag(ctx),
        }
    }

    fn cursor_hint(&self) -> CursorHint {
        match self.gesture {
            LassoGesture::Dragging { .. } => CursorHint::Grabbing,
            _ => CursorHint::Crosshair,
        }
    }

    fn reset(&mut self) {
        self.gesture = LassoGesture::Idle;
    }
}

// ============================================================================
// ERASER
// ============================================================================

#[derive(Default)]
pub struct EraserTool {
    last: Option<Point>,
}

impl EraserTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stroking(&self) -> bool {
        self.last.is_some()
    }

    /// Stamp circles from `from` to `to` at no more than radius/2 apart.
    fn stamp_segment(doc: &mut RasterDocument, from: Point, to: Point, radius: f32) {
        let d = to - from;
        let len = (d.x * d.x + d.y * d.y).sqrt();
        let spacing = (radius / 2.0).max(0.5);
        let steps = (len / spacing).ceil().max(1.0) as u32;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            doc.erase_circle(from.x + d.x * t, from.y + d.y * t, radius);
        }
    }
}

impl ToolHandler for EraserTool {
    fn on_press(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let radius = ctx.settings.eraser_radius();
        let p = event.pos;
        ctx.push_history("Eraser");
        ctx.edit_in_place(|doc| doc.erase_circle(p.x, p.y, radius));
        self.last = Some(p);
    }

    fn on_move(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        let Some(last) = self.last else {
            return;
        };
        if last == event.pos {
            return;
        }
        let radius = ctx.settings.eraser_radius();
        let to = event.pos;
        ctx.edit_in_place(|doc| Self::stamp_segment(doc, last, to, radius));
        self.last = Some(to);
    }

    fn on_release(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        self.on_move(ctx, event);
        self.last = None;
    }

    fn cursor_hint(&self) -> CursorHint {
        CursorHint::Crosshair
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

// ============================================================================
// TOOL SET
// ============================================================================

/// One instance of every tool, owned by the session.
#[derive(Default)]
pub struct ToolSet {
    pub rect_select: RectSelectTool,
    pub lasso_select: LassoSelectTool,
    pub eraser: EraserTool,
    pub cell_move: CellMoveTool,
    pub cell_swap: CellSwapTool,
    pub cell_scale: CellScaleTool,
    pub cell_ruler: CellRulerTool,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_mut(&mut self, tool: Tool) -> &mut dyn ToolHandler {
        match tool {
            Tool::RectSelect => &mut self.rect_select,
            Tool::LassoSelect => &mut self.lasso_select,
            Tool::Eraser => &mut self.eraser,
            Tool::CellMove => &mut self.cell_move,
            Tool::CellSwap => &mut self.cell_swap,
            Tool::CellScale => &mut self.cell_scale,
            Tool::CellRuler => &mut self.cell_ruler,
        }
    }

    pub fn handler(&self, tool: Tool) -> &dyn ToolHandler {
        match tool {
            Tool::RectSelect => &self.rect_select,
            Tool::LassoSelect => &self.lasso_select,
            Tool::Eraser => &self.eraser,
            Tool::CellMove => &self.cell_move,
            Tool::CellSwap => &self.cell_swap,
            Tool::CellScale => &self.cell_scale,
            Tool::CellRuler => &self.cell_ruler,
        }
    }

    /// Reset every tool, including state that survives a tool switch
    /// (lasso session, swap/scale highlights). Used on load and resize.
    pub fn reset_all(&mut self) {
        for &tool in Tool::all() {
            self.handler_mut(tool).reset();
        }
        self.lasso_select.end_session();
        self.cell_swap.clear();
        self.cell_scale.clear();
    }
}
