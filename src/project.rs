use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::{RasterDocument, Selection};
use crate::components::history::HistoryManager;
use crate::components::tools::{
    CursorHint, Modifiers, PointerButton, PointerEvent, Tool, ToolContext, ToolHandler, ToolSet,
};
use crate::error::{EditorError, Result};
use crate::events::{EditorEvent, EventBus};
use crate::geometry::Point;
use crate::grid::GridLayout;
use crate::io;
use crate::ops::{canvas_ops, transform};
use crate::settings::EditorSettings;
use crate::viewport::ViewportTransform;

const UNTITLED_NAME: &str = "Untitled";

/// Which gesture owns the pointer between press and release.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
enum ActiveGesture {
    #[default]
    None,
    Pan {
        last: Point,
        button: PointerButton,
    },
    Tool {
        tool: Tool,
        button: PointerButton,
    },
}

struct FrameCache {
    key: (u64, u64),
    frames: Vec<RgbaImage>,
}

// ============================================================================
// SESSION - the single open document and everything editing it
// ============================================================================

/// One editing session: at most one document, its grid, selection, history,
/// viewport and tools. Pointer input arrives in widget coordinates.
pub struct Session {
    pub id: Uuid,
    document: Option<RasterDocument>,
    history: HistoryManager,
    grid: GridLayout,
    selection: Selection,
    viewport: ViewportTransform,
    settings: EditorSettings,
    tools: ToolSet,
    active_tool: Tool,
    gesture: ActiveGesture,
    space_held: bool,
    view_size: (f32, f32),
    /// `None` for unsaved/untitled documents.
    path: Option<PathBuf>,
    name: String,
    /// Document generation at the last load/save.
    clean_generation: u64,
    events: EventBus,
    frame_cache: Option<FrameCache>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            document: None,
            history: HistoryManager::default(),
            grid: GridLayout::new(),
            selection: Selection::None,
            viewport: ViewportTransform::default(),
            settings: EditorSettings::default(),
            tools: ToolSet::new(),
            active_tool: Tool::default(),
            gesture: ActiveGesture::None,
            space_held: false,
            view_size: (0.0, 0.0),
            path: None,
            name: UNTITLED_NAME.to_string(),
            clean_generation: 0,
            events: EventBus::new(),
            frame_cache: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn document(&self) -> Option<&RasterDocument> {
        self.document.as_ref()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EditorSettings {
        &mut self.settings
    }

    /// Tool instances, for renderers reading highlights and previews.
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dirty(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|d| d.generation() != self.clean_generation)
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty() {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn subscribe(&self) -> Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn can_undo(&self) -> bool {
        self.document.is_some() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.document.is_some() && self.history.can_redo()
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Load a PNG. On failure the current document, history and selection
    /// are left exactly as they were.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let pixels = io::load_png(path)?;
        self.install_document(pixels);
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        Ok(())
    }

    /// Start an untitled session on an in-memory image.
    pub fn open_image(&mut self, pixels: RgbaImage) {
        self.install_document(pixels);
        self.path = None;
        self.name = UNTITLED_NAME.to_string();
    }

    fn install_document(&mut self, pixels: RgbaImage) {
        let document = RasterDocument::from_image(pixels);
        self.clean_generation = document.generation();
        let (w, h) = document.dimensions();
        self.document = Some(document);
        self.history.clear();
        self.selection = Selection::None;
        self.tools.reset_all();
        self.gesture = ActiveGesture::None;
        self.frame_cache = None;
        self.viewport.fit(self.view_size.0, self.view_size.1, w, h);

        self.events.emit(EditorEvent::DocumentChanged);
        self.events.emit(EditorEvent::SelectionChanged);
        self.events.emit(EditorEvent::ViewportChanged);
    }

    fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| UNTITLED_NAME.to_string());
        }
    }

    /// Save to the current path. `Ok(false)` when the session is untitled
    /// and the host needs to ask for a path (then call [`save_as`](Self::save_as)).
    pub fn save(&mut self) -> Result<bool> {
        let doc = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };
        io::save_png(doc.pixels(), &path)?;
        self.clean_generation = doc.generation();
        log::info!("saved {}", path.display());
        Ok(true)
    }

    /// Save under `path` (`.png` appended when missing) and adopt it as the
    /// session path. Returns the path actually written.
    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf> {
        let doc = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        let path = io::ensure_png_extension(path);
        io::save_png(doc.pixels(), &path)?;
        self.clean_generation = doc.generation();
        log::info!("saved {}", path.display());
        self.path = Some(path.clone());
        self.update_name_from_path();
        Ok(path)
    }

    /// Write one PNG per cell into `dir`, named after the current file.
    pub fn export_cells(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let doc = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        let stem = io::export_stem(self.path.as_deref());
        io::export_cells(doc, &self.grid, dir, &stem)
    }

    // ------------------------------------------------------------------
    // Whole-document edits
    // ------------------------------------------------------------------

    pub fn resize_to_preset(&mut self, index: usize) -> Result<()> {
        let preset = transform::preset(index).ok_or(EditorError::UnknownPreset(index))?;
        let doc = self.document.as_mut().ok_or(EditorError::NoDocument)?;
        self.history.push("Resize Image", doc);
        doc.resize(preset.width, preset.height);
        log::info!("resized document to {}", preset.label());

        self.selection = Selection::None;
        self.tools.reset_all();
        self.viewport.fit(self.view_size.0, self.view_size.1, preset.width, preset.height);
        self.events.emit(EditorEvent::DocumentChanged);
        self.events.emit(EditorEvent::SelectionChanged);
        self.events.emit(EditorEvent::ViewportChanged);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let Some(entry) = self.history.undo(doc) else {
            return false;
        };
        log::info!("undo: {}", entry.description());
        self.restore(entry.into_pixels());
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let Some(entry) = self.history.redo(doc) else {
            return false;
        };
        log::info!("redo: {}", entry.description());
        self.restore(entry.into_pixels());
        true
    }

    fn restore(&mut self, pixels: RgbaImage) {
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        let resized = doc.dimensions() != pixels.dimensions();
        doc.replace(pixels);
        if resized {
            let (w, h) = doc.dimensions();
            self.selection = Selection::None;
            self.tools.reset_all();
            self.viewport.fit(self.view_size.0, self.view_size.1, w, h);
            self.events.emit(EditorEvent::SelectionChanged);
            self.events.emit(EditorEvent::ViewportChanged);
        }
        self.events.emit(EditorEvent::DocumentChanged);
    }

    /// Delete key: clear the selected pixels. Returns whether anything was
    /// erased.
    pub fn delete_selection(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        match &self.selection {
            Selection::None => return false,
            Selection::Rect(rect) => {
                if rect.is_empty() {
                    return false;
                }
                self.history.push("Delete Selection", doc);
                doc.erase_rect(*rect);
            }
            Selection::Lasso(polygon) => {
                self.history.push("Delete Selection", doc);
                canvas_ops::delete_lasso(doc, polygon);
            }
        }
        log::debug!("deleted selection");
        self.events.emit(EditorEvent::DocumentChanged);
        true
    }

    /// Mirror the rect selection, or the whole document when there is no
    /// rect selection.
    pub fn flip_horizontal(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let region = self.selection.rect().filter(|r| !r.is_empty());
        self.history.push("Flip Horizontal", doc);
        doc.flip_horizontal(region);
        self.events.emit(EditorEvent::DocumentChanged);
        true
    }

    /// Escape: drop the displayed selection. A drag in flight keeps its own
    /// state until release.
    pub fn clear_selection(&mut self) {
        self.tools.lasso_select.end_session();
        if !self.selection.is_none() {
            self.selection = Selection::None;
            self.events.emit(EditorEvent::SelectionChanged);
        }
    }

    /// Scale the cells selected with the cell-scale tool.
    pub fn apply_cell_scale(&mut self, factor: f32) -> Result<bool> {
        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;
        let mut ctx = ToolContext {
            document,
            history: &mut self.history,
            grid: &mut self.grid,
            selection: &mut self.selection,
            settings: &self.settings,
            events: &self.events,
            zoom: self.viewport.zoom(),
        };
        self.tools.cell_scale.apply(&mut ctx, factor)
    }

    pub fn select_all_cells(&mut self) {
        self.tools.cell_scale.select_all(&self.grid);
        self.events.emit(EditorEvent::SelectionChanged);
    }

    // ------------------------------------------------------------------
    // Grid
    // ------------------------------------------------------------------

    /// Change cols/rows (clamped to 1..=20). Cell highlights are dropped
    /// since their addresses no longer mean the same region.
    pub fn set_grid_dimensions(&mut self, cols: u32, rows: u32) {
        self.update_grid(|grid| grid.set_dimensions(cols, rows));
    }

    /// Apply any grid setting change (colors, visibility, rulers, size).
    /// A change of cols/rows drops the cell highlights like
    /// [`Session::set_grid_dimensions`].
    pub fn update_grid(&mut self, update: impl FnOnce(&mut GridLayout)) {
        let before = self.grid.revision();
        let dims = (self.grid.cols(), self.grid.rows());
        update(&mut self.grid);
        if (self.grid.cols(), self.grid.rows()) != dims {
            self.tools.cell_swap.clear();
            self.tools.cell_scale.clear();
        }
        if self.grid.revision() != before {
            self.events.emit(EditorEvent::GridChanged);
        }
    }

    /// Per-cell crops in row-major order, recomputed only after the
    /// document or the grid changed.
    pub fn animation_frames(&mut self) -> &[RgbaImage] {
        let Some(doc) = self.document.as_ref() else {
            return &[];
        };
        let key = (doc.generation(), self.grid.revision());
        if self.frame_cache.as_ref().is_none_or(|c| c.key != key) {
            self.frame_cache = Some(FrameCache { key, frames: self.grid.cell_crops(doc) });
        }
        self.frame_cache.as_ref().map(|c| c.frames.as_slice()).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view_size = (width.max(0.0), height.max(0.0));
    }

    pub fn fit_view(&mut self) {
        if let Some((w, h)) = self.document.as_ref().map(RasterDocument::dimensions) {
            self.viewport.fit(self.view_size.0, self.view_size.1, w, h);
            self.events.emit(EditorEvent::ViewportChanged);
        }
    }

    pub fn wheel(&mut self, delta_y: f32, mouse: Point) {
        if self.document.is_none() || delta_y == 0.0 {
            return;
        }
        self.viewport.wheel(delta_y, mouse);
        self.events.emit(EditorEvent::ViewportChanged);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.settings.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / self.settings.zoom_step);
    }

    fn zoom_by(&mut self, factor: f32) {
        let centre = Point::new(self.view_size.0 / 2.0, self.view_size.1 / 2.0);
        self.viewport.zoom_around(factor, centre);
        self.events.emit(EditorEvent::ViewportChanged);
    }

    // ------------------------------------------------------------------
    // Tools and pointer dispatch
    // ------------------------------------------------------------------

    /// Switch tools, dropping the previous tool's in-progress gesture.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.active_tool {
            return;
        }
        self.tools.handler_mut(self.active_tool).reset();
        if let ActiveGesture::Tool { tool: owner, .. } = self.gesture {
            self.tools.handler_mut(owner).reset();
            self.gesture = ActiveGesture::None;
        }
        log::debug!("tool: {}", tool.label());
        self.active_tool = tool;
    }

    pub fn key_space(&mut self, held: bool) {
        self.space_held = held;
    }

    pub fn cursor_hint(&self) -> CursorHint {
        match self.gesture {
            ActiveGesture::Pan { .. } => CursorHint::Grabbing,
            ActiveGesture::Tool { tool, .. } => self.tools.handler(tool).cursor_hint(),
            ActiveGesture::None if self.space_held => CursorHint::Grab,
            ActiveGesture::None => self.tools.handler(self.active_tool).cursor_hint(),
        }
    }

    pub fn pointer_press(&mut self, widget_pos: Point, button: PointerButton, modifiers: Modifiers) {
        if self.document.is_none() || self.gesture != ActiveGesture::None {
            return;
        }
        let pans = match button {
            PointerButton::Middle => true,
            PointerButton::Primary => self.space_held,
            PointerButton::Secondary => self.active_tool != Tool::CellRuler,
        };
        if pans {
            self.gesture = ActiveGesture::Pan { last: widget_pos, button };
            return;
        }
        let tool = if button == PointerButton::Primary && modifiers.contains(Modifiers::ALT) {
            Tool::CellMove
        } else {
            self.active_tool
        };
        self.gesture = ActiveGesture::Tool { tool, button };
        let event = PointerEvent::new(self.viewport.widget_to_image(widget_pos), button, modifiers);
        self.dispatch(tool, |handler, ctx| handler.on_press(ctx, &event));
    }

    pub fn pointer_move(&mut self, widget_pos: Point, modifiers: Modifiers) {
        match self.gesture {
            ActiveGesture::None => {}
            ActiveGesture::Pan { last, button } => {
                let d = widget_pos - last;
                self.viewport.pan_by(d.x, d.y);
                self.gesture = ActiveGesture::Pan { last: widget_pos, button };
                self.events.emit(EditorEvent::ViewportChanged);
            }
            ActiveGesture::Tool { tool, button } => {
                let event = PointerEvent::new(self.viewport.widget_to_image(widget_pos), button, modifiers);
                self.dispatch(tool, |handler, ctx| handler.on_move(ctx, &event));
            }
        }
    }

    pub fn pointer_release(&mut self, widget_pos: Point, button: PointerButton, modifiers: Modifiers) {
        match self.gesture {
            ActiveGesture::None => {}
            ActiveGesture::Pan { button: owner, .. } => {
                if owner == button {
                    self.gesture = ActiveGesture::None;
                }
            }
            ActiveGesture::Tool { tool, button: owner } => {
                if owner != button {
                    return;
                }
                self.gesture = ActiveGesture::None;
                let event = PointerEvent::new(self.viewport.widget_to_image(widget_pos), button, modifiers);
                self.dispatch(tool, |handler, ctx| handler.on_release(ctx, &event));
            }
        }
    }

    fn dispatch(&mut self, tool: Tool, f: impl FnOnce(&mut dyn ToolHandler, &mut ToolContext<'_>)) {
        let Some(document) = self.document.as_mut() else {
            return;
        };
        let mut ctx = ToolContext {
            document,
            history: &mut self.history,
            grid: &mut self.grid,
            selection: &mut self.selection,
            settings: &self.settings,
            events: &self.events,
            zoom: self.viewport.zoom(),
        };
        f(self.tools.handler_mut(tool), &mut ctx);
    }
}
