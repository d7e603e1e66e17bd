use gridsprite::components::tools::ToolSet;
use gridsprite::{
    Cell, EditorEvent, Modifiers, PixelRect, Point, PointerButton, RulerAxis, Selection, Session, Tool,
};
use image::{Rgba, RgbaImage};

// ============================================================================
// Helpers
// ============================================================================

/// Opaque image where each pixel encodes its own position.
fn patterned(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, ((x + y) % 251) as u8, 255]))
}

fn session(w: u32, h: u32) -> Session {
    let mut s = Session::new();
    s.open_image(patterned(w, h));
    s
}

/// Image coordinates → widget coordinates for the session's current view.
fn at(s: &Session, x: f32, y: f32) -> Point {
    s.viewport().image_to_widget(Point::new(x, y))
}

fn drag_with(s: &mut Session, from: (f32, f32), to: (f32, f32), button: PointerButton, mods: Modifiers) {
    let a = at(s, from.0, from.1);
    let b = at(s, to.0, to.1);
    s.pointer_press(a, button, mods);
    s.pointer_move(b, mods);
    s.pointer_release(b, button, mods);
}

fn drag(s: &mut Session, from: (f32, f32), to: (f32, f32)) {
    drag_with(s, from, to, PointerButton::Primary, Modifiers::empty());
}

fn click(s: &mut Session, x: f32, y: f32, button: PointerButton) {
    let p = at(s, x, y);
    s.pointer_press(p, button, Modifiers::empty());
    s.pointer_release(p, button, Modifiers::empty());
}

fn crop(s: &Session, r: PixelRect) -> RgbaImage {
    s.document().unwrap().crop(r)
}

fn alpha(s: &Session, x: u32, y: u32) -> u8 {
    s.document().unwrap().pixels().get_pixel(x, y)[3]
}

// ============================================================================
// Rect select
// ============================================================================

#[test]
fn rect_move_through_fitted_view() {
    let mut s = Session::new();
    s.set_view_size(640.0, 480.0);
    s.open_image(patterned(120, 90));
    assert!(s.viewport().zoom() > 1.0);

    drag(&mut s, (20.5, 20.5), (60.5, 50.5));
    let src = PixelRect::new(20, 20, 40, 30);
    assert_eq!(s.selection(), &Selection::Rect(src));
    let before = crop(&s, src);

    drag(&mut s, (40.5, 35.5), (55.75, 40.75));
    let dst = src.translated(15, 5);
    assert_eq!(s.selection(), &Selection::Rect(dst));
    assert_eq!(crop(&s, dst), before);
    assert_eq!(alpha(&s, 21, 21), 0);

    assert!(s.undo());
    assert_eq!(crop(&s, src), before);
    assert!(s.redo());
    assert_eq!(crop(&s, dst), before);
}

#[test]
fn cancel_mid_drag_still_commits_on_release() {
    let mut s = session(100, 100);
    drag(&mut s, (10.5, 10.5), (40.5, 40.5));
    let src = PixelRect::new(10, 10, 30, 30);
    let before = crop(&s, src);

    let mods = Modifiers::empty();
    s.pointer_press(at(&s, 25.5, 25.5), PointerButton::Primary, mods);
    s.pointer_move(at(&s, 45.75, 25.5), mods);
    s.clear_selection();
    assert!(s.selection().is_none());
    s.pointer_release(at(&s, 45.75, 25.5), PointerButton::Primary, mods);

    assert_eq!(crop(&s, src.translated(20, 0)), before);
    assert_eq!(s.history().undo_count(), 1);
}

#[test]
fn delete_rect_selection_clears_pixels() {
    let mut s = session(40, 40);
    assert!(!s.delete_selection());
    drag(&mut s, (5.5, 5.5), (15.5, 15.5));
    assert!(s.delete_selection());
    assert_eq!(alpha(&s, 5, 5), 0);
    assert_eq!(alpha(&s, 14, 14), 0);
    assert_eq!(alpha(&s, 15, 15), 255);
    assert_eq!(s.history().undo_description(), Some("Delete Selection"));
}

#[test]
fn flip_mirrors_selection_only() {
    let mut s = session(40, 10);
    drag(&mut s, (0.5, 0.5), (10.5, 10.5));
    assert!(s.flip_horizontal());
    let px = s.document().unwrap().pixels();
    assert_eq!(px.get_pixel(0, 3)[0], 9);
    assert_eq!(px.get_pixel(9, 3)[0], 0);
    assert_eq!(px.get_pixel(20, 3)[0], 20);

    s.clear_selection();
    assert!(s.flip_horizontal());
    assert_eq!(s.document().unwrap().pixels().get_pixel(39, 3)[0], 9);
    assert_eq!(s.history().undo_count(), 2);
}

// ============================================================================
// Lasso
// ============================================================================

#[test]
fn lasso_select_then_drag_moves_footprint() {
    let mut s = session(80, 80);
    let original = s.document().unwrap().pixels().clone();
    s.set_tool(Tool::LassoSelect);

    let mods = Modifiers::empty();
    let outline = [(20.25, 20.25), (40.25, 20.25), (40.25, 40.25), (20.25, 40.25)];
    s.pointer_press(at(&s, outline[0].0, outline[0].1), PointerButton::Primary, mods);
    for &(x, y) in &outline[1..] {
        s.pointer_move(at(&s, x, y), mods);
    }
    let last = at(&s, outline[3].0, outline[3].1);
    s.pointer_release(last, PointerButton::Primary, mods);
    assert!(s.selection().lasso().is_some_and(|p| p.is_closed()));
    assert!(!s.tools().lasso_select.has_move_session());

    drag(&mut s, (30.25, 30.25), (40.5, 25.5));
    assert!(s.tools().lasso_select.has_move_session());

    let src = PixelRect::new(20, 20, 20, 20);
    let expected = gridsprite::RasterDocument::from_image(original).crop(src);
    assert_eq!(crop(&s, src.translated(10, -5)), expected);
    for y in 35..40 {
        for x in 20..40 {
            assert_eq!(alpha(&s, x, y), 0, "({x},{y})");
        }
    }
    assert_eq!(s.history().undo_description(), Some("Lasso Move"));
}

#[test]
fn switching_tools_abandons_lasso_drawing() {
    let mut s = session(50, 50);
    s.set_tool(Tool::LassoSelect);
    let mods = Modifiers::empty();
    s.pointer_press(at(&s, 5.0, 5.0), PointerButton::Primary, mods);
    s.pointer_move(at(&s, 20.0, 5.0), mods);
    s.pointer_move(at(&s, 20.0, 20.0), mods);
    assert!(s.tools().lasso_select.drawing_points().is_some());

    s.set_tool(Tool::Eraser);
    assert!(s.tools().lasso_select.drawing_points().is_none());
    s.pointer_release(at(&s, 5.0, 20.0), PointerButton::Primary, mods);
    assert!(s.selection().is_none());
    assert!(!s.can_undo());
}

// ============================================================================
// Cell tools and dispatch
// ============================================================================

#[test]
fn alt_drag_moves_cell_with_any_tool() {
    let mut s = session(300, 300);
    assert_eq!(s.active_tool(), Tool::RectSelect);
    drag_with(&mut s, (150.5, 150.5), (160.75, 150.5), PointerButton::Primary, Modifiers::ALT);

    assert!(s.selection().is_none());
    assert_eq!(s.history().undo_description(), Some("Move Cell"));
    assert_eq!(alpha(&s, 105, 150), 0);
    assert_eq!(s.document().unwrap().pixels().get_pixel(120, 150)[0], 110);
    // Content pushed past the right edge of the cell is clipped, not spilled.
    assert_eq!(s.document().unwrap().pixels().get_pixel(200, 150)[0], 200);
}

#[test]
fn swap_then_undo_restores() {
    let mut s = session(300, 300);
    let original = s.document().unwrap().pixels().clone();
    s.set_tool(Tool::CellSwap);
    click(&mut s, 50.0, 50.0, PointerButton::Primary);
    assert_eq!(s.tools().cell_swap.pending(), Some(Cell::new(0, 0)));
    click(&mut s, 250.0, 250.0, PointerButton::Primary);
    assert_ne!(s.document().unwrap().pixels(), &original);

    assert!(s.undo());
    assert_eq!(s.document().unwrap().pixels(), &original);
    assert!(!s.can_undo());
    assert!(s.can_redo());
}

#[test]
fn cell_scale_over_all_cells() {
    let mut s = session(90, 90);
    assert!(!s.apply_cell_scale(0.5).unwrap());
    s.select_all_cells();
    assert_eq!(s.tools().cell_scale.selected_count(), 9);
    assert!(s.apply_cell_scale(0.5).unwrap());
    assert_eq!(s.history().undo_count(), 1);
    // Every cell shrank toward its centre, leaving transparent borders.
    assert_eq!(alpha(&s, 0, 0), 0);
    assert_eq!(alpha(&s, 31, 31), 0);
    assert!(alpha(&s, 45, 45) > 200);
    assert!(s.apply_cell_scale(-1.0).is_err());
}

#[test]
fn changing_grid_drops_cell_highlights() {
    let mut s = session(90, 90);
    s.set_tool(Tool::CellScale);
    click(&mut s, 10.0, 10.0, PointerButton::Primary);
    assert_eq!(s.tools().cell_scale.selected_count(), 1);
    s.set_grid_dimensions(40, 0);
    assert_eq!((s.grid().cols(), s.grid().rows()), (20, 1));
    assert_eq!(s.tools().cell_scale.selected_count(), 0);
}

#[test]
fn regrid_through_update_grid_drops_swap_anchor() {
    let mut s = session(300, 300);
    let original = s.document().unwrap().pixels().clone();
    s.set_tool(Tool::CellSwap);
    click(&mut s, 250.0, 250.0, PointerButton::Primary);
    assert_eq!(s.tools().cell_swap.pending(), Some(Cell::new(2, 2)));
    s.set_tool(Tool::CellScale);
    click(&mut s, 50.0, 50.0, PointerButton::Primary);
    s.set_tool(Tool::CellSwap);

    s.update_grid(|g| g.set_dimensions(2, 2));
    assert_eq!(s.tools().cell_swap.pending(), None);
    assert_eq!(s.tools().cell_scale.selected_count(), 0);

    click(&mut s, 50.0, 50.0, PointerButton::Primary);
    assert_eq!(s.tools().cell_swap.pending(), Some(Cell::new(0, 0)));
    assert_eq!(alpha(&s, 50, 50), 255);
    assert_eq!(s.document().unwrap().pixels(), &original);
    assert!(!s.can_undo());
}

#[test]
fn right_button_pans_except_with_ruler_tool() {
    let mut s = session(300, 300);
    let events = s.subscribe();
    let before = s.viewport().offset();
    s.pointer_press(Point::new(10.0, 10.0), PointerButton::Secondary, Modifiers::empty());
    s.pointer_move(Point::new(30.0, 25.0), Modifiers::empty());
    s.pointer_release(Point::new(30.0, 25.0), PointerButton::Secondary, Modifiers::empty());
    assert_eq!(s.viewport().offset(), before + Point::new(20.0, 15.0));
    assert!(events.try_iter().any(|e| e == EditorEvent::ViewportChanged));

    s.set_tool(Tool::CellRuler);
    click(&mut s, 50.0, 30.0, PointerButton::Primary);
    assert_eq!(s.grid().config().h_rulers().len(), 1);
    let offset = s.viewport().offset();
    click(&mut s, 250.0, 131.0, PointerButton::Secondary);
    assert!(s.grid().config().h_rulers().is_empty());
    assert_eq!(s.viewport().offset(), offset);
    assert!(events.try_iter().any(|e| e == EditorEvent::GridChanged));
}

#[test]
fn space_turns_left_drag_into_pan() {
    let mut s = session(60, 60);
    s.key_space(true);
    assert_eq!(s.cursor_hint(), gridsprite::CursorHint::Grab);
    drag(&mut s, (10.0, 10.0), (20.0, 10.0));
    s.key_space(false);
    assert!(s.selection().is_none());
    assert!(!s.is_dirty());
}

#[test]
fn ruler_axis_toggle_is_reachable() {
    let mut tools = ToolSet::new();
    assert_eq!(tools.cell_ruler.axis(), RulerAxis::Horizontal);
    tools.cell_ruler.toggle_axis();
    assert_eq!(tools.cell_ruler.axis(), RulerAxis::Vertical);
}

// ============================================================================
// Eraser, resize, viewport
// ============================================================================

#[test]
fn eraser_respects_configured_size() {
    let mut s = session(100, 100);
    s.settings_mut().set_eraser_size(10);
    s.set_tool(Tool::Eraser);
    click(&mut s, 50.0, 50.0, PointerButton::Primary);
    assert_eq!(alpha(&s, 50, 50), 0);
    assert_eq!(alpha(&s, 50, 56), 255);
    assert_eq!(s.history().undo_description(), Some("Eraser"));
}

#[test]
fn resize_preset_is_undoable() {
    let mut s = session(64, 32);
    drag(&mut s, (1.5, 1.5), (9.5, 9.5));
    s.resize_to_preset(0).unwrap();
    assert_eq!(s.document().unwrap().dimensions(), (768, 768));
    assert!(s.selection().is_none());
    assert!(s.undo());
    assert_eq!(s.document().unwrap().dimensions(), (64, 32));
}

#[test]
fn wheel_and_buttons_clamp_zoom() {
    let mut s = session(10, 10);
    s.set_view_size(200.0, 200.0);
    s.fit_view();
    let fitted = s.viewport().zoom();
    assert!((fitted - 19.0).abs() < 1e-3);
    for _ in 0..40 {
        s.wheel(1.0, Point::new(100.0, 100.0));
    }
    assert_eq!(s.viewport().zoom(), gridsprite::viewport::MAX_ZOOM);
    for _ in 0..80 {
        s.zoom_out();
    }
    assert_eq!(s.viewport().zoom(), gridsprite::viewport::MIN_ZOOM);
}
