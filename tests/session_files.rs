use std::path::Path;

use gridsprite::{EditorError, EditorEvent, Modifiers, Point, PointerButton, Session};
use image::{Rgba, RgbaImage};

// ============================================================================
// Helpers
// ============================================================================

fn sheet(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 7, ((x * 3 + y) % 256) as u8]))
}

fn write_png(path: &Path, img: &RgbaImage) {
    gridsprite::io::save_png(img, path).unwrap();
}

// ============================================================================
// Load
// ============================================================================

#[test]
fn open_resets_history_and_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hero.png");
    write_png(&path, &sheet(30, 30));

    let mut s = Session::new();
    s.open_image(sheet(10, 10));
    s.pointer_press(Point::new(1.0, 1.0), PointerButton::Primary, Modifiers::empty());
    s.pointer_release(Point::new(6.0, 6.0), PointerButton::Primary, Modifiers::empty());
    assert!(s.delete_selection());
    assert!(s.can_undo());

    let events = s.subscribe();
    s.open(&path).unwrap();
    assert_eq!(s.document().unwrap().pixels(), &sheet(30, 30));
    assert!(!s.can_undo());
    assert!(s.selection().is_none());
    assert_eq!(s.display_title(), "hero.png");
    assert!(events.try_iter().any(|e| e == EditorEvent::DocumentChanged));
}

#[test]
fn failed_open_leaves_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("not-an-image.png");
    std::fs::write(&bogus, b"definitely not png data").unwrap();

    let mut s = Session::new();
    s.open_image(sheet(12, 12));
    s.pointer_press(Point::new(1.0, 1.0), PointerButton::Primary, Modifiers::empty());
    s.pointer_release(Point::new(6.0, 6.0), PointerButton::Primary, Modifiers::empty());
    assert!(s.delete_selection());
    let before = s.document().unwrap().pixels().clone();

    assert!(matches!(s.open(&bogus), Err(EditorError::Load { .. })));
    assert!(matches!(s.open(&dir.path().join("missing.png")), Err(EditorError::Load { .. })));
    assert_eq!(s.document().unwrap().pixels(), &before);
    assert!(s.can_undo());
    assert!(!s.selection().is_none());
    assert_eq!(s.path(), None);
}

// ============================================================================
// Save
// ============================================================================

#[test]
fn untitled_save_defers_to_save_as() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = Session::new();
    s.open_image(sheet(9, 9));
    s.pointer_press(Point::new(0.0, 0.0), PointerButton::Primary, Modifiers::empty());
    s.pointer_release(Point::new(3.0, 3.0), PointerButton::Primary, Modifiers::empty());
    s.delete_selection();
    assert!(s.is_dirty());
    assert!(!s.save().unwrap());

    let written = s.save_as(&dir.path().join("walk")).unwrap();
    assert_eq!(written, dir.path().join("walk.png"));
    assert!(!s.is_dirty());
    assert_eq!(s.display_title(), "walk.png");

    let reloaded = gridsprite::io::load_png(&written).unwrap();
    assert_eq!(&reloaded, s.document().unwrap().pixels());
    assert_eq!(reloaded.get_pixel(1, 1)[3], 0);

    assert!(s.save().unwrap());
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn export_writes_row_major_cells() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("run.png");
    write_png(&src, &sheet(31, 20));

    let mut s = Session::new();
    s.open(&src).unwrap();
    s.set_grid_dimensions(3, 2);

    let out = dir.path().join("frames");
    let written = s.export_cells(&out).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["run_0_0.png", "run_0_1.png", "run_0_2.png", "run_1_0.png", "run_1_1.png", "run_1_2.png"]
    );

    let last_col = gridsprite::io::load_png(&out.join("run_0_2.png")).unwrap();
    assert_eq!(last_col.dimensions(), (11, 10));
    assert_eq!(last_col.get_pixel(0, 0), sheet(31, 20).get_pixel(20, 0));
}

#[test]
fn untitled_export_uses_fallback_stem() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = Session::new();
    s.open_image(sheet(4, 4));
    s.set_grid_dimensions(1, 1);
    let written = s.export_cells(dir.path()).unwrap();
    assert_eq!(written, vec![dir.path().join("sprite_0_0.png")]);
}

#[test]
fn file_operations_need_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = Session::new();
    assert!(matches!(s.export_cells(dir.path()), Err(EditorError::NoDocument)));
    assert!(matches!(s.save_as(&dir.path().join("x")), Err(EditorError::NoDocument)));
    assert!(matches!(s.resize_to_preset(1), Err(EditorError::NoDocument)));
}
