// ============================================================================
// CANVAS-LEVEL OPERATIONS - region move/copy/scale, lasso move, cell edits
// ============================================================================
//
// None of these push undo history; callers push a snapshot first (tools do it
// through `ToolContext::commit`).

use image::RgbaImage;

use crate::canvas::{RasterDocument, masked_image};
use crate::geometry::{PixelRect, Polygon};
use crate::ops::transform;

/// Cut `src` and drop it `(dx, dy)` away. Lossless: no resampling.
pub fn move_region(doc: &mut RasterDocument, src: PixelRect, dx: i32, dy: i32) -> bool {
    if (dx, dy) == (0, 0) || src.is_empty() {
        return false;
    }
    let part = doc.crop(src);
    doc.erase_rect(src);
    doc.composite_at(&part, src.x + dx, src.y + dy);
    true
}

/// Like [`move_region`] but the source stays put (duplicates pixels).
pub fn copy_region(doc: &mut RasterDocument, src: PixelRect, dx: i32, dy: i32) -> bool {
    if (dx, dy) == (0, 0) || src.is_empty() {
        return false;
    }
    let part = doc.crop(src);
    doc.composite_at(&part, src.x + dx, src.y + dy);
    true
}

/// Resample `src` into `dst`, clearing the source first.
pub fn scale_region(doc: &mut RasterDocument, src: PixelRect, dst: PixelRect) -> bool {
    if src.is_empty() || dst.is_empty() {
        return false;
    }
    let part = doc.resample(src, dst.width, dst.height);
    doc.erase_rect(src);
    doc.composite_at(&part, dst.x, dst.y);
    true
}

// ---------------------------------------------------------------------------
//  Lasso
// ---------------------------------------------------------------------------

/// Integer translation between two positions of the same lasso polygon:
/// difference of vertex centroids, truncated toward zero.
pub fn lasso_translation(original: &Polygon, current: &Polygon) -> Option<(i32, i32)> {
    if original.len() < 3 || current.len() < 3 {
        return None;
    }
    let (ox, oy) = original.centroid()?;
    let (cx, cy) = current.centroid()?;
    Some(((cx - ox) as i32, (cy - oy) as i32))
}

/// Move the pixels under `original` by `(dx, dy)`.
///
/// The cut is taken from `snapshot` (the document as it was when the drag
/// session began), the footprint is cleared from the *current* document, and
/// the shifted cut is composited over it. Returns `false` when the snapshot
/// no longer matches the document size.
pub fn commit_lasso_move(
    doc: &mut RasterDocument,
    snapshot: &RgbaImage,
    original: &Polygon,
    dx: i32,
    dy: i32,
) -> bool {
    let (w, h) = doc.dimensions();
    if snapshot.dimensions() != (w, h) {
        log::warn!("lasso snapshot is {:?}, document is {:?}", snapshot.dimensions(), (w, h));
        return false;
    }
    let mask = original.rasterize(w, h);
    let cut = masked_image(snapshot, &mask);

    let mut shifted = RasterDocument::new(w, h);
    shifted.composite_at(&cut, dx, dy);

    doc.erase_mask(&mask);
    doc.composite_at(shifted.pixels(), 0, 0);
    true
}

/// Delete-key behavior for a lasso selection: alpha becomes
/// `|alpha - mask|` inside the polygon.
pub fn delete_lasso(doc: &mut RasterDocument, polygon: &Polygon) {
    let (w, h) = doc.dimensions();
    let mask = polygon.rasterize(w, h);
    doc.erase_mask_difference(&mask);
}

// ---------------------------------------------------------------------------
//  Cells
// ---------------------------------------------------------------------------

/// Shift a cell's content by `(dx, dy)` inside the cell; whatever leaves the
/// cell is dropped rather than spilling into neighbors.
pub fn move_cell_content(doc: &mut RasterDocument, cell: PixelRect, dx: i32, dy: i32) -> bool {
    if (dx, dy) == (0, 0) || cell.is_empty() {
        return false;
    }
    let region = doc.crop(cell);
    doc.erase_rect(cell);
    let mut cell_canvas = RasterDocument::new(cell.width, cell.height);
    cell_canvas.composite_at(&region, dx, dy);
    doc.composite_at(cell_canvas.pixels(), cell.x, cell.y);
    true
}

/// Exchange two cells' content, resampling each to the other's size when
/// the grid is non-uniform.
pub fn swap_cells(doc: &mut RasterDocument, a: PixelRect, b: PixelRect) -> bool {
    if a == b || a.is_empty() || b.is_empty() {
        return false;
    }
    let mut region_a = doc.crop(a);
    let mut region_b = doc.crop(b);
    if (a.width, a.height) != (b.width, b.height) {
        region_a = transform::resample(&region_a, b.width, b.height);
        region_b = transform::resample(&region_b, a.width, a.height);
    }
    doc.erase_rect(a);
    doc.erase_rect(b);
    doc.composite_at(&region_b, a.x, a.y);
    doc.composite_at(&region_a, b.x, b.y);
    true
}

/// Scale each cell's content by `factor` about the cell centre.
///
/// Cells are processed in the order given (callers pass row-major order), so
/// later cells overwrite earlier ones where scaled content overlaps. Content
/// is clipped only at the document edge, not the cell edge.
pub fn scale_cells(doc: &mut RasterDocument, cells: &[PixelRect], factor: f32) -> usize {
    let mut scaled_count = 0;
    for &cell in cells {
        if cell.is_empty() {
            continue;
        }
        let content = doc.crop(cell);
        let new_w = ((cell.width as f32 * factor).floor() as u32).max(1);
        let new_h = ((cell.height as f32 * factor).floor() as u32).max(1);
        let scaled = transform::resample(&content, new_w, new_h);

        let ox = cell.x + (cell.width as i32 - new_w as i32).div_euclid(2);
        let oy = cell.y + (cell.height as i32 - new_h as i32).div_euclid(2);

        doc.erase_rect(cell);
        doc.composite_at(&scaled, ox, oy);
        scaled_count += 1;
    }
    scaled_count
}
