use image::{GrayImage, Rgba, RgbaImage, imageops};
use rayon::prelude::*;

use crate::geometry::{PixelRect, Polygon};
use crate::ops::transform;

/// Fully transparent pixel written by every erase path.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// SELECTION SYSTEM
// ============================================================================

/// The user's designated region. Rect and lasso are mutually exclusive by
/// construction: setting one replaces the other.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Selection {
    #[default]
    None,
    Rect(PixelRect),
    Lasso(Polygon),
}

impl Selection {
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn rect(&self) -> Option<PixelRect> {
        match self {
            Selection::Rect(r) => Some(*r),
            _ => None,
        }
    }

    pub fn lasso(&self) -> Option<&Polygon> {
        match self {
            Selection::Lasso(p) => Some(p),
            _ => None,
        }
    }

    pub fn lasso_mut(&mut self) -> Option<&mut Polygon> {
        match self {
            Selection::Lasso(p) => Some(p),
            _ => None,
        }
    }
}

// ============================================================================
// RASTER DOCUMENT
// ============================================================================

/// The single RGBA image being edited.
///
/// Every mutating method bumps `generation`, which is how caches (cell crops,
/// lasso drag snapshots) detect staleness. History snapshots are taken by the
/// caller *before* calling any of these.
#[derive(Clone)]
pub struct RasterDocument {
    pixels: RgbaImage,
    generation: u64,
}

impl RasterDocument {
    /// New fully transparent document. Dimensions clamp to at least 1×1.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::from_pixel(width.max(1), height.max(1), TRANSPARENT))
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels, generation: 0 }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width(), self.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mark_dirty(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Swap in a whole new buffer (load, resize, undo, redo).
    pub fn replace(&mut self, pixels: RgbaImage) {
        self.pixels = pixels;
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Read-only extraction
    // ------------------------------------------------------------------

    /// Copy out `rect`. The result always has the requested size (clamped to
    /// at least 1×1); areas outside the document come back transparent.
    pub fn crop(&self, rect: PixelRect) -> RgbaImage {
        let w = rect.width.max(1);
        let h = rect.height.max(1);
        let mut out = RgbaImage::from_pixel(w, h, TRANSPARENT);
        let wanted = PixelRect::new(rect.x, rect.y, w, h);
        if let Some(clip) = wanted.intersect(&self.bounds()) {
            let part = imageops::crop_imm(
                &self.pixels,
                clip.x as u32,
                clip.y as u32,
                clip.width,
                clip.height,
            )
            .to_image();
            imageops::replace(
                &mut out,
                &part,
                (clip.x - rect.x) as i64,
                (clip.y - rect.y) as i64,
            );
        }
        out
    }

    // ------------------------------------------------------------------
    // Erase
    // ------------------------------------------------------------------

    /// Make every pixel inside `rect` fully transparent.
    pub fn erase_rect(&mut self, rect: PixelRect) {
        let Some(clip) = rect.intersect(&self.bounds()) else {
            return;
        };
        let stride = self.width() as usize * 4;
        let x0 = clip.x as usize * 4;
        let x1 = clip.right() as usize * 4;
        self.pixels
            .par_chunks_mut(stride)
            .skip(clip.y as usize)
            .take(clip.height as usize)
            .for_each(|row| row[x0..x1].fill(0));
        self.mark_dirty();
    }

    /// Clear a filled circle: every pixel whose centre lies within `radius`
    /// of `(cx, cy)` becomes fully transparent.
    pub fn erase_circle(&mut self, cx: f32, cy: f32, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        let r = radius.ceil() as i32 + 1;
        let area = PixelRect::from_edges(
            cx.floor() as i32 - r,
            cy.floor() as i32 - r,
            cx.floor() as i32 + r + 1,
            cy.floor() as i32 + r + 1,
        );
        let Some(clip) = area.intersect(&self.bounds()) else {
            return;
        };
        let r2 = radius * radius;
        for y in clip.y..clip.bottom() {
            let dy = y as f32 + 0.5 - cy;
            for x in clip.x..clip.right() {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.pixels.put_pixel(x as u32, y as u32, TRANSPARENT);
                }
            }
        }
        self.mark_dirty();
    }

    /// Multiply alpha by the inverted mask: zero where the mask is set,
    /// unchanged where it is clear.
    pub fn erase_mask(&mut self, mask: &GrayImage) {
        apply_alpha(&mut self.pixels, mask, |a, m| mul255(a, 255 - m));
        self.mark_dirty();
    }

    /// Alpha becomes `|alpha - mask|`. Inside a fully-set mask this inverts
    /// alpha rather than zeroing it; the lasso delete command relies on
    /// exactly this rule.
    pub fn erase_mask_difference(&mut self, mask: &GrayImage) {
        apply_alpha(&mut self.pixels, mask, |a, m| a.abs_diff(m));
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Compositing
    // ------------------------------------------------------------------

    /// Source-over composite `src` with its top-left at `(dest_x, dest_y)`,
    /// clipped to the document.
    pub fn composite_at(&mut self, src: &RgbaImage, dest_x: i32, dest_y: i32) {
        let placed = PixelRect::new(dest_x, dest_y, src.width(), src.height());
        let Some(clip) = placed.intersect(&self.bounds()) else {
            return;
        };
        let stride = self.width() as usize * 4;
        let src_stride = src.width() as usize * 4;
        let src_raw = src.as_raw();
        let sx0 = (clip.x - dest_x) as usize;
        let sy0 = (clip.y - dest_y) as usize;
        let cols = clip.width as usize;
        let dx0 = clip.x as usize;

        self.pixels
            .par_chunks_mut(stride)
            .skip(clip.y as usize)
            .take(clip.height as usize)
            .enumerate()
            .for_each(|(i, row)| {
                let src_row = &src_raw[(sy0 + i) * src_stride..(sy0 + i + 1) * src_stride];
                for c in 0..cols {
                    let s = &src_row[(sx0 + c) * 4..(sx0 + c) * 4 + 4];
                    let d = &mut row[(dx0 + c) * 4..(dx0 + c) * 4 + 4];
                    blend_over(d, s);
                }
            });
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Resampling / flipping
    // ------------------------------------------------------------------

    /// Crop `region` and resample it to `width × height` with the editing
    /// filter. Targets clamp to 1×1.
    pub fn resample(&self, region: PixelRect, width: u32, height: u32) -> RgbaImage {
        transform::resample(&self.crop(region), width, height)
    }

    /// Resample the whole document to new dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        let resized = transform::resample(&self.pixels, width, height);
        self.replace(resized);
    }

    /// Mirror left↔right, either the whole document or just `region`
    /// (which is erased and the mirrored copy composited back).
    pub fn flip_horizontal(&mut self, region: Option<PixelRect>) {
        match region {
            None => {
                imageops::flip_horizontal_in_place(&mut self.pixels);
                self.mark_dirty();
            }
            Some(rect) => {
                if rect.is_empty() {
                    return;
                }
                let mut part = self.crop(rect);
                imageops::flip_horizontal_in_place(&mut part);
                self.erase_rect(rect);
                self.composite_at(&part, rect.x, rect.y);
            }
        }
    }
}

/// `src` with alpha multiplied by `mask`; everything outside the mask
/// becomes fully transparent while color channels are kept.
pub fn masked_image(src: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    let mut out = src.clone();
    apply_alpha(&mut out, mask, mul255);
    out
}

/// Straight-alpha source-over for one RGBA pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = src[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.copy_from_slice(src);
        return;
    }
    let da = dst[3] as u32;
    // Weights scaled by 255: source sa*255, destination da*(255-sa).
    let dst_w = da * (255 - sa);
    let out_a = sa * 255 + dst_w;
    for c in 0..3 {
        let v = src[c] as u32 * sa * 255 + dst[c] as u32 * dst_w;
        dst[c] = ((v + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

#[inline]
fn mul255(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Rewrite every alpha byte as `f(alpha, mask)`. Mask and image must share
/// dimensions; mismatched masks are ignored.
fn apply_alpha(pixels: &mut RgbaImage, mask: &GrayImage, f: impl Fn(u8, u8) -> u8 + Sync) {
    if mask.dimensions() != pixels.dimensions() {
        log::warn!(
            "mask {:?} does not match image {:?}; ignoring",
            mask.dimensions(),
            pixels.dimensions()
        );
        return;
    }
    let width = pixels.width() as usize;
    if width == 0 {
        return;
    }
    pixels
        .par_chunks_mut(width * 4)
        .zip(mask.par_chunks(width))
        .for_each(|(row, mrow)| {
            for (px, &m) in row.chunks_exact_mut(4).zip(mrow) {
                px[3] = f(px[3], m);
            }
        });
}
