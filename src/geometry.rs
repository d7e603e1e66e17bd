// ============================================================================
// GEOMETRY - image-space points, pixel rectangles, lasso polygons
// ============================================================================

use std::ops::{Add, Sub};

use image::GrayImage;
use rayon::prelude::*;

/// A position in image (document) coordinates. Sub-pixel precision is kept
/// so tools can translate polygons by fractional pointer deltas.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The pixel containing this point.
    pub fn to_pixel(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Integer position truncated toward zero (how polygon vertices are
    /// snapped before mask rasterization).
    pub fn truncated(self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// ============================================================================
// PIXEL RECT
// ============================================================================

/// Axis-aligned rectangle on the pixel lattice. `x`/`y` may be negative
/// (e.g. a selection dragged past the image edge); all document operations
/// clip against the document bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rect spanning two corner pixels (`b` exclusive).
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        let x0 = a.0.min(b.0);
        let y0 = a.1.min(b.1);
        let x1 = a.0.max(b.0);
        let y1 = a.1.max(b.1);
        Self::from_edges(x0, y0, x1, y1)
    }

    /// Rect from left/top/right/bottom edges (right and bottom exclusive).
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x as f32
            && p.x < self.right() as f32
            && p.y >= self.y as f32
            && p.y < self.bottom() as f32
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self::from_edges(left, top, right, bottom))
    }

    pub fn overlaps(&self, other: &PixelRect) -> bool {
        self.intersect(other).is_some()
    }
}

// ============================================================================
// POLYGON
// ============================================================================

/// Ordered lasso polygon in image coordinates.
///
/// A closed polygon repeats its first vertex at the end, matching how the
/// lasso tool finalizes a free-hand stroke.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() >= 4 && self.points.first() == self.points.last()
    }

    /// Append the first vertex so the outline is explicitly closed.
    pub fn close(&mut self) {
        if let Some(&first) = self.points.first()
            && self.points.last() != Some(&first)
        {
            self.points.push(first);
        }
    }

    /// Whether the outline has at least three distinct vertices (a closed
    /// polygon's repeated start point and duplicates count once). Stops
    /// scanning as soon as the third one turns up.
    pub fn has_area_vertices(&self) -> bool {
        let mut seen: Vec<Point> = Vec::with_capacity(3);
        for p in &self.points {
            if !seen.contains(p) {
                seen.push(*p);
                if seen.len() == 3 {
                    return true;
                }
            }
        }
        false
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Mean of the integer-truncated vertices.
    pub fn centroid(&self) -> Option<(f32, f32)> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f32;
        let (sx, sy) = self.points.iter().fold((0i64, 0i64), |(sx, sy), p| {
            let (x, y) = p.truncated();
            (sx + x as i64, sy + y as i64)
        });
        Some((sx as f32 / n, sy as f32 / n))
    }

    /// Even-odd point containment.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Rasterize into a `width × height` binary mask (255 inside, 0 outside).
    ///
    /// Vertices are truncated to integers first; a pixel is inside when its
    /// centre falls inside the polygon (scanline fill, even-odd rule).
    pub fn rasterize(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        if width == 0 || height == 0 || self.points.len() < 3 {
            return mask;
        }

        let pts: Vec<(f32, f32)> = self
            .points
            .iter()
            .map(|p| {
                let (x, y) = p.truncated();
                (x as f32, y as f32)
            })
            .collect();
        let n = pts.len();

        mask.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                let yf = y as f32 + 0.5;
                let mut nodes: Vec<f32> = Vec::new();
                for i in 0..n {
                    let (xi, yi) = pts[i];
                    let (xj, yj) = pts[(i + 1) % n];
                    if (yi <= yf && yj > yf) || (yj <= yf && yi > yf) {
                        let t = (yf - yi) / (yj - yi);
                        nodes.push(xi + t * (xj - xi));
                    }
                }
                nodes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

                let mut k = 0;
                while k + 1 < nodes.len() {
                    // Pixel x is covered when x + 0.5 lies in [start, end).
                    let start = (nodes[k] - 0.5).ceil().max(0.0) as usize;
                    let end = ((nodes[k + 1] - 0.5).ceil().max(0.0) as usize).min(width as usize);
                    for v in row.iter_mut().take(end).skip(start) {
                        *v = 255;
                    }
                    k += 2;
                }
            });

        mask
    }
}
