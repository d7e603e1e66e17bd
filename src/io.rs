use image::codecs::png::PngEncoder;
use image::{ImageError, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::canvas::RasterDocument;
use crate::error::{EditorError, Result};
use crate::grid::GridLayout;

/// Base name used for exported cells when the document has never been saved.
pub const UNTITLED_STEM: &str = "sprite";

/// Decode any PNG (palette, gray, 16-bit, ...) into 8-bit RGBA.
pub fn load_png(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|source| {
        log::warn!("load failed for {}: {source}", path.display());
        EditorError::Load { path: path.to_path_buf(), source }
    })?;
    let rgba = img.to_rgba8();
    log::info!("loaded {} ({}x{})", path.display(), rgba.width(), rgba.height());
    Ok(rgba)
}

/// Encode `image` as RGBA8 PNG. Alpha is written as-is.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    encode_png(image, path).map_err(|source| EditorError::Save { path: path.to_path_buf(), source })
}

fn encode_png(image: &RgbaImage, path: &Path) -> std::result::Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    writer.flush()?;
    Ok(())
}

/// `path` with a `.png` extension appended when it has none.
pub fn ensure_png_extension(path: &Path) -> PathBuf {
    let has_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if has_png {
        path.to_path_buf()
    } else {
        let mut s = path.as_os_str().to_owned();
        s.push(".png");
        PathBuf::from(s)
    }
}

/// File stem used to name exported cells.
pub fn export_stem(path: Option<&Path>) -> String {
    path.and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNTITLED_STEM)
        .to_string()
}

/// Write every grid cell to `dir` as `{stem}_{row}_{col}.png`, row-major.
/// Returns the written paths in that order.
pub fn export_cells(doc: &RasterDocument, grid: &GridLayout, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let (w, h) = doc.dimensions();
    let mut written = Vec::with_capacity((grid.cols() * grid.rows()) as usize);
    for cell in grid.cells() {
        let crop = doc.crop(grid.cell_rect(w, h, cell));
        let path = dir.join(format!("{stem}_{}_{}.png", cell.row, cell.col));
        save_png(&crop, &path)?;
        written.push(path);
    }
    log::info!("exported {} cells to {}", written.len(), dir.display());
    Ok(written)
}
