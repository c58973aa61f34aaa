use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{ImageFormat, RgbaImage};
use renderer::field::render_rgba;
use renderer::{BackgroundState, ChromeParams, PointerPosition, ViewportSize};
use tracing::info;

/// Simulates `seconds` of wall-clock animation and renders the resulting frame.
pub fn render_frame(
    params: ChromeParams,
    size: (u32, u32),
    seconds: f64,
    pointer: Option<(f32, f32)>,
) -> RgbaImage {
    let mut state = BackgroundState::new(params, ViewportSize::new(size.0, size.1));
    state.advance(seconds * 1000.0);
    if let Some((x, y)) = pointer.filter(|_| params.interactive) {
        state.pointer = PointerPosition::new(x, y);
    }
    render_rgba(&state.inputs())
}

pub fn export_png(image: &RgbaImage, out: &Path) -> Result<()> {
    let is_png = out
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if !is_png {
        bail!("snapshot path {} must end in .png", out.display());
    }

    if let Some(parent) = out.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    image
        .save_with_format(out, ImageFormat::Png)
        .with_context(|| format!("failed to write snapshot to {}", out.display()))?;
    info!(
        path = %out.display(),
        width = image.width(),
        height = image.height(),
        "snapshot written"
    );
    Ok(())
}
