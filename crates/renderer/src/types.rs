use stories::Story;

/// Linear colour channels in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Surfaces are never rendered denser than this many device pixels per logical pixel.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Visual tuning for the liquid chrome background.
///
/// The whole struct is replaced when the host changes any value; the
/// renderer copies it into the uniform block on the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromeParams {
    pub base_color: Rgb,
    pub highlight_color: Rgb,
    /// Simulated seconds per real second.
    pub speed: f32,
    pub amplitude: f32,
    pub frequency_x: f32,
    pub frequency_y: f32,
    /// When false the pointer never feeds the distortion field.
    pub interactive: bool,
}

impl Default for ChromeParams {
    fn default() -> Self {
        Self {
            base_color: [0.03, 0.03, 0.035],
            highlight_color: [1.0, 1.0, 1.0],
            speed: 0.22,
            amplitude: 0.16,
            frequency_x: 3.2,
            frequency_y: 3.6,
            interactive: true,
        }
    }
}

/// Clamps the device pixel ratio to `(0, MAX_PIXEL_RATIO]`, treating junk as 1.
pub fn effective_pixel_ratio(scale_factor: f64) -> f64 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

/// Drawing surface dimensions in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Device-pixel size for a logical viewport at the capped pixel ratio.
    pub fn from_logical(logical: LogicalViewport, scale_factor: f64) -> Self {
        let ratio = effective_pixel_ratio(scale_factor);
        Self::new(
            (logical.width * ratio).round() as u32,
            (logical.height * ratio).round() as u32,
        )
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Window size in logical (CSS-like) pixels; pointer events are normalised against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalViewport {
    pub width: f64,
    pub height: f64,
}

impl LogicalViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pointer location normalised to `[0, 1]²` with the origin in the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Maps client coordinates (top-left origin) onto the field's space.
    ///
    /// Positions outside the window, reported while a button is held, are
    /// clamped to the nearest edge.
    pub fn from_client(client_x: f64, client_y: f64, viewport: LogicalViewport) -> Self {
        let x = (client_x / viewport.width) as f32;
        let y = (1.0 - client_y / viewport.height) as f32;
        Self {
            x: unit(x),
            y: unit(y),
        }
    }
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Match browser canvas behaviour (gamma-encoded swapchain).
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains for conversion.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Clone)]
pub struct RendererConfig {
    /// Window title.
    pub title: String,
    /// Initial window size in logical pixels.
    pub window_size: (u32, u32),
    /// Background tuning at mount time.
    pub params: ChromeParams,
    /// Optional frames-per-second cap; `None` follows the display refresh.
    pub target_fps: Option<f32>,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for swapchain/textures.
    pub color_space: ColorSpaceMode,
    /// Stories presented by the overlay; empty disables the viewer.
    pub stories: Vec<Story>,
    /// Story to open as soon as the window appears.
    pub open_story: Option<usize>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "LEVEL".to_string(),
            window_size: (1280, 720),
            params: ChromeParams::default(),
            target_fps: None,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            stories: Vec::new(),
            open_story: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped_at_two() {
        assert_eq!(effective_pixel_ratio(1.0), 1.0);
        assert_eq!(effective_pixel_ratio(1.5), 1.5);
        assert_eq!(effective_pixel_ratio(3.0), 2.0);
        assert_eq!(effective_pixel_ratio(0.0), 1.0);
        assert_eq!(effective_pixel_ratio(f64::NAN), 1.0);
    }

    #[test]
    fn viewport_scales_logical_size() {
        let logical = LogicalViewport::new(800.0, 600.0);
        assert_eq!(
            ViewportSize::from_logical(logical, 1.25),
            ViewportSize::new(1000, 750)
        );
        assert_eq!(
            ViewportSize::from_logical(logical, 3.0),
            ViewportSize::new(1600, 1200)
        );
    }

    #[test]
    fn pointer_maps_client_coordinates() {
        let viewport = LogicalViewport::new(800.0, 400.0);
        let pointer = PointerPosition::from_client(200.0, 100.0, viewport);
        assert_eq!(pointer, PointerPosition::new(0.25, 0.75));
    }

    #[test]
    fn pointer_outside_window_is_clamped() {
        let viewport = LogicalViewport::new(800.0, 600.0);
        assert_eq!(
            PointerPosition::from_client(-10.0, 900.0, viewport),
            PointerPosition::new(0.0, 0.0)
        );
        assert_eq!(
            PointerPosition::from_client(1200.0, -50.0, viewport),
            PointerPosition::new(1.0, 1.0)
        );
    }

    #[test]
    fn pointer_guards_degenerate_viewport() {
        let viewport = LogicalViewport::new(0.0, 0.0);
        let pointer = PointerPosition::from_client(0.0, 0.0, viewport);
        assert_eq!(pointer, PointerPosition::default());
    }
}
