//! Window renderer for the LEVEL studio site.
//!
//! The crate draws the animated "liquid chrome" background and the story
//! overlay above it. The overall flow is:
//!
//! ```text
//!   CLI / levelsite
//!          │ RendererConfig
//!          ▼
//!   Renderer::run / WindowRuntime::spawn ──▶ winit event loop
//!                                              │
//!            ┌─────────────────────────────────┤
//!            ▼                                 ▼
//!   BackgroundRenderer<GpuState>          StoryHost (StoryViewer)
//!     elapsed · viewport · pointer          open · hold · tap · expiry
//!            │                                 │ OverlaySnapshot
//!            └──────────▶ FrameSink::present ◀─┘
//!                          chrome pass, then overlay pass
//! ```
//!
//! [`BackgroundRenderer`] holds everything observable about the background
//! and hands a [`Frame`] to a [`FrameSink`] each tick. The GPU sink lives in
//! the private `gpu` module; tests drive the same lifecycle with a recording
//! sink. [`field`] evaluates the same procedural field on the CPU for still
//! exports.

mod background;
mod compile;
pub mod field;
mod gpu;
mod host;
mod overlay;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use background::{
    BackgroundRenderer, BackgroundState, Frame, FrameError, FrameInputs, FrameSink, TickOutcome,
};
pub use host::{StoryAction, StoryHost};
pub use overlay::{letterbox, OverlaySnapshot, ProgressBarLayout, Rect};
pub use runtime::{FrameLoop, FrameStats};
pub use types::{
    effective_pixel_ratio, Antialiasing, ChromeParams, ColorSpaceMode, LogicalViewport,
    PointerPosition, RendererConfig, Rgb, ViewportSize, MAX_PIXEL_RATIO,
};
pub use window::{WindowCommand, WindowRuntime, WindowSignal};

/// Entry point that opens the site window on the calling thread.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Blocks until the window is closed.
    pub fn run(&mut self) -> Result<()> {
        window::run_blocking(self.config.clone())
    }
}
