//! Lifecycle of the animated background layer.
//!
//! [`BackgroundRenderer`] owns the simulated clock, viewport, pointer and
//! tuning parameters for one window. Drawing is delegated to a [`FrameSink`]
//! (the GPU surface in production, a recorder in tests) so everything the
//! host can observe is testable without a device.

use std::fmt;
use std::time::Instant;

use crate::overlay::OverlaySnapshot;
use crate::runtime::FrameLoop;
use crate::types::{ChromeParams, LogicalViewport, PointerPosition, ViewportSize};

/// Runtime state of the background, exclusively owned by its renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundState {
    /// Simulated seconds; scaled by `params.speed`.
    pub elapsed: f64,
    pub viewport: ViewportSize,
    pub pointer: PointerPosition,
    pub params: ChromeParams,
}

impl BackgroundState {
    pub fn new(params: ChromeParams, viewport: ViewportSize) -> Self {
        Self {
            elapsed: 0.0,
            viewport,
            pointer: PointerPosition::default(),
            params,
        }
    }

    /// Advances the simulated clock by a wall-clock delta in milliseconds.
    pub fn advance(&mut self, frame_delta_ms: f64) {
        if !frame_delta_ms.is_finite() || frame_delta_ms <= 0.0 {
            return;
        }
        self.elapsed += frame_delta_ms * 0.001 * f64::from(self.params.speed);
    }

    pub fn inputs(&self) -> FrameInputs {
        FrameInputs {
            time: self.elapsed as f32,
            viewport: self.viewport,
            pointer: self.pointer,
            params: self.params,
        }
    }
}

/// Snapshot handed to the sink for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub time: f32,
    pub viewport: ViewportSize,
    pub pointer: PointerPosition,
    pub params: ChromeParams,
}

/// Everything drawn in one frame, bottom layer first.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub inputs: FrameInputs,
    pub overlay: Option<&'a OverlaySnapshot>,
}

/// Per-frame presentation failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The surface must be reconfigured before the next frame.
    Lost,
    /// The frame could not be acquired in time; try again next tick.
    Timeout,
    /// The device ran out of memory; the loop stops.
    OutOfMemory,
    Other(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Lost => write!(f, "surface lost or outdated"),
            FrameError::Timeout => write!(f, "timed out acquiring the next frame"),
            FrameError::OutOfMemory => write!(f, "graphics device is out of memory"),
            FrameError::Other(message) => write!(f, "frame failed: {message}"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Destination for background frames.
pub trait FrameSink {
    /// Reconfigures the drawing surface to `size` device pixels.
    fn resize(&mut self, size: ViewportSize);
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), FrameError>;
    /// Releases surface resources. Called exactly once, from `unmount`.
    fn teardown(&mut self) -> anyhow::Result<()>;
}

/// Result of a single [`BackgroundRenderer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Presented,
    /// The frame was dropped; the loop keeps running.
    Skipped,
    /// The loop is not running (unmounted, stopped, or waiting on the FPS cap).
    Idle,
}

pub struct BackgroundRenderer<S: FrameSink> {
    state: BackgroundState,
    logical: LogicalViewport,
    scale_factor: f64,
    pending_resize: Option<(LogicalViewport, f64)>,
    overlay: Option<OverlaySnapshot>,
    frame_loop: FrameLoop,
    last_tick: Option<Instant>,
    sink: Option<S>,
}

impl<S: FrameSink> BackgroundRenderer<S> {
    /// Sizes the sink for the viewport and starts the redraw loop.
    pub fn mount(
        params: ChromeParams,
        logical: LogicalViewport,
        scale_factor: f64,
        mut sink: S,
    ) -> Self {
        let viewport = ViewportSize::from_logical(logical, scale_factor);
        sink.resize(viewport);
        let mut frame_loop = FrameLoop::new(None);
        frame_loop.start();
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            scale_factor,
            "background mounted"
        );
        Self {
            state: BackgroundState::new(params, viewport),
            logical,
            scale_factor,
            pending_resize: None,
            overlay: None,
            frame_loop,
            last_tick: None,
            sink: Some(sink),
        }
    }

    pub fn with_target_fps(mut self, target_fps: Option<f32>) -> Self {
        self.frame_loop.set_target_fps(target_fps);
        self
    }

    pub fn state(&self) -> &BackgroundState {
        &self.state
    }

    pub fn params(&self) -> ChromeParams {
        self.state.params
    }

    pub fn logical_viewport(&self) -> LogicalViewport {
        self.logical
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    /// Whether the host should request a redraw at `now`.
    pub fn wants_frame(&self, now: Instant) -> bool {
        self.sink.is_some() && self.frame_loop.ready_for_frame(now)
    }

    /// Layer drawn on top of the background in subsequent frames.
    pub fn set_overlay(&mut self, overlay: Option<OverlaySnapshot>) {
        self.overlay = overlay;
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.frame_loop.ready_for_frame(now) {
            return TickOutcome::Idle;
        }
        let Some(sink) = self.sink.as_mut() else {
            return TickOutcome::Idle;
        };

        if let Some((logical, scale_factor)) = self.pending_resize.take() {
            let viewport = ViewportSize::from_logical(logical, scale_factor);
            self.logical = logical;
            self.scale_factor = scale_factor;
            if viewport != self.state.viewport {
                tracing::debug!(
                    width = viewport.width,
                    height = viewport.height,
                    "background surface resized"
                );
                self.state.viewport = viewport;
                sink.resize(viewport);
            }
        }

        let delta_ms = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.state.advance(delta_ms);
        self.frame_loop.mark_rendered(now);

        let frame = Frame {
            inputs: self.state.inputs(),
            overlay: self.overlay.as_ref(),
        };
        match sink.present(&frame) {
            Ok(()) => TickOutcome::Presented,
            Err(FrameError::Lost) => {
                tracing::debug!("surface lost; reconfiguring");
                sink.resize(self.state.viewport);
                TickOutcome::Skipped
            }
            Err(FrameError::OutOfMemory) => {
                tracing::error!("graphics device out of memory; stopping background");
                self.frame_loop.stop();
                TickOutcome::Skipped
            }
            Err(err) => {
                tracing::warn!(error = %err, "background frame skipped");
                TickOutcome::Skipped
            }
        }
    }

    /// Records a viewport change; applied at the start of the next tick.
    pub fn request_resize(&mut self, logical: LogicalViewport, scale_factor: f64) {
        self.pending_resize = Some((logical, scale_factor));
    }

    pub fn pointer_moved(&mut self, client_x: f64, client_y: f64) {
        if !self.state.params.interactive {
            return;
        }
        let logical = self
            .pending_resize
            .map(|(logical, _)| logical)
            .unwrap_or(self.logical);
        self.state.pointer = PointerPosition::from_client(client_x, client_y, logical);
    }

    /// Swaps tuning parameters without restarting the loop.
    pub fn update_params(&mut self, params: ChromeParams) {
        if params != self.state.params {
            tracing::debug!(?params, "background parameters updated");
        }
        self.state.params = params;
    }

    /// Stops the loop and tears the sink down. No frame is presented afterwards.
    pub fn unmount(&mut self) {
        self.frame_loop.stop();
        self.overlay = None;
        if let Some(mut sink) = self.sink.take() {
            if let Err(err) = sink.teardown() {
                tracing::warn!(error = %err, "background teardown failed");
            }
            tracing::debug!(frames = self.frame_loop.frames(), "background unmounted");
        }
    }
}

impl<S: FrameSink> Drop for BackgroundRenderer<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}
