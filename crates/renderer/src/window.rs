use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use stories::StoryEvent;
use tracing::{error, info, warn};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::background::BackgroundRenderer;
use crate::gpu::GpuState;
use crate::host::StoryHost;
use crate::types::{
    effective_pixel_ratio, ChromeParams, LogicalViewport, RendererConfig, ViewportSize,
};

/// Messages the owning thread sends into the event loop.
#[derive(Debug, Clone)]
pub enum WindowCommand {
    /// Replace the background parameters in place.
    UpdateParams(ChromeParams),
    OpenStory(usize),
    Shutdown,
}

/// Notifications the event loop sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSignal {
    StoryClosed { index: usize },
    /// The user closed the window; the loop has exited.
    WindowClosed,
}

/// Everything one window owns: the background layer and the story layer above it.
struct WindowState {
    window: Arc<Window>,
    background: Option<BackgroundRenderer<GpuState>>,
    stories: StoryHost,
    cursor: Option<PhysicalPosition<f64>>,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Self {
        let scale_factor = window.scale_factor();
        let logical = logical_viewport(&window);
        let size = ViewportSize::from_logical(logical, scale_factor);

        let background = match GpuState::new(
            window.clone(),
            size,
            config.antialiasing,
            config.color_space,
            config.stories.clone(),
        ) {
            Ok(mut gpu) => {
                gpu.set_pixel_scale(effective_pixel_ratio(scale_factor) as f32);
                Some(
                    BackgroundRenderer::mount(config.params, logical, scale_factor, gpu)
                        .with_target_fps(config.target_fps),
                )
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "graphics unavailable; running without background");
                None
            }
        };

        let mut stories = StoryHost::new(config.stories.clone());
        stories.observe_width(logical.width);
        if let Some(index) = config.open_story {
            if let Err(err) = stories.open(index, Instant::now()) {
                warn!(index, error = %err, "cannot open requested story");
            }
        }

        Self {
            window,
            background,
            stories,
            cursor: None,
        }
    }

    fn id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    fn logical(&self) -> LogicalViewport {
        logical_viewport(&self.window)
    }

    fn handle_resize(&mut self) {
        let logical = self.logical();
        let scale_factor = self.window.scale_factor();
        self.stories.observe_width(logical.width);
        if let Some(background) = self.background.as_mut() {
            background.request_resize(logical, scale_factor);
            if let Some(gpu) = background.sink_mut() {
                gpu.set_pixel_scale(effective_pixel_ratio(scale_factor) as f32);
            }
        }
        self.window.request_redraw();
    }

    fn handle_pointer(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
        let logical = position.to_logical::<f64>(self.window.scale_factor());
        if let Some(background) = self.background.as_mut() {
            background.pointer_moved(logical.x, logical.y);
        }
    }

    fn tap_fraction(&self) -> f32 {
        let width = self.logical().width;
        match self.cursor {
            Some(position) if width > 0.0 => {
                let logical = position.to_logical::<f64>(self.window.scale_factor());
                (logical.x / width) as f32
            }
            _ => 0.5,
        }
    }

    fn redraw(&mut self, now: Instant) {
        let overlay = self.stories.overlay(now);
        if let Some(background) = self.background.as_mut() {
            background.set_overlay(overlay);
            background.tick(now);
        }
    }

    /// Redraw or sleep until the earliest of the frame cap and the story timer.
    fn schedule(&mut self, now: Instant) -> ControlFlow {
        let mut deadline = self.stories.next_deadline();
        if let Some(background) = self.background.as_ref() {
            if background.wants_frame(now) {
                self.window.request_redraw();
                return ControlFlow::Wait;
            }
            deadline = earliest(deadline, background.frame_loop().next_deadline());
        }
        match deadline {
            Some(deadline) => ControlFlow::WaitUntil(deadline),
            None => ControlFlow::Wait,
        }
    }

    fn unmount(&mut self) {
        if let Some(mut background) = self.background.take() {
            background.unmount();
        }
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn logical_viewport(window: &Window) -> LogicalViewport {
    let logical: LogicalSize<f64> = window.inner_size().to_logical(window.scale_factor());
    LogicalViewport::new(logical.width, logical.height)
}

fn report(event: StoryEvent, signal_tx: &Sender<WindowSignal>, window: &Window) {
    if let StoryEvent::Closed { index } = event {
        info!(index, "story viewer closed");
        let _ = signal_tx.send(WindowSignal::StoryClosed { index });
    }
    if event.changed() {
        window.request_redraw();
    }
}

/// Handle to a window event loop running on its own thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    signals: Receiver<WindowSignal>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    pub fn spawn(config: RendererConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (signal_tx, signal_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("levelsite-window".into())
            .spawn(move || run_event_loop(config, Some(ready_tx), signal_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            signals: signal_rx,
            join_handle: Some(handle),
        })
    }

    pub fn update_params(&self, params: ChromeParams) -> Result<()> {
        self.send(WindowCommand::UpdateParams(params))
    }

    pub fn open_story(&self, index: usize) -> Result<()> {
        self.send(WindowCommand::OpenStory(index))
    }

    fn send(&self, command: WindowCommand) -> Result<()> {
        self.proxy
            .send_event(command)
            .map_err(|_| anyhow!("window event loop has exited"))
    }

    /// Signals received since the last call, without blocking.
    pub fn drain_signals(&self) -> Vec<WindowSignal> {
        self.signals.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Runs the window on the calling thread until it is closed.
pub(crate) fn run_blocking(config: RendererConfig) -> Result<()> {
    let (signal_tx, _signal_rx) = unbounded();
    run_event_loop(config, None, signal_tx)
}

type ReadySender = Sender<Result<EventLoopProxy<WindowCommand>>>;

fn run_event_loop(
    config: RendererConfig,
    ready_tx: Option<ReadySender>,
    signal_tx: Sender<WindowSignal>,
) -> Result<()> {
    let fail = |message: String, ready_tx: &Option<ReadySender>| {
        if let Some(tx) = ready_tx {
            let _ = tx.send(Err(anyhow!(message.clone())));
        }
        anyhow!(message)
    };

    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    if ready_tx.is_some() {
        #[cfg(target_os = "linux")]
        {
            use winit::platform::wayland::EventLoopBuilderExtWayland;
            EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
        }
    }
    let event_loop = builder
        .build()
        .map_err(|err| fail(format!("failed to create event loop: {err}"), &ready_tx))?;
    let proxy = event_loop.create_proxy();

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .map_err(|err| fail(format!("failed to create window: {err}"), &ready_tx))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config);
    info!(
        stories = config.stories.len(),
        background = state.background.is_some(),
        "window ready"
    );
    state.window.request_redraw();

    if let Some(tx) = ready_tx {
        let _ = tx.send(Ok(proxy));
    }

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(command) => match command {
            WindowCommand::UpdateParams(params) => {
                if let Some(background) = state.background.as_mut() {
                    background.update_params(params);
                }
                state.window.request_redraw();
            }
            WindowCommand::OpenStory(index) => match state.stories.open(index, Instant::now()) {
                Ok(event) => report(event, &signal_tx, &state.window),
                Err(err) => warn!(index, error = %err, "cannot open story"),
            },
            WindowCommand::Shutdown => elwt.exit(),
        },
        Event::WindowEvent { window_id, event } if window_id == state.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                let _ = signal_tx.send(WindowSignal::WindowClosed);
                elwt.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                state.handle_resize();
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.handle_pointer(position);
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                let now = Instant::now();
                let event = match button_state {
                    ElementState::Pressed => state.stories.press(now),
                    ElementState::Released => {
                        let fraction = state.tap_fraction();
                        state.stories.release(fraction, now)
                    }
                };
                report(event, &signal_tx, &state.window);
            }
            WindowEvent::Touch(touch) => {
                state.handle_pointer(touch.location);
                let now = Instant::now();
                let event = match touch.phase {
                    TouchPhase::Started => state.stories.press(now),
                    TouchPhase::Ended => {
                        let fraction = state.tap_fraction();
                        state.stories.release(fraction, now)
                    }
                    TouchPhase::Cancelled => state.stories.cancel(now),
                    TouchPhase::Moved => StoryEvent::Ignored,
                };
                report(event, &signal_tx, &state.window);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    let story_event = state.stories.key(&event.logical_key, Instant::now());
                    report(story_event, &signal_tx, &state.window);
                }
            }
            WindowEvent::RedrawRequested => state.redraw(Instant::now()),
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            let story_event = state.stories.poll(now);
            report(story_event, &signal_tx, &state.window);
            elwt.set_control_flow(state.schedule(now));
        }
        Event::LoopExiting => state.unmount(),
        _ => {}
    });

    run_result.map_err(|err| {
        error!(error = %err, "window event loop error");
        anyhow!("window event loop error: {err}")
    })
}
