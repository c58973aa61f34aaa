//! Input bindings between the window and the story viewer.

use std::time::Instant;

use siteconfig::{DisplayMode, WidthObserver};
use stories::{Story, StoryError, StoryEvent, StoryViewer};
use tracing::{debug, info, warn};
use winit::keyboard::{Key, NamedKey};

use crate::overlay::OverlaySnapshot;

/// What a key press means to the story layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryAction {
    /// Digit keys `1..9` select a story chip.
    Open(usize),
    Prev,
    Next,
    Close,
}

impl StoryAction {
    pub fn for_key(key: &Key) -> Option<Self> {
        match key {
            Key::Named(NamedKey::ArrowLeft) => Some(StoryAction::Prev),
            Key::Named(NamedKey::ArrowRight) => Some(StoryAction::Next),
            Key::Named(NamedKey::Escape) => Some(StoryAction::Close),
            Key::Character(value) => {
                let mut chars = value.chars();
                let digit = chars.next()?.to_digit(10)?;
                if chars.next().is_some() || digit == 0 {
                    return None;
                }
                Some(StoryAction::Open(digit as usize - 1))
            }
            _ => None,
        }
    }
}

/// Story layer state for one window: the viewer plus the display mode that
/// shapes its progress bar.
pub struct StoryHost {
    viewer: Option<StoryViewer>,
    widths: WidthObserver,
    pressed: bool,
}

impl StoryHost {
    /// An empty story list leaves the layer inert.
    pub fn new(stories: Vec<Story>) -> Self {
        let viewer = match StoryViewer::new(stories) {
            Ok(viewer) => Some(viewer),
            Err(StoryError::Empty) => None,
            Err(err) => {
                warn!(error = %err, "story viewer disabled");
                None
            }
        };
        Self {
            viewer,
            widths: WidthObserver::new(),
            pressed: false,
        }
    }

    pub fn viewer(&self) -> Option<&StoryViewer> {
        self.viewer.as_ref()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.widths.mode()
    }

    /// Feeds a logical window width; returns the new mode when it changes.
    pub fn observe_width(&mut self, logical_width: f64) -> Option<DisplayMode> {
        let changed = self.widths.observe(logical_width);
        if let Some(mode) = changed {
            debug!(?mode, logical_width, "display mode changed");
        }
        changed
    }

    pub fn open(&mut self, index: usize, now: Instant) -> Result<StoryEvent, StoryError> {
        let viewer = self.viewer.as_mut().ok_or(StoryError::Empty)?;
        let event = viewer.open(index, now)?;
        info!(index, "story opened");
        Ok(event)
    }

    pub fn key(&mut self, key: &Key, now: Instant) -> StoryEvent {
        let Some(action) = StoryAction::for_key(key) else {
            return StoryEvent::Ignored;
        };
        let Some(viewer) = self.viewer.as_mut() else {
            return StoryEvent::Ignored;
        };
        let event = match action {
            StoryAction::Open(index) => match viewer.open(index, now) {
                Ok(event) => event,
                Err(err) => {
                    debug!(error = %err, "story key ignored");
                    StoryEvent::Ignored
                }
            },
            StoryAction::Prev => viewer.prev(now),
            StoryAction::Next => viewer.next(now),
            StoryAction::Close => viewer.close(),
        };
        // A key transition ends any hold; the pending release must not tap.
        if event.changed() {
            self.pressed = false;
        }
        event
    }

    /// Pointer press or touch start: pauses the running story.
    pub fn press(&mut self, now: Instant) -> StoryEvent {
        self.pressed = true;
        self.viewer
            .as_mut()
            .map_or(StoryEvent::Ignored, |viewer| viewer.hold_start(now))
    }

    /// Pointer release: ends the hold, then treats the release as a tap.
    pub fn release(&mut self, fraction_x: f32, now: Instant) -> StoryEvent {
        if !std::mem::take(&mut self.pressed) {
            return StoryEvent::Ignored;
        }
        let Some(viewer) = self.viewer.as_mut() else {
            return StoryEvent::Ignored;
        };
        let released = viewer.hold_end(now);
        let tapped = viewer.tap(fraction_x, now);
        if tapped.changed() {
            tapped
        } else {
            released
        }
    }

    /// Touch cancelled: ends the hold without a tap.
    pub fn cancel(&mut self, now: Instant) -> StoryEvent {
        self.pressed = false;
        self.viewer
            .as_mut()
            .map_or(StoryEvent::Ignored, |viewer| viewer.hold_end(now))
    }

    pub fn poll(&mut self, now: Instant) -> StoryEvent {
        self.viewer
            .as_mut()
            .map_or(StoryEvent::Ignored, |viewer| viewer.poll(now))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.viewer.as_ref().and_then(StoryViewer::next_deadline)
    }

    pub fn is_open(&self) -> bool {
        self.viewer.as_ref().is_some_and(StoryViewer::is_open)
    }

    pub fn overlay(&self, now: Instant) -> Option<OverlaySnapshot> {
        let viewer = self.viewer.as_ref()?;
        OverlaySnapshot::capture(viewer, now, self.widths.mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use siteconfig::MediaKind;

    fn host() -> StoryHost {
        let stories = (1..=3)
            .map(|i| Story {
                id: i.to_string(),
                title: format!("Фото {i}"),
                kind: MediaKind::Image,
                source: PathBuf::from(format!("stories/{i}.jpg")),
                duration: Duration::from_secs(4),
            })
            .collect();
        StoryHost::new(stories)
    }

    #[test]
    fn maps_keys_to_actions() {
        assert_eq!(
            StoryAction::for_key(&Key::Character("1".into())),
            Some(StoryAction::Open(0))
        );
        assert_eq!(
            StoryAction::for_key(&Key::Character("9".into())),
            Some(StoryAction::Open(8))
        );
        assert_eq!(StoryAction::for_key(&Key::Character("0".into())), None);
        assert_eq!(StoryAction::for_key(&Key::Character("12".into())), None);
        assert_eq!(StoryAction::for_key(&Key::Character("a".into())), None);
        assert_eq!(
            StoryAction::for_key(&Key::Named(NamedKey::ArrowLeft)),
            Some(StoryAction::Prev)
        );
        assert_eq!(
            StoryAction::for_key(&Key::Named(NamedKey::Escape)),
            Some(StoryAction::Close)
        );
    }

    #[test]
    fn digit_opens_and_escape_closes() {
        let mut host = host();
        let now = Instant::now();
        assert_eq!(
            host.key(&Key::Character("2".into()), now),
            StoryEvent::Opened { index: 1 }
        );
        assert!(host.is_open());
        assert_eq!(
            host.key(&Key::Named(NamedKey::Escape), now),
            StoryEvent::Closed { index: 1 }
        );
        assert!(!host.is_open());
        assert_eq!(host.key(&Key::Character("7".into()), now), StoryEvent::Ignored);
    }

    #[test]
    fn release_on_left_half_at_first_story_keeps_viewer_open() {
        let mut host = host();
        let start = Instant::now();
        host.open(0, start).unwrap();
        host.press(start + Duration::from_millis(500));
        let event = host.release(0.2, start + Duration::from_millis(900));
        assert_eq!(event, StoryEvent::Restarted { index: 0 });
        assert!(host.is_open());
        assert_eq!(host.viewer().unwrap().current_index(), 0);
    }

    #[test]
    fn release_on_right_half_advances() {
        let mut host = host();
        let start = Instant::now();
        host.open(0, start).unwrap();
        host.press(start);
        assert_eq!(
            host.release(0.8, start + Duration::from_millis(100)),
            StoryEvent::Advanced { from: 0, to: 1 }
        );
        assert_eq!(host.release(0.8, start), StoryEvent::Ignored);
    }

    #[test]
    fn key_during_hold_cancels_pending_tap() {
        let mut host = host();
        let start = Instant::now();
        host.open(0, start).unwrap();
        host.press(start + Duration::from_millis(200));
        assert_eq!(
            host.key(&Key::Named(NamedKey::ArrowRight), start + Duration::from_millis(300)),
            StoryEvent::Advanced { from: 0, to: 1 }
        );
        assert_eq!(host.release(0.8, start + Duration::from_millis(400)), StoryEvent::Ignored);
        assert_eq!(host.viewer().unwrap().current_index(), 1);
        assert!(!host.viewer().unwrap().is_held());
    }

    #[test]
    fn empty_story_list_is_inert() {
        let mut host = StoryHost::new(Vec::new());
        let now = Instant::now();
        assert!(host.viewer().is_none());
        assert_eq!(host.open(0, now), Err(StoryError::Empty));
        assert_eq!(host.press(now), StoryEvent::Ignored);
        assert!(host.overlay(now).is_none());
    }

    #[test]
    fn overlay_follows_display_mode() {
        let mut host = host();
        let now = Instant::now();
        host.open(0, now).unwrap();
        assert_eq!(host.observe_width(1280.0), Some(DisplayMode::Desktop));
        let desktop = host.overlay(now).unwrap().bar;
        assert_eq!(host.observe_width(390.0), Some(DisplayMode::Mobile));
        let mobile = host.overlay(now).unwrap().bar;
        assert!(mobile.side < desktop.side);
    }

    #[test]
    fn poll_expires_through_host() {
        let mut host = host();
        let start = Instant::now();
        host.open(2, start).unwrap();
        assert_eq!(host.next_deadline(), Some(start + Duration::from_secs(4)));
        assert_eq!(
            host.poll(start + Duration::from_secs(4)),
            StoryEvent::Closed { index: 2 }
        );
        assert_eq!(host.next_deadline(), None);
    }
}
