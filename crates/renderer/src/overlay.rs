//! Geometry of the story overlay drawn above the background.

use std::time::Instant;

use siteconfig::DisplayMode;
use stories::{SegmentState, StoryViewer};

use crate::types::ViewportSize;

/// Axis-aligned rectangle in device pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Largest rectangle with the image's aspect ratio centred in the viewport.
pub fn letterbox(image: (u32, u32), viewport: ViewportSize) -> Rect {
    let (image_w, image_h) = (image.0.max(1) as f32, image.1.max(1) as f32);
    let (view_w, view_h) = (viewport.width as f32, viewport.height as f32);
    let scale = (view_w / image_w).min(view_h / image_h);
    let width = image_w * scale;
    let height = image_h * scale;
    Rect::new((view_w - width) * 0.5, (view_h - height) * 0.5, width, height)
}

/// Progress bar placement in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBarLayout {
    pub top: f32,
    pub height: f32,
    pub gap: f32,
    pub side: f32,
}

impl ProgressBarLayout {
    pub fn for_mode(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Desktop => Self {
                top: 16.0,
                height: 3.0,
                gap: 6.0,
                side: 24.0,
            },
            DisplayMode::Mobile => Self {
                top: 10.0,
                height: 2.0,
                gap: 4.0,
                side: 12.0,
            },
        }
    }

    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            top: self.top * scale,
            height: self.height * scale,
            gap: self.gap * scale,
            side: self.side * scale,
        }
    }
}

/// What the overlay shows in one frame. Absent while the viewer is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub story_index: usize,
    pub segments: Vec<SegmentState>,
    pub bar: ProgressBarLayout,
}

impl OverlaySnapshot {
    pub fn capture(viewer: &StoryViewer, now: Instant, mode: DisplayMode) -> Option<Self> {
        if !viewer.is_open() {
            return None;
        }
        Some(Self {
            story_index: viewer.current_index(),
            segments: viewer.progress(now),
            bar: ProgressBarLayout::for_mode(mode),
        })
    }

    pub fn active_fraction(&self) -> f32 {
        self.segments
            .iter()
            .find_map(|segment| match segment {
                SegmentState::Active(fraction) => Some(*fraction),
                _ => None,
            })
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use siteconfig::MediaKind;
    use stories::Story;

    fn viewer() -> StoryViewer {
        let stories = (1..=3)
            .map(|i| Story {
                id: i.to_string(),
                title: format!("Фото {i}"),
                kind: MediaKind::Image,
                source: PathBuf::from(format!("stories/{i}.jpg")),
                duration: Duration::from_secs(4),
            })
            .collect();
        StoryViewer::new(stories).unwrap()
    }

    #[test]
    fn letterbox_fits_tall_image_in_wide_viewport() {
        let rect = letterbox((1080, 1920), ViewportSize::new(1920, 1080));
        assert!((rect.height - 1080.0).abs() < 1e-3);
        assert!((rect.width - 607.5).abs() < 1e-3);
        assert!((rect.x - 656.25).abs() < 1e-3);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn mobile_bar_is_tighter_than_desktop() {
        let desktop = ProgressBarLayout::for_mode(DisplayMode::Desktop);
        let mobile = ProgressBarLayout::for_mode(DisplayMode::Mobile);
        assert!(mobile.side < desktop.side);
        assert_eq!(mobile.scaled(2.0).top, 20.0);
    }

    #[test]
    fn snapshot_tracks_open_viewer() {
        let mut viewer = viewer();
        let start = Instant::now();
        assert!(OverlaySnapshot::capture(&viewer, start, DisplayMode::Desktop).is_none());

        viewer.open(1, start).unwrap();
        let snapshot = OverlaySnapshot::capture(
            &viewer,
            start + Duration::from_secs(1),
            DisplayMode::Desktop,
        )
        .unwrap();
        assert_eq!(snapshot.story_index, 1);
        assert_eq!(snapshot.segments.len(), 3);
        assert!((snapshot.active_fraction() - 0.25).abs() < 1e-6);
    }
}
