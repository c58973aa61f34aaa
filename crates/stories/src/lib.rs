//! Timed story presentation: auto-advance, manual skip and hold-to-pause.
//!
//! The viewer is a plain state machine driven by the host's clock. Hosts call
//! [`StoryViewer::poll`] whenever [`StoryViewer::next_deadline`] passes and
//! forward input through the transition methods; every transition reports a
//! [`StoryEvent`] so the host knows whether to redraw.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use siteconfig::{MediaKind, SiteConfig, StoryEntry, MAX_STORY_DURATION};
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoryError {
    #[error("story viewer requires at least one story")]
    Empty,
    #[error("story index {index} is out of range ({len} stories)")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    pub source: PathBuf,
    pub duration: Duration,
}

impl Story {
    pub fn from_entry(entry: &StoryEntry, base_dir: &Path) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            kind: entry.kind,
            source: entry.resolved_source(base_dir),
            duration: entry.duration,
        }
    }
}

/// Where the viewer currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Closed,
    Running {
        started_at: Instant,
        deadline: Instant,
        generation: u64,
    },
    Held {
        frozen_fraction: f32,
    },
}

/// Visual state of one progress bar segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentState {
    Completed,
    Active(f32),
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoryEvent {
    Opened { index: usize },
    Advanced { from: usize, to: usize },
    Rewound { from: usize, to: usize },
    Restarted { index: usize },
    Held { index: usize, fraction: f32 },
    Closed { index: usize },
    Ignored,
}

impl StoryEvent {
    pub fn changed(&self) -> bool {
        !matches!(self, StoryEvent::Ignored)
    }
}

pub struct StoryViewer {
    stories: Vec<Story>,
    index: usize,
    phase: Phase,
    generation: u64,
}

impl StoryViewer {
    pub fn new(stories: Vec<Story>) -> Result<Self, StoryError> {
        if stories.is_empty() {
            return Err(StoryError::Empty);
        }
        Ok(Self {
            stories,
            index: 0,
            phase: Phase::Closed,
            generation: 0,
        })
    }

    pub fn from_config(config: &SiteConfig, base_dir: &Path) -> Result<Self, StoryError> {
        let stories = config
            .stories
            .iter()
            .map(|entry| Story::from_entry(entry, base_dir))
            .collect();
        Self::new(stories)
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.phase, Phase::Closed)
    }

    pub fn is_held(&self) -> bool {
        matches!(self.phase, Phase::Held { .. })
    }

    /// Story on screen, `None` while closed.
    pub fn current(&self) -> Option<&Story> {
        if self.is_open() {
            self.stories.get(self.index)
        } else {
            None
        }
    }

    /// Identifies the active timer; bumps on every (re)start.
    pub fn timer_generation(&self) -> u64 {
        self.generation
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Running { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn open(&mut self, index: usize, now: Instant) -> Result<StoryEvent, StoryError> {
        if index >= self.stories.len() {
            return Err(StoryError::OutOfRange {
                index,
                len: self.stories.len(),
            });
        }
        self.index = index;
        self.start_timer(now);
        debug!(index, id = %self.stories[index].id, "story viewer opened");
        Ok(StoryEvent::Opened { index })
    }

    pub fn close(&mut self) -> StoryEvent {
        if !self.is_open() {
            return StoryEvent::Ignored;
        }
        self.phase = Phase::Closed;
        debug!(index = self.index, "story viewer closed");
        StoryEvent::Closed { index: self.index }
    }

    /// Fires the running timer if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> StoryEvent {
        match self.phase {
            Phase::Running { deadline, .. } if now >= deadline => self.next(now),
            _ => StoryEvent::Ignored,
        }
    }

    pub fn next(&mut self, now: Instant) -> StoryEvent {
        if !self.is_open() {
            return StoryEvent::Ignored;
        }
        if self.index + 1 >= self.stories.len() {
            return self.close();
        }
        let from = self.index;
        self.index += 1;
        self.start_timer(now);
        debug!(from, to = self.index, "story advanced");
        StoryEvent::Advanced {
            from,
            to: self.index,
        }
    }

    pub fn prev(&mut self, now: Instant) -> StoryEvent {
        if !self.is_open() || self.index == 0 {
            return StoryEvent::Ignored;
        }
        let from = self.index;
        self.index -= 1;
        self.start_timer(now);
        debug!(from, to = self.index, "story rewound");
        StoryEvent::Rewound {
            from,
            to: self.index,
        }
    }

    /// Tap on the presentation; `fraction_x` is the horizontal position in `[0, 1]`.
    pub fn tap(&mut self, fraction_x: f32, now: Instant) -> StoryEvent {
        if fraction_x < 0.5 {
            self.prev(now)
        } else {
            self.next(now)
        }
    }

    pub fn hold_start(&mut self, now: Instant) -> StoryEvent {
        match self.phase {
            Phase::Running { .. } => {
                let fraction = self.active_fraction(now);
                self.phase = Phase::Held {
                    frozen_fraction: fraction,
                };
                debug!(index = self.index, fraction, "story held");
                StoryEvent::Held {
                    index: self.index,
                    fraction,
                }
            }
            _ => StoryEvent::Ignored,
        }
    }

    /// Releases a hold. The current story restarts from zero rather than
    /// resuming from the frozen fraction.
    pub fn hold_end(&mut self, now: Instant) -> StoryEvent {
        if !self.is_held() {
            return StoryEvent::Ignored;
        }
        self.start_timer(now);
        debug!(index = self.index, "story released; segment restarted");
        StoryEvent::Restarted { index: self.index }
    }

    /// Progress bar state, one entry per story. Empty while closed.
    pub fn progress(&self, now: Instant) -> Vec<SegmentState> {
        if !self.is_open() {
            return Vec::new();
        }
        let active = self.active_fraction(now);
        (0..self.stories.len())
            .map(|i| match i.cmp(&self.index) {
                std::cmp::Ordering::Less => SegmentState::Completed,
                std::cmp::Ordering::Equal => SegmentState::Active(active),
                std::cmp::Ordering::Greater => SegmentState::Pending,
            })
            .collect()
    }

    fn active_fraction(&self, now: Instant) -> f32 {
        match self.phase {
            Phase::Closed => 0.0,
            Phase::Held { frozen_fraction } => frozen_fraction,
            Phase::Running { started_at, .. } => {
                let duration = self.active_duration();
                let elapsed = now.saturating_duration_since(started_at);
                (elapsed.as_secs_f32() / duration.as_secs_f32().max(f32::EPSILON)).clamp(0.0, 1.0)
            }
        }
    }

    /// Duration of the current story, capped at [`MAX_STORY_DURATION`].
    fn active_duration(&self) -> Duration {
        self.stories[self.index].duration.min(MAX_STORY_DURATION)
    }

    fn start_timer(&mut self, now: Instant) {
        self.generation = self.generation.wrapping_add(1);
        let deadline = now.checked_add(self.active_duration()).unwrap_or(now);
        self.phase = Phase::Running {
            started_at: now,
            deadline,
            generation: self.generation,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str, millis: u64) -> Story {
        Story {
            id: id.to_string(),
            title: format!("Story {id}"),
            kind: MediaKind::Image,
            source: PathBuf::from(format!("stories/{id}.jpg")),
            duration: Duration::from_millis(millis),
        }
    }

    fn three_stories() -> StoryViewer {
        StoryViewer::new(vec![story("1", 4000), story("2", 4000), story("3", 4000)]).unwrap()
    }

    #[test]
    fn rejects_empty_story_list() {
        assert_eq!(StoryViewer::new(Vec::new()).err(), Some(StoryError::Empty));
    }

    #[test]
    fn open_rejects_out_of_range_index() {
        let mut viewer = three_stories();
        let err = viewer.open(3, Instant::now()).unwrap_err();
        assert_eq!(err, StoryError::OutOfRange { index: 3, len: 3 });
        assert!(!viewer.is_open());
    }

    #[test]
    fn timer_expiry_advances_until_last_then_closes() {
        let mut viewer = three_stories();
        let start = Instant::now();
        viewer.open(0, start).unwrap();

        let mut now = start + Duration::from_millis(3999);
        assert_eq!(viewer.poll(now), StoryEvent::Ignored);

        now = start + Duration::from_millis(4000);
        assert_eq!(viewer.poll(now), StoryEvent::Advanced { from: 0, to: 1 });
        now += Duration::from_millis(4000);
        assert_eq!(viewer.poll(now), StoryEvent::Advanced { from: 1, to: 2 });
        now += Duration::from_millis(4000);
        assert_eq!(viewer.poll(now), StoryEvent::Closed { index: 2 });
        assert!(!viewer.is_open());
    }

    #[test]
    fn expiry_at_last_index_closes_and_second_expiry_is_noop() {
        let mut viewer = three_stories();
        let start = Instant::now();
        viewer.open(2, start).unwrap();

        let first = start + Duration::from_millis(4000);
        assert_eq!(viewer.poll(first), StoryEvent::Closed { index: 2 });
        assert!(!viewer.is_open());

        let second = first + Duration::from_millis(4000);
        assert_eq!(viewer.poll(second), StoryEvent::Ignored);
        assert!(!viewer.is_open());
        assert_eq!(viewer.current_index(), 2);
    }

    #[test]
    fn tap_left_on_first_story_is_noop_and_keeps_viewer_open() {
        let mut viewer = three_stories();
        let start = Instant::now();
        viewer.open(0, start).unwrap();
        let generation = viewer.timer_generation();

        let event = viewer.tap(0.2, start + Duration::from_millis(500));
        assert_eq!(event, StoryEvent::Ignored);
        assert!(viewer.is_open());
        assert_eq!(viewer.current_index(), 0);
        assert_eq!(viewer.timer_generation(), generation);
    }

    #[test]
    fn tap_right_moves_forward_and_restarts_timer() {
        let mut viewer = three_stories();
        let start = Instant::now();
        viewer.open(0, start).unwrap();

        let tapped = start + Duration::from_millis(1500);
        assert_eq!(viewer.tap(0.75, tapped), StoryEvent::Advanced { from: 0, to: 1 });
        assert_eq!(
            viewer.next_deadline(),
            Some(tapped + Duration::from_millis(4000))
        );
        assert_eq!(viewer.tap(0.1, tapped), StoryEvent::Rewound { from: 1, to: 0 });
    }

    #[test]
    fn forward_past_last_story_closes() {
        let mut viewer = three_stories();
        let now = Instant::now();
        viewer.open(2, now).unwrap();
        assert_eq!(viewer.next(now), StoryEvent::Closed { index: 2 });
        assert!(!viewer.is_open());
        assert!(viewer.current().is_none());
    }

    #[test]
    fn hold_freezes_progress_and_release_restarts_from_zero() {
        let mut viewer = three_stories();
        let start = Instant::now();
        viewer.open(1, start).unwrap();

        let pressed = start + Duration::from_millis(1000);
        assert_eq!(
            viewer.hold_start(pressed),
            StoryEvent::Held {
                index: 1,
                fraction: 0.25
            }
        );
        assert!(viewer.is_held());
        assert_eq!(viewer.next_deadline(), None);

        let much_later = pressed + Duration::from_secs(30);
        assert_eq!(viewer.poll(much_later), StoryEvent::Ignored);
        assert_eq!(viewer.progress(much_later)[1], SegmentState::Active(0.25));

        assert_eq!(viewer.hold_end(much_later), StoryEvent::Restarted { index: 1 });
        assert_eq!(viewer.progress(much_later)[1], SegmentState::Active(0.0));
        assert_eq!(
            viewer.next_deadline(),
            Some(much_later + Duration::from_millis(4000))
        );
        assert_eq!(viewer.current_index(), 1);
    }

    #[test]
    fn release_without_hold_is_ignored() {
        let mut viewer = three_stories();
        let now = Instant::now();
        viewer.open(0, now).unwrap();
        let generation = viewer.timer_generation();
        assert_eq!(viewer.hold_end(now), StoryEvent::Ignored);
        assert_eq!(viewer.timer_generation(), generation);
    }

    #[test]
    fn restarted_timer_never_double_fires() {
        let mut viewer = three_stories();
        let start = Instant::now();
        viewer.open(0, start).unwrap();

        let skipped = start + Duration::from_millis(3500);
        viewer.next(skipped);
        // The original deadline for story 0 passes; only story 1's timer is live.
        assert_eq!(
            viewer.poll(start + Duration::from_millis(4000)),
            StoryEvent::Ignored
        );
        assert_eq!(viewer.current_index(), 1);
        assert_eq!(
            viewer.poll(skipped + Duration::from_millis(4000)),
            StoryEvent::Advanced { from: 1, to: 2 }
        );
    }

    #[test]
    fn progress_segments_reflect_position() {
        let mut viewer = three_stories();
        let start = Instant::now();
        assert!(viewer.progress(start).is_empty());

        viewer.open(1, start).unwrap();
        let segments = viewer.progress(start + Duration::from_millis(2000));
        assert_eq!(
            segments,
            vec![
                SegmentState::Completed,
                SegmentState::Active(0.5),
                SegmentState::Pending
            ]
        );
    }

    #[test]
    fn oversized_duration_is_capped_instead_of_overflowing() {
        let mut viewer =
            StoryViewer::new(vec![story("1", 4000), story("2", u64::MAX)]).unwrap();
        let start = Instant::now();
        assert_eq!(
            viewer.open(1, start).unwrap(),
            StoryEvent::Opened { index: 1 }
        );
        assert_eq!(viewer.next_deadline(), Some(start + MAX_STORY_DURATION));
        viewer.hold_start(start);
        assert_eq!(
            viewer.hold_end(start),
            StoryEvent::Restarted { index: 1 }
        );
        assert_eq!(
            viewer.poll(start + MAX_STORY_DURATION),
            StoryEvent::Closed { index: 1 }
        );
    }

    #[test]
    fn builds_from_site_config() {
        let config = SiteConfig::bundled().unwrap();
        let viewer = StoryViewer::from_config(&config, Path::new("/srv/level")).unwrap();
        assert_eq!(viewer.len(), 3);
        assert_eq!(
            viewer.stories()[0].source,
            PathBuf::from("/srv/level/stories/1.jpg")
        );
        assert_eq!(viewer.stories()[0].duration, Duration::from_secs(4));
    }
}
