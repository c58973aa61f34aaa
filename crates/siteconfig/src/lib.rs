use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

mod nav;

pub use nav::{DisplayMode, Route, WidthObserver, MOBILE_BREAKPOINT};

/// Longest story duration the viewer accepts.
pub const MAX_STORY_DURATION: Duration = Duration::from_secs(60 * 60);

/// Site content shipped with the binary and used when no file is supplied.
pub const BUNDLED_SITE: &str = include_str!("../defaults/site.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub version: u32,
    #[serde(default)]
    pub background: BackgroundSettings,
    #[serde(default)]
    pub studio: StudioInfo,
    #[serde(default)]
    pub nav: Vec<NavEntry>,
    #[serde(default)]
    pub stories: Vec<StoryEntry>,
    #[serde(default)]
    pub pricing: Vec<PricingTier>,
    #[serde(default)]
    pub coaches: Vec<Coach>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub trainings: Vec<Training>,
}

/// Tuning knobs for the animated background.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub base_color: [f32; 3],
    pub highlight_color: [f32; 3],
    pub speed: f32,
    pub amplitude: f32,
    pub frequency_x: f32,
    pub frequency_y: f32,
    pub interactive: bool,
}

impl Default for BackgroundSettings {
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

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StudioInfo {
    pub name: String,
    pub city: String,
    pub headline: String,
    pub tagline: String,
    pub address: String,
    pub phone: String,
    pub hours: Vec<OpeningHours>,
    pub links: Vec<ExternalLink>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpeningHours {
    pub label: String,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NavEntry {
    pub label: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoryEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub kind: MediaKind,
    pub source: PathBuf,
    #[serde(
        default = "default_story_duration",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub duration: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingTier {
    pub id: u32,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_glow_intensity")]
    pub glow_intensity: f32,
    #[serde(default = "default_glow_color")]
    pub glow_color: String,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Coach {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleEntry {
    pub day: String,
    pub time: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Training {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn default_story_duration() -> Duration {
    Duration::from_millis(4000)
}

fn default_glow_intensity() -> f32 {
    0.5
}

fn default_glow_color() -> String {
    "#ffffff".to_string()
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

impl SiteConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SiteConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses the content compiled into the binary.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUNDLED_SITE)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn story(&self, id: &str) -> Option<&StoryEntry> {
        self.stories.iter().find(|story| story.id == id)
    }

    pub fn featured_tier(&self) -> Option<&PricingTier> {
        self.pricing.iter().find(|tier| tier.featured)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        self.background.validate()?;

        let mut story_ids = HashSet::new();
        for story in &self.stories {
            if story.id.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "story entries must have a non-empty id".into(),
                ));
            }
            if !story_ids.insert(story.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "story id '{}' is declared more than once",
                    story.id
                )));
            }
            if story.duration.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "story '{}' duration must be greater than zero",
                    story.id
                )));
            }
            if story.duration > MAX_STORY_DURATION {
                return Err(ConfigError::Invalid(format!(
                    "story '{}' duration must not exceed {}",
                    story.id,
                    humantime::format_duration(MAX_STORY_DURATION)
                )));
            }
            if story.source.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "story '{}' must reference a media source",
                    story.id
                )));
            }
        }

        let mut nav_paths = HashSet::new();
        for entry in &self.nav {
            if !entry.path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "nav entry '{}' path '{}' must start with '/'",
                    entry.label, entry.path
                )));
            }
            if !nav_paths.insert(entry.path.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "nav path '{}' is declared more than once",
                    entry.path
                )));
            }
        }

        let mut tier_ids = HashSet::new();
        for tier in &self.pricing {
            if !tier_ids.insert(tier.id) {
                return Err(ConfigError::Invalid(format!(
                    "pricing tier id {} is declared more than once",
                    tier.id
                )));
            }
            if !tier.glow_intensity.is_finite() || tier.glow_intensity < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "pricing tier '{}' glow_intensity must be >= 0",
                    tier.name
                )));
            }
        }

        Ok(())
    }
}

impl BackgroundSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, color) in [
            ("base_color", self.base_color),
            ("highlight_color", self.highlight_color),
        ] {
            if color
                .iter()
                .any(|channel| !channel.is_finite() || !(0.0..=1.0).contains(channel))
            {
                return Err(ConfigError::Invalid(format!(
                    "background.{name} channels must be within [0, 1]"
                )));
            }
        }

        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::Invalid(
                "background.speed must be greater than zero".into(),
            ));
        }

        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(ConfigError::Invalid(
                "background.amplitude must be >= 0".into(),
            ));
        }

        for (name, value) in [
            ("frequency_x", self.frequency_x),
            ("frequency_y", self.frequency_y),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "background.{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}

impl StoryEntry {
    /// Resolves the media source against the directory holding the config.
    pub fn resolved_source(&self, base_dir: &Path) -> PathBuf {
        if self.source.is_absolute() {
            self.source.clone()
        } else {
            base_dir.join(&self.source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[background]
speed = 0.5
amplitude = 0.2

[[nav]]
label = "Home"
path = "/"

[[nav]]
label = "Pricing"
path = "/pricing"

[[stories]]
id = "a"
title = "First"
source = "stories/a.jpg"
duration = "2500ms"

[[stories]]
id = "b"
title = "Second"
kind = "video"
source = "/srv/media/b.mp4"
duration = 6

[[pricing]]
id = 1
name = "Single"
price = "14"

[[pricing]]
id = 2
name = "Twelve"
price = "114"
featured = true
"#;

    #[test]
    fn parses_sample_config() {
        let config = SiteConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.nav.len(), 2);
        assert_eq!(config.background.speed, 0.5);
        assert_eq!(config.background.frequency_x, 3.2);
        assert!(config.background.interactive);

        let first = config.story("a").expect("story a");
        assert_eq!(first.duration, Duration::from_millis(2500));
        assert_eq!(first.kind, MediaKind::Image);
        let second = config.story("b").expect("story b");
        assert_eq!(second.duration, Duration::from_secs(6));
        assert_eq!(second.kind, MediaKind::Video);

        assert_eq!(config.featured_tier().map(|tier| tier.id), Some(2));
    }

    #[test]
    fn bundled_content_is_valid() {
        let config = SiteConfig::bundled().expect("bundled config");
        assert_eq!(config.stories.len(), 3);
        assert_eq!(config.nav.first().map(|entry| entry.path.as_str()), Some("/"));
        assert_eq!(config.background.amplitude, 0.10);
        assert_eq!(config.coaches.len(), 8);
        assert_eq!(config.featured_tier().map(|tier| tier.id), Some(4));
    }

    #[test]
    fn rejects_out_of_range_color() {
        let err = SiteConfig::from_toml_str(
            r#"
version = 1

[background]
base_color = [0.1, 1.5, 0.0]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_speed() {
        let err = SiteConfig::from_toml_str(
            r#"
version = 1

[background]
speed = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_duplicate_story_ids() {
        let err = SiteConfig::from_toml_str(
            r#"
version = 1

[[stories]]
id = "a"
title = "One"
source = "1.jpg"

[[stories]]
id = "a"
title = "Two"
source = "2.jpg"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_relative_nav_path() {
        let err = SiteConfig::from_toml_str(
            r#"
version = 1

[[nav]]
label = "Broken"
path = "pricing"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    fn story_with_duration(duration: &str) -> Result<SiteConfig, ConfigError> {
        SiteConfig::from_toml_str(&format!(
            "version = 1\n\n[[stories]]\nid = \"a\"\ntitle = \"One\"\nsource = \"1.jpg\"\nduration = {duration}\n"
        ))
    }

    #[test]
    fn rejects_duration_longer_than_an_hour() {
        let err = story_with_duration("9223372036854775807").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(story_with_duration("\"2h\"").is_err());
        assert!(story_with_duration("3600").is_ok());
    }

    #[test]
    fn rejects_unrepresentable_float_duration() {
        let err = story_with_duration("1e300").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = SiteConfig::from_toml_str(
            r#"
version = 1

[[stories]]
id = "a"
title = "One"
source = "1.jpg"
duration = -3
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn story_sources_resolve_against_base_dir() {
        let config = SiteConfig::from_toml_str(SAMPLE).unwrap();
        let base = Path::new("/etc/levelsite");
        assert_eq!(
            config.story("a").unwrap().resolved_source(base),
            PathBuf::from("/etc/levelsite/stories/a.jpg")
        );
        assert_eq!(
            config.story("b").unwrap().resolved_source(base),
            PathBuf::from("/srv/media/b.mp4")
        );
    }

    #[test]
    fn serialized_config_round_trips_durations() {
        let config = SiteConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().expect("serialize");
        assert!(rendered.contains("duration = \"2s 500ms\""));
        let reparsed = SiteConfig::from_toml_str(&rendered).expect("reparse");
        assert_eq!(
            reparsed.story("a").unwrap().duration,
            Duration::from_millis(2500)
        );
    }
}
