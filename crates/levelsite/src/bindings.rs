use std::path::Path;

use anyhow::{bail, Result};
use renderer::{ChromeParams, RendererConfig};
use siteconfig::{BackgroundSettings, SiteConfig};
use stories::Story;

use crate::cli::RunArgs;

pub fn chrome_params(settings: &BackgroundSettings) -> ChromeParams {
    ChromeParams {
        base_color: settings.base_color,
        highlight_color: settings.highlight_color,
        speed: settings.speed,
        amplitude: settings.amplitude,
        frequency_x: settings.frequency_x,
        frequency_y: settings.frequency_y,
        interactive: settings.interactive,
    }
}

pub fn story_list(config: &SiteConfig, base_dir: &Path) -> Vec<Story> {
    config
        .stories
        .iter()
        .map(|entry| Story::from_entry(entry, base_dir))
        .collect()
}

/// `--story` is 1-based to match the digit keys; returns the 0-based index.
pub fn story_index(requested: Option<usize>, available: usize) -> Result<Option<usize>> {
    match requested {
        None => Ok(None),
        Some(0) => bail!("--story is 1-based; use 1 for the first story"),
        Some(n) if n > available => {
            bail!("--story {n} is out of range; the site has {available} stories")
        }
        Some(n) => Ok(Some(n - 1)),
    }
}

pub fn renderer_config(
    config: &SiteConfig,
    base_dir: &Path,
    args: &RunArgs,
) -> Result<RendererConfig> {
    let stories = story_list(config, base_dir);
    let open_story = story_index(args.story, stories.len())?;
    let defaults = RendererConfig::default();
    let title = if config.studio.name.trim().is_empty() {
        defaults.title
    } else {
        config.studio.name.clone()
    };

    Ok(RendererConfig {
        title,
        window_size: args.size.unwrap_or(defaults.window_size),
        params: chrome_params(&config.background),
        target_fps: args.fps.filter(|fps| fps.is_finite() && *fps > 0.0),
        antialiasing: args.antialias,
        color_space: args.color_space,
        stories,
        open_story,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn background_settings_map_field_by_field() {
        let settings = BackgroundSettings {
            base_color: [0.1, 0.2, 0.3],
            highlight_color: [0.9, 0.8, 0.7],
            speed: 0.24,
            amplitude: 0.1,
            frequency_x: 2.6,
            frequency_y: 3.0,
            interactive: false,
        };
        let params = chrome_params(&settings);
        assert_eq!(params.base_color, [0.1, 0.2, 0.3]);
        assert_eq!(params.highlight_color, [0.9, 0.8, 0.7]);
        assert_eq!(params.speed, 0.24);
        assert_eq!(params.frequency_y, 3.0);
        assert!(!params.interactive);
    }

    #[test]
    fn default_settings_match_renderer_defaults() {
        assert_eq!(
            chrome_params(&BackgroundSettings::default()),
            ChromeParams::default()
        );
    }

    #[test]
    fn story_index_is_one_based() {
        assert_eq!(story_index(None, 3).unwrap(), None);
        assert_eq!(story_index(Some(1), 3).unwrap(), Some(0));
        assert_eq!(story_index(Some(3), 3).unwrap(), Some(2));
        assert!(story_index(Some(0), 3).is_err());
        assert!(story_index(Some(4), 3).is_err());
    }

    #[test]
    fn renderer_config_uses_site_content() {
        let site = SiteConfig::bundled().unwrap();
        let args = RunArgs {
            size: Some((390, 844)),
            fps: Some(0.0),
            story: Some(1),
            ..RunArgs::default()
        };
        let base = PathBuf::from("/srv/level");
        let config = renderer_config(&site, &base, &args).unwrap();

        assert_eq!(config.title, "LEVEL");
        assert_eq!(config.window_size, (390, 844));
        assert_eq!(config.target_fps, None);
        assert_eq!(config.open_story, Some(0));
        assert_eq!(config.params.speed, 0.24);
        assert_eq!(config.stories.len(), site.stories.len());
        assert!(config.stories[0].source.starts_with(&base));
    }
}
