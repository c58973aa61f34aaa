use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use renderer::{Renderer, WindowRuntime, WindowSignal};
use siteconfig::{BackgroundSettings, SiteConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bindings::{chrome_params, renderer_config};
use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::site::load_site;

const WATCH_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let site = load_site(args.config.as_deref(), &paths)?;
    debug!(
        config = %paths.config_dir().display(),
        data = %paths.data_dir().display(),
        cache = %paths.cache_dir().display(),
        source = %site.source,
        "resolved levelsite paths"
    );

    let mut config = renderer_config(&site.config, &site.base_dir, &args)?;
    info!(
        source = %site.source,
        stories = config.stories.len(),
        width = config.window_size.0,
        height = config.window_size.1,
        "opening site window"
    );

    match (args.watch, site.file()) {
        (true, Some(file)) => {
            let watcher = ConfigWatcher::new(file.to_path_buf(), site.config.background);
            let open_story = config.open_story.take();
            let runtime = WindowRuntime::spawn(config)?;
            if let Some(index) = open_story {
                runtime.open_story(index)?;
            }
            watch(runtime, watcher)
        }
        (true, None) => {
            warn!("--watch has no effect with the bundled configuration");
            Renderer::new(config).run()
        }
        (false, _) => Renderer::new(config).run(),
    }
}

fn watch(runtime: WindowRuntime, mut watcher: ConfigWatcher) -> Result<()> {
    info!(path = %watcher.path().display(), "watching site configuration");
    loop {
        for signal in runtime.drain_signals() {
            match signal {
                WindowSignal::StoryClosed { index } => debug!(index, "story viewer closed"),
                WindowSignal::WindowClosed => return runtime.shutdown(),
            }
        }
        if runtime.is_finished() {
            return runtime.shutdown();
        }
        if let Some(settings) = watcher.poll() {
            info!(
                speed = settings.speed,
                amplitude = settings.amplitude,
                interactive = settings.interactive,
                "background settings reloaded"
            );
            runtime.update_params(chrome_params(&settings))?;
        }
        thread::sleep(WATCH_INTERVAL);
    }
}

/// Polls a site file and yields background settings whenever they change.
///
/// Invalid edits are logged and skipped; the last good settings stay applied.
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    applied: BackgroundSettings,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf, applied: BackgroundSettings) -> Self {
        let modified = modified_time(&path);
        Self {
            path,
            modified,
            applied,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn poll(&mut self) -> Option<BackgroundSettings> {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return None;
        }
        self.modified = modified;

        let config = match SiteConfig::from_path(&self.path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring invalid site configuration");
                return None;
            }
        };
        if config.background == self.applied {
            return None;
        }
        self.applied = config.background;
        Some(self.applied)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn write_site(path: &Path, speed: f32, stamp: u64) {
        fs::write(
            path,
            format!("version = 1\n\n[background]\nspeed = {speed}\n"),
        )
        .unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(stamp))
            .unwrap();
    }

    #[test]
    fn yields_settings_only_when_background_changes() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("site.toml");
        write_site(&path, 0.5, 1_000);

        let initial = SiteConfig::from_path(&path).unwrap().background;
        let mut watcher = ConfigWatcher::new(path.clone(), initial);
        assert_eq!(watcher.poll(), None);

        write_site(&path, 0.5, 2_000);
        assert_eq!(watcher.poll(), None);

        write_site(&path, 0.8, 3_000);
        let reloaded = watcher.poll().expect("speed changed");
        assert_eq!(reloaded.speed, 0.8);
        assert_eq!(watcher.poll(), None);
    }

    #[test]
    fn invalid_edit_keeps_last_good_settings() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("site.toml");
        write_site(&path, 0.5, 1_000);
        let initial = SiteConfig::from_path(&path).unwrap().background;
        let mut watcher = ConfigWatcher::new(path.clone(), initial);

        write_site(&path, -1.0, 2_000);
        assert_eq!(watcher.poll(), None);

        write_site(&path, 0.5, 3_000);
        assert_eq!(watcher.poll(), None);
    }
}
