use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use siteconfig::SiteConfig;
use tracing::debug;

use crate::paths::AppPaths;

/// Where the effective site configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Bundled,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Bundled => f.write_str("(bundled)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSite {
    pub config: SiteConfig,
    pub source: ConfigSource,
    /// Directory relative story sources resolve against.
    pub base_dir: PathBuf,
}

impl LoadedSite {
    pub fn file(&self) -> Option<&Path> {
        match &self.source {
            ConfigSource::File(path) => Some(path),
            ConfigSource::Bundled => None,
        }
    }
}

/// Resolves the site configuration: explicit path, then the user's site file,
/// then the bundled content.
pub fn load_site(explicit: Option<&Path>, paths: &AppPaths) -> Result<LoadedSite> {
    if let Some(path) = explicit {
        return load_file(path);
    }

    let default_file = paths.site_file();
    if default_file.is_file() {
        return load_file(&default_file);
    }

    debug!(
        searched = %default_file.display(),
        "no site file found; using bundled content"
    );
    let config = SiteConfig::bundled().context("bundled site configuration is invalid")?;
    Ok(LoadedSite {
        config,
        source: ConfigSource::Bundled,
        base_dir: paths.media_dir(),
    })
}

pub fn load_file(path: &Path) -> Result<LoadedSite> {
    let config = SiteConfig::from_path(path)
        .with_context(|| format!("failed to load site configuration {}", path.display()))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(LoadedSite {
        config,
        source: ConfigSource::File(path.to_path_buf()),
        base_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::tests::{env_lock, EnvGuard};
    use crate::paths::{ENV_CACHE_DIR, ENV_CONFIG_DIR, ENV_DATA_DIR};
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = "version = 1\n\n[background]\nspeed = 0.5\n";

    #[test]
    fn explicit_file_wins_and_sets_base_dir() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("custom.toml");
        fs::write(&file, MINIMAL).unwrap();

        let loaded = load_file(&file).unwrap();
        assert_eq!(loaded.source, ConfigSource::File(file.clone()));
        assert_eq!(loaded.base_dir, root.path());
        assert_eq!(loaded.config.background.speed, 0.5);
    }

    #[test]
    fn falls_back_to_user_file_then_bundled() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");
        fs::create_dir_all(&config_dir).unwrap();

        let _config = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _data = EnvGuard::set(ENV_DATA_DIR, &data_dir);
        let _cache = EnvGuard::set(ENV_CACHE_DIR, &root.path().join("cache"));
        let paths = AppPaths::discover().unwrap();

        let bundled = load_site(None, &paths).unwrap();
        assert_eq!(bundled.source, ConfigSource::Bundled);
        assert_eq!(bundled.base_dir, data_dir);
        assert!(!bundled.config.nav.is_empty());

        fs::write(config_dir.join("site.toml"), MINIMAL).unwrap();
        let user = load_site(None, &paths).unwrap();
        assert_eq!(user.file(), Some(config_dir.join("site.toml").as_path()));
    }

    #[test]
    fn invalid_file_reports_path() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("broken.toml");
        fs::write(&file, "version = 2\n").unwrap();
        let err = load_file(&file).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
