use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "LEVELSITE_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "LEVELSITE_DATA_DIR";
pub const ENV_CACHE_DIR: &str = "LEVELSITE_CACHE_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Level";
const APPLICATION: &str = "LevelSite";

pub const SITE_FILE_NAME: &str = "site.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION);
        let resolve = |name: &str, fallback: Option<&Path>, label: &str| -> Result<PathBuf> {
            env_override(name)
                .or_else(|| fallback.map(Path::to_path_buf))
                .ok_or_else(|| {
                    anyhow!("failed to determine the {label} directory; set {name} explicitly")
                })
        };

        Ok(Self {
            config_dir: resolve(
                ENV_CONFIG_DIR,
                project_dirs.as_ref().map(ProjectDirs::config_dir),
                "config",
            )?,
            data_dir: resolve(
                ENV_DATA_DIR,
                project_dirs.as_ref().map(ProjectDirs::data_dir),
                "data",
            )?,
            cache_dir: resolve(
                ENV_CACHE_DIR,
                project_dirs.as_ref().map(ProjectDirs::cache_dir),
                "cache",
            )?,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Site file picked up when `--config` is not given.
    pub fn site_file(&self) -> PathBuf {
        self.config_dir.join(SITE_FILE_NAME)
    }

    /// Relative story sources in the bundled content resolve against this directory.
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    pub(crate) fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    pub(crate) struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        pub(crate) fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        pub(crate) fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");
        let cache_dir = root.path().join("cache");

        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _data_guard = EnvGuard::set(ENV_DATA_DIR, &data_dir);
        let _cache_guard = EnvGuard::set(ENV_CACHE_DIR, &cache_dir);

        let paths = AppPaths::discover().unwrap();

        assert_eq!(paths.config_dir(), config_dir.as_path());
        assert_eq!(paths.data_dir(), data_dir.as_path());
        assert_eq!(paths.cache_dir(), cache_dir.as_path());
        assert_eq!(paths.site_file(), config_dir.join("site.toml"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let data_dir = root.path().join("data");
        let cache_dir = root.path().join("cache");

        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, Path::new(""));
        let _data_guard = EnvGuard::set(ENV_DATA_DIR, &data_dir);
        let _cache_guard = EnvGuard::set(ENV_CACHE_DIR, &cache_dir);

        if let Ok(paths) = AppPaths::discover() {
            assert_ne!(paths.config_dir(), Path::new(""));
        }
    }

    #[test]
    fn cleared_overrides_fall_back_to_platform_dirs() {
        let _guard = env_lock().lock().unwrap();
        let _config_guard = EnvGuard::clear(ENV_CONFIG_DIR);
        let _data_guard = EnvGuard::clear(ENV_DATA_DIR);
        let _cache_guard = EnvGuard::clear(ENV_CACHE_DIR);

        if let Ok(paths) = AppPaths::discover() {
            assert!(paths.site_file().ends_with(SITE_FILE_NAME));
        }
    }
}
