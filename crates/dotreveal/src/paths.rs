use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use directories_next::ProjectDirs;
use effectconfig::CONFIG_FILE_NAME;

pub const ENV_CONFIG_DIR: &str = "DOTREVEAL_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "dotreveal";
const APPLICATION: &str = "dotreveal";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

/// Picks the configuration file to load.
///
/// An explicit path must exist. Otherwise the file in the config directory
/// is used when present, and `None` means built-in defaults.
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("configuration file {} does not exist", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let paths = match AppPaths::discover() {
        Ok(paths) => paths,
        Err(err) => {
            tracing::debug!(error = %err, "no config directory; using built-in defaults");
            return Ok(None);
        }
    };
    let candidate = paths.config_file();
    if candidate.is_file() {
        Ok(Some(candidate))
    } else {
        tracing::debug!(
            config = %paths.config_dir().display(),
            "no effect.toml found; using built-in defaults"
        );
        Ok(None)
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
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
    fn env_override_takes_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        let paths = AppPaths::discover().unwrap();
        assert_eq!(paths.config_dir(), root.path());
        assert_eq!(paths.config_file(), root.path().join("effect.toml"));
    }

    #[test]
    fn config_file_is_used_only_when_present() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        assert_eq!(resolve_config_file(None).unwrap(), None);

        let file = root.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, "").unwrap();
        assert_eq!(resolve_config_file(None).unwrap(), Some(file));
    }

    #[test]
    fn explicit_path_must_exist() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("missing.toml");
        assert!(resolve_config_file(Some(&missing)).is_err());

        let present = root.path().join("present.toml");
        std::fs::write(&present, "").unwrap();
        assert_eq!(
            resolve_config_file(Some(&present)).unwrap(),
            Some(present.clone())
        );
    }
}
