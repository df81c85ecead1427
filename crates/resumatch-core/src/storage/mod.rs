mod config;
pub mod scopes;

pub use config::{ApiConfig, Config, DurableBackend, StorageConfig, Theme, UiConfig};
pub use scopes::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the directory holding `config.toml` and durable credentials.
///
/// Resolution order: `$RESUMATCH_HOME`, then `~/.config/resumatch-dev/`
/// when `RESUMATCH_ENV=dev`, then `~/.config/resumatch/`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("RESUMATCH_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("RESUMATCH_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("resumatch-dev")
            } else {
                base_dir.join("resumatch")
            }
        }
    };

    ensure_dir(dir)
}

/// Returns the directory holding the tab-scoped credential file.
///
/// Prefers the per-user runtime dir (`$XDG_RUNTIME_DIR`), which is dropped
/// at logout; otherwise a per-user directory under the OS temp dir. With
/// `RESUMATCH_HOME` set it moves under that directory instead, which keeps
/// test runs isolated. The directory is private to the current user.
pub fn session_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("RESUMATCH_HOME") {
        Some(home) => PathBuf::from(home).join("session"),
        None => match dirs::runtime_dir() {
            Some(runtime) => runtime.join("resumatch"),
            None => {
                let user = std::env::var("USER")
                    .or_else(|_| std::env::var("USERNAME"))
                    .unwrap_or_else(|_| "default".to_string());
                std::env::temp_dir().join(format!("resumatch-{user}"))
            }
        },
    };

    ensure_private_dir(dir)
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(&dir).map_err(|e| dir_error(&dir, e))?;
    Ok(dir)
}

fn dir_error(dir: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::DataDir {
        path: dir.to_path_buf(),
        message: err.to_string(),
    }
}

/// Create `dir` with mode 0700 and tighten an existing one.
///
/// Refuses a symlink. `chmod` only succeeds for the owner, so a directory
/// planted by another user is rejected too.
#[cfg(unix)]
fn ensure_private_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&dir)
        .map_err(|e| dir_error(&dir, e))?;

    let meta = std::fs::symlink_metadata(&dir).map_err(|e| dir_error(&dir, e))?;
    if !meta.file_type().is_dir() {
        return Err(dir_error(&dir, "not a directory"));
    }
    std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| dir_error(&dir, format!("cannot make it private: {e}")))?;
    Ok(dir)
}

#[cfg(not(unix))]
fn ensure_private_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    ensure_dir(dir)
}
