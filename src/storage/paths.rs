//! Config and cache directory resolution.
//!
//! `$XDG_CONFIG_HOME/skiff` (or `~/.config/skiff`) holds the subscription
//! file and settings; `$XDG_CACHE_HOME/skiff` (or `~/.cache/skiff`) holds
//! the feed cache and the debug log.
use super::StorageError;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "skiff";
pub const SUBSCRIPTIONS_FILE: &str = "urls";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const CACHE_FILE: &str = "feeds.json";
pub const LOG_FILE: &str = "skiff.log";

pub fn config_dir() -> Result<PathBuf, StorageError> {
    base_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join(APP_DIR))
}

pub fn cache_dir() -> Result<PathBuf, StorageError> {
    base_dir("XDG_CACHE_HOME", ".cache").map(|d| d.join(APP_DIR))
}

fn base_dir(xdg_var: &str, home_fallback: &str) -> Result<PathBuf, StorageError> {
    if let Some(dir) = std::env::var_os(xdg_var).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .ok_or(StorageError::NoHome)?;
    Ok(PathBuf::from(home).join(home_fallback))
}

/// Create `dir` if needed and restrict it to the current user.
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(dir, perms) {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Failed to set directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to read directory metadata");
            }
        }
    }

    Ok(())
}

/// Write `bytes` to `dst` through a temp file, fsync, then rename.
///
/// The destination is never observed half-written.
pub fn atomic_write(dst: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};

    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| StorageError::io(&temp_path, e))?;

    let written = temp_file
        .write_all(bytes)
        .and_then(|_| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(StorageError::io(&temp_path, e));
    }

    std::fs::rename(&temp_path, dst).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        StorageError::io(dst, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file must not survive the rename");
    }

    #[test]
    fn test_atomic_write_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("feeds.json");
        assert!(matches!(
            atomic_write(&path, b"x"),
            Err(StorageError::Io { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dir_sets_private_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("skiff");
        ensure_dir(&target).unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
