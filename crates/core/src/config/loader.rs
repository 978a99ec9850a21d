//! Config path resolution
//!
//! Handles resolving paths for configuration files based on the host's location.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigResult};

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "OVERLAYHOOK_HOME";

/// Returns the overlayhook base directory.
///
/// `$OVERLAYHOOK_HOME` if set, otherwise an `overlayhook/` directory next to
/// the host executable the agent was loaded into.
pub fn overlayhook_base_dir() -> ConfigResult<PathBuf> {
    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    resolve_base_dir(std::env::var_os(HOME_ENV), &exe)
}

fn resolve_base_dir(home: Option<OsString>, exe: &Path) -> ConfigResult<PathBuf> {
    if let Some(home) = home.filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }

    exe.parent()
        .map(|dir| dir.join("overlayhook"))
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the configs directory.
///
/// Path: `<base>/configs/`
pub fn configs_dir() -> ConfigResult<PathBuf> {
    Ok(overlayhook_base_dir()?.join("configs"))
}

/// Returns the agent config path.
///
/// Path: `<base>/configs/agent.toml`
pub fn agent_config_path() -> ConfigResult<PathBuf> {
    Ok(configs_dir()?.join("agent.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_override_wins() {
        let base = resolve_base_dir(
            Some(OsString::from("/opt/overlay")),
            Path::new("/games/host/host.exe"),
        )
        .unwrap();
        assert_eq!(base, PathBuf::from("/opt/overlay"));
    }

    #[test]
    fn test_defaults_next_to_executable() {
        let base = resolve_base_dir(None, Path::new("/games/host/host.exe")).unwrap();
        assert_eq!(base, PathBuf::from("/games/host/overlayhook"));

        // Empty override is ignored
        let base = resolve_base_dir(Some(OsString::new()), Path::new("/games/host/host.exe"))
            .unwrap();
        assert!(base.ends_with("host/overlayhook"));
    }

    #[test]
    fn test_executable_without_parent() {
        assert!(matches!(
            resolve_base_dir(None, Path::new("")),
            Err(ConfigError::NoConfigDirectory)
        ));
    }
}
