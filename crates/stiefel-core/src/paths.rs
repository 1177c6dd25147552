//! Default filesystem locations for config/log files, using the standard
//! per-platform project-directory convention.

use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "org";
pub const APP_ORG: &str = "stiefelsystem";
pub const APP_NAME: &str = "stiefel";

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine a home directory for config lookup"))
}

/// Where `stiefel-server`/`stiefel-client`/`autokexecd` look for their
/// config file if none is given on the command line.
pub fn default_config_path(binary_name: &str) -> PathBuf {
    PathBuf::from("/etc/stiefelsystem").join(format!("{binary_name}.toml"))
}

/// User-overridable config path, falling back to [`default_config_path`]
/// when no per-user override exists.
pub fn config_path(binary_name: &str) -> PathBuf {
    if let Ok(dirs) = project_dirs() {
        let user_path = dirs.config_dir().join(format!("{binary_name}.toml"));
        if user_path.is_file() {
            return user_path;
        }
    }
    default_config_path(binary_name)
}

pub fn log_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_is_under_etc() {
        assert_eq!(
            default_config_path("stiefel-server"),
            PathBuf::from("/etc/stiefelsystem/stiefel-server.toml")
        );
    }
}
