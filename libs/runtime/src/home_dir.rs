//! Resolve the server home directory used as the base for relative paths
//! (log files, markdown includes).

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory ({0} is not set)")]
    UserHomeUnknown(&'static str),
    #[error("cannot determine the current directory")]
    CurrentDir(#[source] std::io::Error),
    #[error("failed to create home directory {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const USER_HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const USER_HOME_VAR: &str = "HOME";

/// Resolve `explicit` (or `<user home>/<default_subdir>` when absent) into an
/// absolute path. A leading `~` expands to the user home; relative paths are
/// taken from the current directory. With `create` the directory is created.
pub fn resolve_home_dir(
    explicit: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let user_home = std::env::var_os(USER_HOME_VAR).map(PathBuf::from);
    resolve_with_user_home(explicit, default_subdir, create, user_home.as_deref())
}

fn resolve_with_user_home(
    explicit: Option<String>,
    default_subdir: &str,
    create: bool,
    user_home: Option<&Path>,
) -> Result<PathBuf, HomeDirError> {
    let user_home = || user_home.ok_or(HomeDirError::UserHomeUnknown(USER_HOME_VAR));

    let resolved = match explicit.as_deref().map(str::trim) {
        None | Some("") => user_home()?.join(default_subdir),
        Some("~") => user_home()?.to_path_buf(),
        Some(raw) => match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
            Some(rest) => user_home()?.join(rest),
            None => {
                let path = PathBuf::from(raw);
                if path.is_absolute() {
                    path
                } else {
                    std::env::current_dir()
                        .map_err(HomeDirError::CurrentDir)?
                        .join(path)
                }
            }
        },
    };

    if create {
        std::fs::create_dir_all(&resolved).map_err(|source| HomeDirError::Create {
            path: resolved.clone(),
            source,
        })?;
    }

    Ok(resolved)
}
