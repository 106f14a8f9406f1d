//! Locating candidate `NuGet.Config` files.
//!
//! Search roots are an explicit [`SearchPaths`] value; nothing here reads
//! process-wide state except [`SearchPaths::from_environment`].

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// File names accepted in the working directory and its ancestors, in
/// precedence order
pub const LOCAL_FILE_NAMES: [&str; 3] = ["nuget.config", "NuGet.config", "NuGet.Config"];

/// File name used in user and machine-wide config directories
pub const USER_FILE_NAME: &str = "NuGet.Config";

/// Directories searched for configuration files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    /// Walked upward to the filesystem root
    pub working_dir: Option<PathBuf>,
    /// Per-user config directories
    pub user_dirs: Vec<PathBuf>,
    /// Machine-wide config directories
    pub system_dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// Search roots for the current process
    ///
    /// Windows: `%APPDATA%\NuGet` and `%ProgramFiles(x86)%\NuGet\Config`
    ///
    /// Elsewhere: `~/.nuget/NuGet` and `/etc/opt/NuGet/Config`, unless
    /// `NUGET_COMMON_APPLICATION_DATA` overrides the machine-wide root
    pub fn from_environment() -> Self {
        let working_dir = env::current_dir().ok();

        #[cfg(target_os = "windows")]
        let (user_dirs, default_system) = (
            dirs::config_dir().map(|dir| dir.join("NuGet")).into_iter().collect::<Vec<_>>(),
            env::var_os("ProgramFiles(x86)")
                .map(|dir| PathBuf::from(dir).join("NuGet").join("Config")),
        );

        #[cfg(not(target_os = "windows"))]
        let (user_dirs, default_system) = (
            dirs::home_dir()
                .map(|home| home.join(".nuget").join("NuGet"))
                .into_iter()
                .collect::<Vec<_>>(),
            Some(PathBuf::from("/etc/opt/NuGet/Config")),
        );

        let system_dirs = env::var_os("NUGET_COMMON_APPLICATION_DATA")
            .map(|dir| PathBuf::from(dir).join("NuGet").join("Config"))
            .or(default_system)
            .into_iter()
            .collect();

        Self {
            working_dir,
            user_dirs,
            system_dirs,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Every path that may hold a config file, most specific first
pub fn candidate_paths(search: &SearchPaths) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = &search.working_dir {
        for ancestor in dir.ancestors() {
            candidates.extend(LOCAL_FILE_NAMES.iter().map(|name| ancestor.join(name)));
        }
    }
    for dir in search.user_dirs.iter().chain(&search.system_dirs) {
        candidates.push(dir.join(USER_FILE_NAME));
    }
    candidates
}

/// The first candidate that exists as a file
///
/// # Errors
///
/// [`ConfigError::NotFound`] when no candidate exists.
pub fn find_config(search: &SearchPaths) -> Result<PathBuf> {
    let found = candidate_paths(search)
        .into_iter()
        .find(|path| is_file(path))
        .ok_or_else(|| ConfigError::not_found("NuGet.Config in any search path"))?;

    tracing::debug!(path = %found.display(), "found config file");
    Ok(found)
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|meta| meta.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;

    #[test]
    fn test_candidates_walk_ancestors_then_user_dirs() {
        let search = SearchPaths {
            working_dir: Some(PathBuf::from("/a/b")),
            user_dirs: vec![PathBuf::from("/home/me/.nuget/NuGet")],
            system_dirs: vec![PathBuf::from("/etc/opt/NuGet/Config")],
        };

        let candidates = candidate_paths(&search);

        assert_eq!(candidates[0], PathBuf::from("/a/b/nuget.config"));
        assert_eq!(candidates[3], PathBuf::from("/a/nuget.config"));
        assert_eq!(candidates[6], PathBuf::from("/nuget.config"));
        assert_eq!(
            candidates[candidates.len() - 2],
            PathBuf::from("/home/me/.nuget/NuGet/NuGet.Config")
        );
        assert_eq!(
            candidates.last(),
            Some(&PathBuf::from("/etc/opt/NuGet/Config/NuGet.Config"))
        );
    }

    #[test]
    fn test_find_config_prefers_nearest() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("src").join("app");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join("NuGet.Config"), "<packageSources/>").unwrap();
        fs::write(root.path().join("src").join("nuget.config"), "<packageSources/>").unwrap();

        let search = SearchPaths::default().with_working_dir(&nested);

        assert_eq!(find_config(&search).unwrap(), root.path().join("src").join("nuget.config"));
    }

    #[test]
    fn test_find_config_not_found() {
        let search = SearchPaths {
            working_dir: None,
            user_dirs: vec![PathBuf::from("/nonexistent/user")],
            system_dirs: vec![],
        };

        assert_eq!(find_config(&search).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
