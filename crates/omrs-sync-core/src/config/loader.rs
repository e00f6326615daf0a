//! Configuration file discovery and loading

use super::sync_config::SyncConfig;
use crate::error::SyncError;
use crate::result::Result;
use std::path::{Path, PathBuf};

/// File names searched for, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".omrs-sync.json",
    ".omrs-sync.toml",
    "omrs-sync.yaml",
    "omrs-sync.yml",
    "omrs-sync.json",
];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover a config file by traversing upward from `start_path`
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| SyncError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILE_NAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    pub fn load_from_file(path: &Path) -> Result<SyncConfig> {
        SyncConfig::load(path).map_err(|e| {
            SyncError::config_error(format!(
                "Failed to load config from '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Load config from an explicit path, or auto-discover one
    ///
    /// Unlike an explicit path, a failed discovery is not an error: the
    /// defaults are used instead.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<SyncConfig> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(SyncError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(SyncConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEnv;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_config(dir: &Path, filename: &str, content: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_from_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_temp_config(
            temp_dir.path(),
            ".omrs-sync.toml",
            r#"
[catalog]
env = "staging"

[database]
path = "openmrs.db"
"#,
        );

        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(config.catalog_env(), CatalogEnv::Staging);
        assert_eq!(config.database_path(), Some(Path::new("openmrs.db")));
    }

    #[test]
    fn test_load_from_file_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_temp_config(
            temp_dir.path(),
            "omrs-sync.yaml",
            "catalog:\n  baseUrl: http://localhost:8000/\n  token: abc\n",
        );

        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(
            config.catalog_base_url(None),
            "http://localhost:8000/"
        );
        assert_eq!(config.catalog_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_auto_discover() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("exports/nested");
        fs::create_dir_all(&nested).unwrap();

        create_temp_config(temp_dir.path(), "omrs-sync.json", "{}");

        let found = ConfigLoader::auto_discover(&nested).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_dotfile_takes_priority() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_config(temp_dir.path(), "omrs-sync.json", "{}");
        let dotfile = create_temp_config(temp_dir.path(), ".omrs-sync.json", "{}");

        let found = ConfigLoader::auto_discover(temp_dir.path()).unwrap().unwrap();
        assert_eq!(found.file_name(), dotfile.file_name());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Some(Path::new("nonexistent.json")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(temp_dir.path(), "omrs-sync.ini", "x=1");
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }
}
