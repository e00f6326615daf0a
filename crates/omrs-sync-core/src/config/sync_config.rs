//! Typed configuration file contents

use crate::catalog::CatalogEnv;
use crate::naming::{SourceDirectory, SourceEntry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the OCL API token
pub const TOKEN_ENV_VAR: &str = "OCL_API_TOKEN";

/// Root configuration for omrs-sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// JSON schema reference for IDE support
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// Extra source directory entries, replacing built-ins with the same id or name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(description = "Additional OCL <-> OpenMRS source name translations")]
    pub sources: Vec<SourceEntry>,
}

/// OCL catalog access
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "OCL environment: dev, staging or production")]
    pub env: Option<CatalogEnv>,

    /// Overrides the environment's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Catalog base URL, overrides env")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "OCL API token (prefer the OCL_API_TOKEN variable)")]
    pub token: Option<String>,
}

/// Target database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Path of the SQLite database file")]
    pub path: Option<PathBuf>,
}

impl SyncConfig {
    /// Load from a YAML, TOML or JSON file, chosen by extension
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str());

        match ext {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err("Unsupported file extension (expected .yaml, .yml, .toml or .json)".into()),
        }
    }

    /// Built-in source directory extended with the configured entries
    pub fn source_directory(&self) -> SourceDirectory {
        SourceDirectory::default().with_entries(self.sources.iter().cloned())
    }

    pub fn catalog_env(&self) -> CatalogEnv {
        self.catalog
            .as_ref()
            .and_then(|catalog| catalog.env)
            .unwrap_or_default()
    }

    /// Catalog base URL
    ///
    /// An environment chosen on the command line wins over the file; otherwise
    /// the file's `baseUrl` wins over its `env`.
    pub fn catalog_base_url(&self, env_flag: Option<CatalogEnv>) -> String {
        if let Some(env) = env_flag {
            return env.base_url().to_string();
        }
        self.catalog
            .as_ref()
            .and_then(|catalog| catalog.base_url.clone())
            .unwrap_or_else(|| self.catalog_env().base_url().to_string())
    }

    pub fn catalog_token(&self) -> Option<String> {
        self.catalog.as_ref().and_then(|catalog| catalog.token.clone())
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database
            .as_ref()
            .and_then(|database| database.path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.catalog_env(), CatalogEnv::Production);
        assert_eq!(
            config.catalog_base_url(Some(CatalogEnv::Dev)),
            "http://api.dev.openconceptlab.com/"
        );
        assert!(config.database_path().is_none());
    }

    #[test]
    fn test_configured_sources_extend_directory() {
        let config: SyncConfig = serde_json::from_str(
            r#"{"sources":[{"owner":"Kenya","remoteId":"KE-EMR","localName":"KenyaEMR"}]}"#,
        )
        .unwrap();
        let directory = config.source_directory();

        assert_eq!(directory.to_local_name("KE-EMR"), "KenyaEMR");
        assert_eq!(directory.owner_of("KE-EMR"), Some("Kenya"));
        assert_eq!(directory.to_local_name("SNOMED-CT"), "SNOMED CT");
    }

    #[test]
    fn test_env_flag_overrides_configured_base_url() {
        let config: SyncConfig = serde_json::from_str(
            r#"{"catalog":{"env":"staging","baseUrl":"http://localhost:8000/"}}"#,
        )
        .unwrap();

        assert_eq!(config.catalog_base_url(None), "http://localhost:8000/");
        assert_eq!(
            config.catalog_base_url(Some(CatalogEnv::Dev)),
            "http://api.dev.openconceptlab.com/"
        );
    }

    #[test]
    fn test_configured_env_used_without_base_url() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"catalog":{"env":"staging"}}"#).unwrap();
        assert_eq!(
            config.catalog_base_url(None),
            "http://api.staging.openconceptlab.com/"
        );
    }
}
