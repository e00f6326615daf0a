//! OCL catalog validation of local reference sources

use crate::error::SyncError;
use crate::naming::SourceDirectory;
use crate::result::Result;
use crate::store::RecordStore;
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// OCL deployment to validate against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogEnv {
    Dev,
    Staging,
    #[default]
    Production,
}

impl CatalogEnv {
    pub fn base_url(&self) -> &'static str {
        match self {
            CatalogEnv::Dev => "http://api.dev.openconceptlab.com/",
            CatalogEnv::Staging => "http://api.staging.openconceptlab.com/",
            CatalogEnv::Production => "http://api.openconceptlab.com/",
        }
    }
}

impl fmt::Display for CatalogEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CatalogEnv::Dev => "dev",
            CatalogEnv::Staging => "staging",
            CatalogEnv::Production => "production",
        };
        f.write_str(label)
    }
}

impl FromStr for CatalogEnv {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(CatalogEnv::Dev),
            "staging" => Ok(CatalogEnv::Staging),
            "production" | "prod" => Ok(CatalogEnv::Production),
            other => Err(SyncError::config_error(format!(
                "unknown catalog environment '{other}' (expected dev, staging or production)"
            ))),
        }
    }
}

/// Thin HTTP client for source existence checks
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::HttpError {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            token: token.filter(|token| !token.is_empty()),
        })
    }

    pub fn for_env(env: CatalogEnv, token: Option<String>) -> Result<Self> {
        Self::new(env.base_url(), token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// HEAD the source resource; only `200 OK` counts as present
    pub async fn source_exists(&self, org_id: &str, source_id: &str) -> Result<bool> {
        let url = format!("{}orgs/{}/sources/{}/", self.base_url, org_id, source_id);
        let mut request = self.client.head(&url);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }
        let response = request.send().await?;
        debug!("HEAD {} -> {}", url, response.status());
        Ok(response.status() == StatusCode::OK)
    }
}

/// Outcome of checking one local source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Found,
    /// No token configured, remote check skipped
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCheck {
    pub local_name: String,
    pub remote_id: String,
    pub owner: String,
    pub status: SourceStatus,
}

/// Confirm that every non-retired local source is known to the catalog
///
/// Stops at the first source that has no owner in the directory or that the
/// catalog does not answer `200 OK` for.
pub async fn check_sources<S: RecordStore + ?Sized>(
    store: &S,
    directory: &SourceDirectory,
    client: &CatalogClient,
) -> Result<Vec<SourceCheck>> {
    let sources = store.list_sources()?;
    if !client.has_token() {
        warn!("No OCL API token configured; sources will not be checked remotely");
    }

    let mut checks = Vec::new();
    for source in sources.into_iter().filter(|source| !source.retired) {
        let remote_id = directory.to_remote_name(&source.name);
        let owner = directory.owner_of(&remote_id).ok_or_else(|| {
            SyncError::unrecognized_source(format!(
                "'{remote_id}' has no owner in the source directory"
            ))
        })?;
        debug!("Checking source '{}' owned by '{}'", remote_id, owner);

        let status = if client.has_token() {
            if !client.source_exists(owner, &remote_id).await? {
                return Err(SyncError::unrecognized_source(format!(
                    "'{owner}/{remote_id}' not found at {}",
                    client.base_url()
                )));
            }
            SourceStatus::Found
        } else {
            SourceStatus::Unchecked
        };
        checks.push(SourceCheck {
            local_name: source.name,
            remote_id,
            owner: owner.to_string(),
            status,
        });
    }
    info!("Checked {} reference sources", checks.len());
    Ok(checks)
}
