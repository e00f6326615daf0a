//! Configuration for omrs-sync
//!
//! Settings come from an optional file, found by walking up from the working
//! directory and trying, in order, `.omrs-sync.json`, `.omrs-sync.toml`,
//! `omrs-sync.yaml`, `omrs-sync.yml` and `omrs-sync.json`. An explicit
//! `--config` path skips discovery. Command-line flags override file values.
//!
//! ```yaml
//! catalog:
//!   env: staging
//! database:
//!   path: ./openmrs.db
//! sources:
//!   - owner: Kenya
//!     remoteId: KE-EMR
//!     localName: KenyaEMR
//! ```

pub mod loader;
pub mod sync_config;

pub use loader::{CONFIG_FILE_NAMES, ConfigLoader};
pub use sync_config::{CatalogConfig, DatabaseConfig, SyncConfig, TOKEN_ENV_VAR};
