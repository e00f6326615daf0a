//! Core library for omrs-sync
//!
//! Imports an OCL JSON-lines concept dictionary export into an OpenMRS-shaped
//! record store. The run is one-way: incoming concepts are reconciled against
//! existing names, missing rows are created, and nothing is ever updated or
//! deleted.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod model;
pub mod naming;
pub mod reconcile;
pub mod records;
pub mod resolve;
pub mod result;
pub mod store;
pub mod sync;

pub use catalog::{CatalogClient, CatalogEnv, SourceCheck, SourceStatus, check_sources};
pub use config::{ConfigLoader, SyncConfig, TOKEN_ENV_VAR};
pub use context::{SyncContext, SyncCounters, TranslationTable};
pub use error::{ErrorKind, ReferenceKind, SyncError};
pub use model::{ConceptId, ExportId};
pub use naming::{SourceDirectory, SourceEntry};
pub use reconcile::{Reconciled, reconcile_concept};
pub use records::{ClassRecord, ConceptRecord, MappingRecord, MappingTarget, SourceRecord};
pub use resolve::{CONCEPT_SET, Q_AND_A, Resolution, resolve_mapping};
pub use result::Result;
pub use store::{MemoryStore, RecordStore, SqliteStore, Upsert};
pub use sync::{
    DictionaryRef, InputFiles, ProgressCallback, ProgressInfo, RetiredConcept, SyncInput,
    SyncOptions, SyncPhase, Synchronizer, retired_concepts,
};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("omrs_sync=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
