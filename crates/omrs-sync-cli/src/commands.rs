//! Command implementations

use crate::OutputFormat;
use crate::output::{OutputFormatter, RunSummary, SyncProgress};
use omrs_sync_core::{
    CatalogClient, CatalogEnv, ConfigLoader, DictionaryRef, ExportId, InputFiles, MemoryStore,
    RecordStore, Result, SourceDirectory, SqliteStore, SyncConfig, SyncContext, SyncError,
    SyncInput, SyncOptions, Synchronizer, check_sources, retired_concepts,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Arguments of the `sync` command
pub struct SyncArgs {
    pub files: InputFiles,
    pub org_id: Option<String>,
    pub source_id: Option<String>,
    pub concept_id: Option<i64>,
    pub retired: bool,
    pub database: Option<PathBuf>,
    pub dry_run: bool,
    pub format: OutputFormat,
    pub progress: bool,
}

fn load_config(config_path: Option<&Path>) -> Result<SyncConfig> {
    let config = ConfigLoader::load(config_path, None)?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Database path from the flag, falling back to the config file
fn database_path(flag: Option<PathBuf>, config: &SyncConfig) -> Option<PathBuf> {
    flag.or_else(|| config.database_path().map(Path::to_path_buf))
}

pub async fn sync_command(args: SyncArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let formatter = OutputFormatter::new(args.format);

    if args.files.is_empty() {
        return Err(SyncError::config_error(
            "Nothing to import: pass at least one of --concept-file, --mapping-file, --source-file or --class-file",
        ));
    }

    let input = SyncInput::load(&args.files)?;

    if args.retired {
        let retired = retired_concepts(&input.concepts);
        return formatter.print_retired(&retired);
    }

    let options = SyncOptions {
        concept_filter: args.concept_id.map(ExportId),
        dictionary: match (args.org_id, args.source_id) {
            (Some(org_id), Some(source_id)) => Some(DictionaryRef { org_id, source_id }),
            _ => None,
        },
    };
    let directory = config.source_directory();
    let progress = args.progress.then(SyncProgress::new);

    let database = database_path(args.database, &config);
    let context = match database {
        Some(path) => {
            info!("Synchronizing into {}", path.display());
            let mut store = SqliteStore::open(&path)?;
            if args.dry_run {
                store.begin()?;
            }
            let outcome = run_sync(&mut store, &directory, options, progress.as_ref(), &input);
            if args.dry_run {
                info!("Dry run: rolling back all changes");
                store.rollback()?;
            }
            outcome?
        }
        None if args.dry_run => {
            info!("Dry run without a database: using an empty in-memory store");
            let mut store = MemoryStore::with_defaults();
            run_sync(&mut store, &directory, options, progress.as_ref(), &input)?
        }
        None => {
            return Err(SyncError::config_error(
                "No database configured: pass --database or set database.path in the config file",
            ));
        }
    };

    if let Some(progress) = progress {
        progress.finish();
    }

    formatter.print_summary(&RunSummary {
        counters: context.counters,
        dry_run: args.dry_run,
    })
}

fn run_sync<S: RecordStore>(
    store: &mut S,
    directory: &SourceDirectory,
    options: SyncOptions,
    progress: Option<&SyncProgress>,
    input: &SyncInput,
) -> Result<SyncContext> {
    let mut synchronizer = Synchronizer::new(store, directory).with_options(options);
    if let Some(progress) = progress {
        synchronizer = synchronizer.with_progress_callback(Arc::new(progress.callback()));
    }
    synchronizer.run(input)
}

pub async fn check_sources_command(
    env: Option<CatalogEnv>,
    token: Option<String>,
    database: Option<PathBuf>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let base_url = config.catalog_base_url(env);
    let env = env.unwrap_or_else(|| config.catalog_env());
    let token = token.or_else(|| config.catalog_token());

    let path = database_path(database, &config).ok_or_else(|| {
        SyncError::config_error(
            "No database configured: pass --database or set database.path in the config file",
        )
    })?;
    let store = SqliteStore::open(&path)?;

    info!("Checking reference sources against {} ({})", base_url, env);
    let client = CatalogClient::new(base_url, token)?;
    let checks = check_sources(&store, &config.source_directory(), &client).await?;

    OutputFormatter::new(format).print_source_checks(&checks)
}

pub async fn config_show_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let config_json = serde_json::to_string_pretty(&config)
        .map_err(|e| SyncError::config_error(format!("Failed to serialize config: {e}")))?;
    println!("{config_json}");
    Ok(())
}

pub async fn config_schema_command() -> Result<()> {
    let schema = schemars::schema_for!(SyncConfig);
    let schema_json = serde_json::to_string_pretty(&schema)
        .map_err(|e| SyncError::config_error(format!("Failed to serialize schema: {e}")))?;
    println!("{schema_json}");
    Ok(())
}
