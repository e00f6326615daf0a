//! omrs-sync CLI
//!
//! Command-line interface for importing OCL concept dictionaries into OpenMRS

mod commands;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use omrs_sync_core::{CatalogEnv, Result, TOKEN_ENV_VAR, init_tracing};
use std::io;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "omrs-sync")]
#[command(about = "Import OCL concept dictionary exports into an OpenMRS database")]
#[command(version = omrs_sync_core::VERSION)]
#[command(
    long_about = "omrs-sync reads the JSON-lines export of an OCL dictionary and creates\n\
the concepts, names, mappings, classes and reference sources that are missing\n\
from an OpenMRS concept dictionary. Existing rows are never modified.\n\
\n\
Examples:\n  \
omrs-sync sync --source-file sources.json --class-file classes.json\n  \
omrs-sync sync --concept-file concepts.json --mapping-file mappings.json\n  \
omrs-sync sync --concept-file concepts.json --retired\n  \
omrs-sync check-sources --env staging"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (.omrs-sync.json/.omrs-sync.toml/omrs-sync.yaml)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Generate shell completion script
    #[arg(
        long,
        value_enum,
        help = "Generate completion script for specified shell"
    )]
    generate_completion: Option<Shell>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize an OCL export into the database
    Sync {
        /// Concepts export (JSON lines)
        #[arg(long, help = "Concepts file (JSON lines)")]
        concept_file: Option<PathBuf>,

        /// Mappings export (JSON lines)
        #[arg(long, help = "Mappings file (JSON lines)")]
        mapping_file: Option<PathBuf>,

        /// Reference sources export (JSON lines)
        #[arg(long, help = "Reference sources file (JSON lines)")]
        source_file: Option<PathBuf>,

        /// Concept classes export (JSON lines)
        #[arg(long, help = "Concept classes file (JSON lines)")]
        class_file: Option<PathBuf>,

        /// Organization owning the imported dictionary
        #[arg(long, help = "OCL organization that owns the dictionary (e.g. CIEL)")]
        org_id: Option<String>,

        /// Source id of the imported dictionary
        #[arg(long, help = "OCL source id of the dictionary (e.g. CIEL)")]
        source_id: Option<String>,

        /// Only import the concept with this id
        #[arg(long, help = "Only import this concept (and its mappings)")]
        concept_id: Option<i64>,

        /// List retired concepts instead of importing
        #[arg(long, help = "List the retired concepts of the concept file and exit")]
        retired: bool,

        /// Target SQLite database
        #[arg(long, help = "SQLite database file (default: from config)")]
        database: Option<PathBuf>,

        /// Roll back all writes at the end of the run
        #[arg(long, help = "Run the import without keeping any changes")]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "human", help = "Output format for the summary")]
        format: OutputFormat,

        /// Show progress for long-running imports
        #[arg(long, help = "Show progress bars")]
        progress: bool,
    },

    /// Check that every local reference source exists in the OCL catalog
    CheckSources {
        /// OCL environment
        #[arg(long, help = "OCL environment: dev, staging or production")]
        env: Option<CatalogEnv>,

        /// OCL API token
        #[arg(long, env = TOKEN_ENV_VAR, hide_env_values = true, help = "OCL API token")]
        token: Option<String>,

        /// Target SQLite database
        #[arg(long, help = "SQLite database file (default: from config)")]
        database: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "human", help = "Output format")]
        format: OutputFormat,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    #[command(alias = "ver")]
    Version {
        /// Show detailed version information
        #[arg(long, help = "Show detailed version and build information")]
        detailed: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the JSON schema of the configuration file
    Schema,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON format for programmatic consumption
    Json,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.generate_completion {
        generate_completion_script(shell);
        return Ok(());
    }

    if !cli.no_color && std::env::var("NO_COLOR").is_err() {
        colored::control::set_override(true);
    } else {
        colored::control::set_override(false);
    }

    let log_level = match cli.verbose {
        0 => "omrs_sync=error",
        1 => "omrs_sync=warn",
        2 => "omrs_sync=info",
        3 => "omrs_sync=debug",
        _ => "omrs_sync=trace",
    };
    unsafe {
        std::env::set_var("RUST_LOG", log_level);
    }
    init_tracing();

    match run_command(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("omrs-sync failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn generate_completion_script(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Sync {
            concept_file,
            mapping_file,
            source_file,
            class_file,
            org_id,
            source_id,
            concept_id,
            retired,
            database,
            dry_run,
            format,
            progress,
        }) => {
            let args = commands::SyncArgs {
                files: omrs_sync_core::InputFiles {
                    concepts: concept_file,
                    mappings: mapping_file,
                    sources: source_file,
                    classes: class_file,
                },
                org_id,
                source_id,
                concept_id,
                retired,
                database,
                dry_run,
                format,
                progress,
            };
            commands::sync_command(args, cli.config).await
        }

        Some(Commands::CheckSources {
            env,
            token,
            database,
            format,
        }) => commands::check_sources_command(env, token, database, format, cli.config).await,

        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config_show_command(cli.config).await,
            ConfigAction::Schema => commands::config_schema_command().await,
        },

        Some(Commands::Version { detailed }) => {
            if detailed {
                println!("omrs-sync {}", omrs_sync_core::VERSION);
                println!("Build information:");
                println!("  Target: {}", std::env::consts::ARCH);
                println!("  OS: {}", std::env::consts::OS);
            } else {
                println!("{}", omrs_sync_core::VERSION);
            }
            Ok(())
        }

        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
