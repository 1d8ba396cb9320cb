//! javagraph CLI - Java code graph importer
//!
//! This binary provides the command-line interface for building the entity
//! graph out of an extracted repository.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use javagraph_core::config::Config;
use javagraph_importer::{
    import_group, initialize_database, ArtifactGroup, ArtifactOutcome, ImportReport,
};
use javagraph_storage::{create_and_initialize_store, GraphStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "javagraph")]
#[command(about = "Import extracted Java artifacts into a cross-referenced entity graph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the store and create the PRIMITIVES and UNKNOWNS artifacts
    InitializeDb,
    /// Import every artifact under <input>/libraries
    AddLibraries(ImportArgs),
    /// Import every artifact under <input>/jars
    AddJars(ImportArgs),
    /// Import every artifact under <input>/projects
    AddProjects(ImportArgs),
}

#[derive(Args, Debug, Default)]
struct ImportArgs {
    /// Root of the extracted repository
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Number of concurrent import workers
    #[arg(short, long, value_name = "N")]
    threads: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::InitializeDb) => initialize_db(cli.config.as_deref()).await,
        Some(Commands::AddLibraries(args)) => {
            import(cli.config.as_deref(), ArtifactGroup::Libraries, args).await
        }
        Some(Commands::AddJars(args)) => {
            import(cli.config.as_deref(), ArtifactGroup::Jars, args).await
        }
        Some(Commands::AddProjects(args)) => {
            import(cli.config.as_deref(), ArtifactGroup::Projects, args).await
        }
        None => {
            println!("Run 'javagraph initialize-db' to prepare the store, or --help for more options");
            Ok(())
        }
    }
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over the level picked by `--verbose`.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "javagraph={level},javagraph_core={level},javagraph_storage={level},javagraph_importer={level}"
        ))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    Ok(())
}

/// Load and validate configuration, applying command-line overrides
fn load_config(config_path: Option<&Path>, args: &ImportArgs) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if let Some(input) = &args.input {
        config.repository.input_path = input.clone();
    }
    if let Some(threads) = args.threads {
        config.importer.thread_count = threads;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn open_store(config: &Config) -> Result<Arc<dyn GraphStore>> {
    create_and_initialize_store(&config.storage)
        .await
        .with_context(|| format!("Failed to open {} store", config.storage.provider))
}

async fn initialize_db(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, &ImportArgs::default())?;
    let store = open_store(&config).await?;

    info!(provider = %config.storage.provider, "Initializing database");
    initialize_database(store.as_ref())
        .await
        .context("Failed to initialize database")?;

    if config.storage.provider == "memory" {
        warn!("The memory store is discarded when this process exits");
    }
    println!("Database initialized");
    Ok(())
}

async fn import(config_path: Option<&Path>, group: ArtifactGroup, args: ImportArgs) -> Result<()> {
    let config = load_config(config_path, &args)?;
    let store = open_store(&config).await?;

    // Nothing survives from an earlier run of the memory store
    if config.storage.provider == "memory" {
        info!("Memory store starts empty, initializing it first");
        initialize_database(store.as_ref())
            .await
            .context("Failed to initialize database")?;
    }

    let spinner = create_spinner(group);
    let outcome = import_group(&config, store, group).await;
    spinner.finish_and_clear();

    // Failures are logged and reported, never turned into an exit code
    match outcome {
        Ok(report) => print_summary(group, &report),
        Err(e) => error!(group = %group, "Import failed: {e}"),
    }
    Ok(())
}

/// Create a spinner shown while a group imports
fn create_spinner(group: ArtifactGroup) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {msg}")
            .map_err(|e| error!("Failed to set progress bar style: {}", e))
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Importing {group}"));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn summary_lines(report: &ImportReport) -> Vec<String> {
    report
        .stages()
        .iter()
        .map(|stage| {
            format!(
                "{:<10} completed {:>4}  skipped {:>4}  failed {:>4}  entities {:>8}  relations {:>8}  issues {:>6}  {:>7} ms",
                stage.stage().to_string(),
                stage.completed(),
                stage.skipped(),
                stage.failed(),
                stage.entities(),
                stage.relations(),
                stage.issues(),
                stage.elapsed_ms(),
            )
        })
        .collect()
}

fn print_summary(group: ArtifactGroup, report: &ImportReport) {
    println!("Imported {group}");
    for line in summary_lines(report) {
        println!("  {line}");
    }
    for stage in report.stages() {
        for artifact in stage.artifacts() {
            if let ArtifactOutcome::Failed(reason) = &artifact.outcome {
                println!("  {} failed in {}: {reason}", artifact.name, stage.stage());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parses_import_command_with_overrides() {
        let cli = Cli::try_parse_from([
            "javagraph",
            "--verbose",
            "add-jars",
            "--input",
            "/data/repo",
            "--threads",
            "8",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::AddJars(args)) => {
                assert_eq!(args.input, Some(PathBuf::from("/data/repo")));
                assert_eq!(args.threads, Some(8));
            }
            _ => panic!("expected add-jars"),
        }
    }

    #[test]
    fn test_parses_initialize_db() {
        let cli = Cli::try_parse_from(["javagraph", "initialize-db", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::InitializeDb)));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn test_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["javagraph", "add-everything"]).is_err());
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[importer]\nthread_count = 2\n\n[repository]\ninput_path = \"/from/file\"\n",
        )
        .unwrap();

        let args = ImportArgs {
            input: Some(PathBuf::from("/from/flag")),
            threads: Some(6),
        };
        let config = load_config(Some(&path), &args).unwrap();
        assert_eq!(config.repository.input_path, PathBuf::from("/from/flag"));
        assert_eq!(config.importer.thread_count, 6);
    }

    #[test]
    fn test_zero_threads_is_rejected() {
        let temp = TempDir::new().unwrap();
        let args = ImportArgs {
            input: None,
            threads: Some(0),
        };
        assert!(load_config(Some(&temp.path().join("missing.toml")), &args).is_err());
    }

    #[tokio::test]
    async fn test_import_of_empty_repository_succeeds() {
        let temp = TempDir::new().unwrap();
        let args = ImportArgs {
            input: Some(temp.path().to_path_buf()),
            threads: Some(1),
        };
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[storage]\nprovider = \"memory\"\n").unwrap();

        import(Some(&config_path), ArtifactGroup::Projects, args)
            .await
            .unwrap();
    }
}
