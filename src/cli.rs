// Media Catalog CLI binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use media_catalog::catalog::{Catalog, SqliteCatalog};
use media_catalog::config::Config;
use media_catalog::constants::{CONFIG_FILENAME, DB_FILENAME};
use media_catalog::events::LogSink;
use media_catalog::index::{IndexOptions, IndexStatus, Indexer};
use media_catalog::maintain::Enricher;
use media_catalog::media::{self, related_files, MediaFile};

#[derive(Parser)]
#[command(name = "mediacat")]
#[command(about = "Index and enrich a catalog of photos and videos", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database file
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index new and modified files below the originals folder
    Index {
        /// Subfolder of originals (defaults to all)
        path: Option<String>,
        /// Re-index files even if unchanged
        #[arg(long)]
        rescan: bool,
        /// Number of index workers
        #[arg(short, long)]
        workers: Option<usize>,
        /// Don't group "name (1).jpg" with "name.jpg"
        #[arg(long)]
        no_stack_sequences: bool,
    },

    /// Refine records that changed since they were last checked
    Optimize {
        /// Maximum records to check
        #[arg(long, default_value = "10000")]
        limit: i64,
    },

    /// Light maintenance pass over all records
    Maintain {
        /// Maximum records to check
        #[arg(long, default_value = "10000")]
        limit: i64,
    },

    /// Show a catalog record as JSON
    Show {
        /// Photo ID
        id: i64,
    },

    /// Print kind and related files for each path
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Index { path, rescan, workers, no_stack_sequences } => {
            cmd_index(config, cli.catalog, path, rescan, workers, no_stack_sequences)
        }
        Commands::Optimize { limit } => cmd_optimize(config, cli.catalog, limit),
        Commands::Maintain { limit } => cmd_maintain(config, cli.catalog, limit),
        Commands::Show { id } => cmd_show(config, cli.catalog, id),
        Commands::Classify { files } => cmd_classify(config, files),
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "mediacat")
}

/// Explicit --config, else the user config dir, else ./mediacat.toml
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        return Ok(Config::load(&path)?);
    }

    let candidates = [
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME)),
        Some(PathBuf::from(CONFIG_FILENAME)),
    ];
    for candidate in candidates.into_iter().flatten() {
        if candidate.is_file() {
            log::debug!("CLI: using config {}", candidate.display());
            return Ok(Config::load(&candidate)?);
        }
    }

    Ok(Config::default())
}

fn catalog_path(config: &Config, catalog: Option<PathBuf>) -> PathBuf {
    catalog
        .or_else(|| config.catalog_path.clone())
        .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(DB_FILENAME)))
        .unwrap_or_else(|| media_catalog::db::get_db_path(&config.originals_path))
}

fn open_catalog(config: &Config, catalog: Option<PathBuf>) -> Result<Arc<SqliteCatalog>> {
    let path = catalog_path(config, catalog);
    log::debug!("CLI: catalog {}", path.display());
    Ok(Arc::new(SqliteCatalog::open(&path, config.estimate.distance)?))
}

fn cmd_index(
    mut config: Config,
    catalog: Option<PathBuf>,
    path: Option<String>,
    rescan: bool,
    workers: Option<usize>,
    no_stack_sequences: bool,
) -> Result<()> {
    if let Some(workers) = workers {
        config.workers = workers;
    }
    config.validate()?;

    if !config.originals_path.is_dir() {
        anyhow::bail!("Originals folder does not exist: {}", config.originals_path.display());
    }

    let catalog = open_catalog(&config, catalog)?;
    let mut opts = IndexOptions::from_config(&config);
    opts.path = path.unwrap_or_default();
    opts.rescan |= rescan;
    if no_stack_sequences {
        opts.stack_sequences = false;
    }

    println!("Indexing {}", config.originals_path.join(&opts.path).display());

    let indexer = Indexer::new(config, catalog.clone(), Arc::new(LogSink));
    let summary = indexer.start(opts)?;

    println!();
    match summary.status {
        IndexStatus::Completed => println!("Index complete:"),
        IndexStatus::Canceled => println!("Index canceled:"),
        IndexStatus::Failed => println!("Index failed:"),
    }
    println!("  Groups dispatched: {}", summary.dispatched);
    println!("  Groups indexed:    {}", summary.indexed);
    println!("  Files indexed:     {}", summary.files_indexed);
    println!("  Failed:            {}", summary.failed);
    println!("  Photos in catalog: {}", catalog.count_photos()?);

    Ok(())
}

fn cmd_optimize(config: Config, catalog: Option<PathBuf>, limit: i64) -> Result<()> {
    let catalog = open_catalog(&config, catalog)?;
    let enricher = Enricher::new(catalog, config.estimate.clone());
    let summary = enricher.optimize_all(limit, config.stack_meta, config.stack_uuid)?;

    println!("Optimize complete:");
    println!("  Checked:  {}", summary.checked);
    println!("  Updated:  {}", summary.updated);
    println!("  Failed:   {}", summary.failed);
    Ok(())
}

fn cmd_maintain(config: Config, catalog: Option<PathBuf>, limit: i64) -> Result<()> {
    let catalog = open_catalog(&config, catalog)?;
    let enricher = Enricher::new(catalog, config.estimate.clone());
    let summary = enricher.maintain_all(limit)?;

    println!("Maintain complete:");
    println!("  Checked:  {}", summary.checked);
    println!("  Updated:  {}", summary.updated);
    println!("  Failed:   {}", summary.failed);
    Ok(())
}

fn cmd_show(config: Config, catalog: Option<PathBuf>, id: i64) -> Result<()> {
    let catalog = open_catalog(&config, catalog)?;
    let photo = catalog
        .find_photo(id)?
        .ok_or_else(|| anyhow::anyhow!("Photo {} not found", id))?;
    let files = catalog.files_for_photo(id)?;

    let out = serde_json::json!({
        "photo": photo,
        "files": files,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_classify(config: Config, files: Vec<PathBuf>) -> Result<()> {
    let roots = config.roots();

    for path in files {
        let kind = match media::classify(&path) {
            Ok(kind) => kind,
            Err(e) => {
                println!("{}: {}", path.display(), e);
                continue;
            }
        };

        let file = Arc::new(MediaFile::new(&path, Arc::clone(&roots))?);
        println!(
            "{}: {} ({}, {})",
            path.display(),
            kind.as_str(),
            file.file_type().as_str(),
            file.mime()
        );

        if !file.is_media() {
            continue;
        }

        match related_files(&file, config.stack_sequences) {
            Ok(group) => {
                for member in &group.files {
                    let marker = if group.is_main(member) { "*" } else { " " };
                    println!("  {} {}", marker, member.path().display());
                }
            }
            Err(e) => println!("  {}", e),
        }
    }

    Ok(())
}
