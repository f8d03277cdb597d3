use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

use self::commands::{
    AddArgs, CategoryArgs, ExportArgs, HistoryArgs, ImportArgs, ListArgs, MoveArgs, RemoveArgs,
    SearchArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "markshelf",
    version,
    about = "Bookmark shelf with browser import and a two-level category library"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over MARKSHELF_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over MARKSHELF_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a browser bookmark export (HTML) or a JSON backup
    Import(ImportArgs),
    /// Export the library as Netscape HTML or JSON
    Export(ExportArgs),
    /// Search bookmarks by text, `title:`, `cat:` and `site:`
    Search(SearchArgs),
    /// Print the library as an outline (default)
    List(ListArgs),
    /// Save a single bookmark
    Add(AddArgs),
    /// Delete a bookmark by id
    Remove(RemoveArgs),
    /// Move a bookmark to another category / sub-category
    Move(MoveArgs),
    /// Manage categories
    Category(CategoryArgs),
    /// Show recent imports
    History(HistoryArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::List(ListArgs::default()));
    match command {
        Commands::Import(args) => commands::import_bookmarks(config, storage, args),
        Commands::Export(args) => commands::export_bookmarks(config, storage, args),
        Commands::Search(args) => commands::search_bookmarks(config, storage, args),
        Commands::List(args) => commands::list_library(storage, args),
        Commands::Add(args) => commands::add_bookmark(config, storage, args),
        Commands::Remove(args) => commands::remove_bookmark(storage, args),
        Commands::Move(args) => commands::move_bookmark(config, storage, args),
        Commands::Category(args) => commands::handle_category_command(storage, args),
        Commands::History(args) => commands::show_history(storage, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
