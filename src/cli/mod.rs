use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{Board, BoardEvent, BoardOptions, Services};
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

use self::commands::{
    CardArgs, DeleteArgs, EditArgs, ExportArgs, ImportArgs, ListArgs, NewArgs, ThemeArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "promptdeck",
    version,
    about = "Prompt cards with tag filtering, placeholders and JSON import/export"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over PROMPTDECK_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over PROMPTDECK_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new card
    New(NewArgs),
    /// List cards, optionally filtered by text and tags (default)
    List(ListArgs),
    /// Show the tag cloud
    Tags,
    /// Print one card
    Show(CardArgs),
    /// Replace a card's text (from --text or stdin)
    Edit(EditArgs),
    /// Copy a card's text to the clipboard with placeholders resolved
    Copy(CardArgs),
    /// Open every URL on a card
    Open(CardArgs),
    /// Delete a card
    Delete(DeleteArgs),
    /// Replace all cards with the contents of a JSON file
    Import(ImportArgs),
    /// Write all cards to a dated JSON file
    Export(ExportArgs),
    /// List the available placeholders
    Placeholders,
    /// Show or toggle the theme preference
    Theme(ThemeArgs),
    /// Render a card's text as HTML
    Render(CardArgs),
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
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&config.storage)?;

    let services = Services::host(Arc::new(storage), config.markdown.enabled);
    let mut board = Board::open(BoardOptions::from_config(&config), services);
    let events = board.subscribe();

    let command = cli.command.unwrap_or(Commands::List(ListArgs::default()));
    let result = commands::execute(&mut board, command);
    report_notifications(&events);
    let output = result?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn report_notifications(events: &Receiver<BoardEvent>) {
    for event in events.try_iter() {
        if let BoardEvent::Notify(notification) = event {
            eprintln!("[{}] {}", notification.severity, notification.message);
        }
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
