mod app;
mod cli;
mod client;
mod config;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use app::{App, Screen};
use client::{CatalogClient, EmbeddedClient, HttpClient};
use config::TuiConfig;
use storefront_core::{create_adapters, sync_all, CatalogStore, DEFAULT_PAGE_SIZE};

/// Terminal storefront and CLI for storefront-feed.
///
/// Without a subcommand, launches the interactive product browser. Use
/// subcommands (collections, page, feed) for scripting.
///
/// Output is auto-JSON when stdout is piped. Force with --json.
#[derive(Parser, Debug)]
#[command(name = "storefront-tui", version)]
struct Args {
    /// Connect to a remote storefront-feed server instead of the embedded catalog
    #[arg(long, global = true, env = "STOREFRONT_URL")]
    url: Option<String>,

    /// Skip the demo collections in the embedded catalog
    #[arg(long, global = true)]
    no_seed: bool,

    /// Force JSON output (auto-enabled when stdout is piped)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch the interactive storefront
    Tui,

    /// List collections with their product counts
    Collections,

    /// Fetch a single page of a collection
    Page {
        collection: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },

    /// Load a collection through the feed loader until it ends
    Feed {
        collection: String,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // stdout belongs to the UI and to JSON output
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = TuiConfig::load();
    let json = cli::use_json(args.json);

    let result = match create_client(&args, &config).await {
        Ok(client) => match &args.command {
            None | Some(Command::Tui) => run_tui(client, &config).await,
            Some(cmd) => run_cli(cmd, client, &config, json).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        cli::handle_error(e, json);
    }
}

async fn run_cli(
    cmd: &Command,
    client: Arc<dyn CatalogClient>,
    config: &TuiConfig,
    json: bool,
) -> Result<()> {
    match cmd {
        Command::Collections => cli::collections(client.as_ref(), json).await,
        Command::Page {
            collection,
            page,
            page_size,
        } => cli::page(client.as_ref(), collection, *page, *page_size, json).await,
        Command::Feed {
            collection,
            max_pages,
        } => cli::feed(client, collection, config.feed.clone(), *max_pages, json).await,
        Command::Tui => run_tui(client, config).await,
    }
}

async fn create_client(args: &Args, config: &TuiConfig) -> Result<Arc<dyn CatalogClient>> {
    let url = args.url.clone().or(config.url.clone());
    if let Some(url) = url {
        info!(url = %url, "Connecting to remote server");
        return Ok(Arc::new(HttpClient::new(&url)?));
    }

    info!("Starting embedded catalog");
    let store = CatalogStore::new();
    if !args.no_seed {
        store.seed_example();
        info!("Seeded demo collections");
    }

    match create_adapters(&config.adapter) {
        Ok(adapters) => {
            let added = sync_all(&store, &adapters).await;
            info!(adapters = adapters.len(), added, "Adapters synced");
        }
        Err(e) => {
            warn!(error = %e, "Failed to create adapters");
        }
    }

    Ok(Arc::new(EmbeddedClient::new(store)))
}

async fn run_tui(client: Arc<dyn CatalogClient>, config: &TuiConfig) -> Result<()> {
    let mut app = App::new(client, config.feed.clone());

    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    terminal.draw(|frame| ui::draw(frame, &app))?;
    app.load_collections().await;

    let result = run_loop(&mut terminal, &mut app).await;

    app.go_back();
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        app.viewport_rows = ui::list_rows(terminal.size()?.height);
        app.tick();
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key).await;
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_up(),
        KeyCode::Down | KeyCode::Char('j') => app.move_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown | KeyCode::Char(' ') => app.page_down(),
        KeyCode::Enter => app.open_selected().await,
        KeyCode::Backspace | KeyCode::Char('b') | KeyCode::Esc if app.screen == Screen::Feed => {
            app.go_back()
        }
        KeyCode::Char('m') => app.load_more(),
        KeyCode::Char('r') => app.retry(),
        _ => {}
    }
}
