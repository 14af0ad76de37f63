use airdee_core::{ChatSession, Config, ThemeStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod commands;
mod handler;
mod server;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "airdee")]
#[command(version, about = "Erdee chat assistant: terminal chat, webhook proxy and vector search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat in the terminal (default)
    Chat,
    /// Ask one question through the chat webhook
    Ask {
        /// Your question
        question: String,
        /// Print the rendered HTML fragment instead of the raw answer
        #[arg(long)]
        html: bool,
    },
    /// Render assistant text to HTML
    Render {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Nearest-vector search, e.g. `airdee search '[0.1, 0.2]'`
    Search {
        /// JSON array of numbers
        vector: String,
    },
    /// Fetch one article and its vector
    Article {
        uuid: String,
    },
    /// Answer a question about one article with Azure OpenAI
    Answer {
        uuid: String,
        question: String,
    },
    /// Serve the browser widget, the /ask proxy and the vector search tool
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    // The terminal UI owns stderr, so it logs to a file instead.
    if matches!(command, Commands::Chat) {
        init_file_logging()?;
    } else {
        init_stderr_logging()?;
    }

    let config = Config::from_env()?;

    match command {
        Commands::Chat => run_chat(&config).await,
        Commands::Ask { question, html } => commands::ask(&config, &question, html).await,
        Commands::Render { file } => commands::render(file.as_deref()),
        Commands::Search { vector } => commands::search(&config, &vector).await,
        Commands::Article { uuid } => commands::article(&config, &uuid).await,
        Commands::Answer { uuid, question } => commands::answer(&config, &uuid, &question).await,
        Commands::Serve => server::serve(&config).await,
    }
}

fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("airdee=info".parse()?)
        .add_directive("airdee_core=info".parse()?))
}

fn init_stderr_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn init_file_logging() -> Result<()> {
    let dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("airdee");
    fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("airdee.log"))?;

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

async fn run_chat(config: &Config) -> Result<()> {
    let session = ChatSession::create(config, ThemeStore::open_default()?);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(session, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;

    app.into_session().teardown();
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
