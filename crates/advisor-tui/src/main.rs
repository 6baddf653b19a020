use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use advisor_core::{Config, Dispatcher, Session};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const LOG_ENV: &str = "ADVISOR_LOG";
const DEFAULT_LOG_DIRECTIVE: &str = "advisor_core=info,advisor_tui=info";

#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Chat with a L'Oréal product advisor backed by OpenAI")]
struct Cli {
    /// Path to a config file (defaults to <config dir>/advisor/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the advisor's reply
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?.with_env_overrides(),
        None => Config::load()?,
    };

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let _guard = init_file_logging()?;
            tracing::info!("advisor v{} starting", env!("CARGO_PKG_VERSION"));
            run_tui(Dispatcher::from_config(&config)).await
        }
        Commands::Ask { question } => {
            init_stderr_logging();
            ask(Dispatcher::from_config(&config), &question).await
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// The TUI owns the terminal, so logs go to a file next to the config.
fn init_file_logging() -> Result<WorkerGuard> {
    let log_dir = Config::get_config_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::never(log_dir, "advisor.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

async fn ask(dispatcher: Dispatcher, question: &str) -> Result<()> {
    let mut session = Session::new(dispatcher);
    match session.send(question).await {
        Some(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        None => bail!("Nothing to ask: the question is empty"),
    }
}

async fn run_tui(dispatcher: Dispatcher) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(dispatcher);
    let mut events = EventHandler::new();
    let tx = events.sender();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| ui::render(&mut app, frame)) {
            break Err(e.into());
        }
        if app.should_quit {
            break Ok(());
        }

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event, &tx),
            None => break Ok(()),
        }
    };

    tui::restore()?;
    result
}
