use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod bible;
mod config;
mod data;
mod error;
mod models;
mod session;
mod store;
mod tracker;
mod tui;

use app::App;
use config::Config;
use error::Result;
use session::Session;
use store::{LocalStore, UserStore};
use tui::{draw, handle_key_event};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Check for --export-journal flag (headless export, guest data)
    if args.len() >= 2 && args[1] == "--export-journal" {
        let path = if args.len() >= 3 {
            PathBuf::from(&args[2])
        } else {
            PathBuf::from("journal.md")
        };
        export_journal(&config, &path).await?;
        println!("Exported journal to {:?}", path);
        return Ok(());
    }

    // Initialize app
    let mut app = App::new(&config).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn export_journal(config: &Config, path: &PathBuf) -> Result<()> {
    let local = LocalStore::new(PathBuf::from(&config.data_dir));
    let journal = local.load_journal(&Session::guest()).await?;
    std::fs::write(path, journal.to_markdown())?;
    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Poll for completed chapter-text fetches
        app.poll_chapter_result();

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.input_mode, app.show_help) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
