mod app;
mod cli;
mod error;
mod geo;
mod map;
mod session;
mod sync;
mod tui;

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::app::{AppState, Settings};
use crate::cli::Args;
use crate::error::Result;
use crate::geo::Geocoder;
use crate::map::{MapView, Viewport};
use crate::session::SessionSnapshot;
use crate::sync::{PinClient, SyncAdapter};
use crate::tui::TuiApp;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing (to a file, the TUI owns the terminal)
    let log_path = init_tracing(args.verbose);

    info!("pinmap v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_args(&args)?;
    let state = AppState::new(settings);

    // Set up graceful shutdown
    let shutdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Received Ctrl-C, shutting down...");
        shutdown_state.quit();
    });

    // Run the application
    if let Err(e) = run(Arc::clone(&state)).await {
        error!("Application error: {}", e);
        if let Some(path) = log_path {
            eprintln!("pinmap: {} (see {})", e, path.display());
        }
        return Err(e);
    }

    // Hand the destination to whoever launched the map
    if let Some(route) = state.take_route() {
        println!("{}", route.path());
    }

    info!("pinmap shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber writing to the log file
fn init_tracing(verbose: bool) -> Option<PathBuf> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let dir = dirs::cache_dir()
        .map(|dir| dir.join("pinmap"))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join("pinmap.log");

    let file = match fs::create_dir_all(&dir).and_then(|_| File::create(&path)) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("pinmap: logging disabled, cannot open {}: {}", path.display(), e);
            return None;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    Some(path)
}

/// Main application loop
async fn run(state: Arc<AppState>) -> Result<()> {
    let settings = &state.settings;
    info!(
        api_url = %settings.api_url,
        session = %settings.session_path.display(),
        signed_in = settings.credential.is_some(),
        min_zoom = settings.min_zoom,
        "Starting session"
    );

    // Load data
    let geocoder = match &settings.boundaries {
        Some(path) => Geocoder::from_path(path)?,
        None => Geocoder::embedded()?,
    };
    let snapshot = SessionSnapshot::load(&settings.session_path)?;
    if snapshot.countries.is_empty() {
        warn!("Country directory is empty, popups will have no trip links");
    }
    if snapshot.signed_in_user.is_some() && settings.credential.is_none() {
        warn!("Signed in without a token, the service may refuse pin requests");
    }

    // Initialize services
    let client = PinClient::new(
        &settings.api_url,
        settings.credential.clone(),
        settings.request_timeout,
    )?;
    let (sync, mut event_rx) = SyncAdapter::new(client, settings.retry);

    let mut view = MapView::new(
        Arc::new(geocoder),
        snapshot,
        sync,
        Viewport::default(),
        settings.min_zoom,
    );
    view.on_style_loaded();

    // Initialize TUI
    let mut tui = TuiApp::new(Arc::clone(&state))?;

    info!("TUI started - press 'q' to quit");

    // Main event loop
    loop {
        // Handle TUI input
        let should_quit = tui.handle_input(&mut view)?;
        if should_quit || state.is_quitting() {
            break;
        }

        // Apply finished pin requests
        while let Ok(event) = event_rx.try_recv() {
            view.apply_sync_event(event);
        }

        // Draw TUI
        tui.draw(&mut view)?;

        // Small delay to prevent busy loop
        tokio::time::sleep(tokio::time::Duration::from_millis(16)).await; // ~60 FPS
    }

    // Clean shutdown
    let pending = view.pins().pending_requests();
    if pending > 0 {
        warn!(pending, "Leaving with unanswered pin requests");
    }
    tui.cleanup();

    Ok(())
}
