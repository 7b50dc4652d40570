use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cli::Args;
use crate::error::{PinmapError, Result};
use crate::map::{Route, DEFAULT_MIN_ZOOM};
use crate::session::SessionSnapshot;
use crate::sync::{Credential, RetryPolicy};

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub credential: Option<Credential>,
    pub session_path: PathBuf,
    pub boundaries: Option<PathBuf>,
    pub min_zoom: f64,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        if !args.min_zoom.is_finite() || args.min_zoom < 0.0 {
            return Err(PinmapError::Config(format!(
                "min zoom must be a non-negative number, got {}",
                args.min_zoom
            )));
        }
        if args.request_timeout_secs == 0 {
            return Err(PinmapError::Config(
                "request timeout must be at least one second".to_string(),
            ));
        }

        let credential = args
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Credential::new);

        Ok(Self {
            api_url: args.api_url.clone(),
            credential,
            session_path: args
                .session
                .clone()
                .unwrap_or_else(SessionSnapshot::default_path),
            boundaries: args.boundaries.clone(),
            min_zoom: args.min_zoom,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            retry: RetryPolicy {
                max_retries: args.delete_retries,
                ..RetryPolicy::default()
            },
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            credential: None,
            session_path: SessionSnapshot::default_path(),
            boundaries: None,
            min_zoom: DEFAULT_MIN_ZOOM,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    /// Where to go after the map closes
    route: Mutex<Option<Route>>,
    /// Shutdown flag
    pub should_quit: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(settings: Settings) -> Arc<Self> {
        Arc::new(Self {
            settings,
            route: Mutex::new(None),
            should_quit: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Leave the map for another page of the app
    pub fn navigate(&self, route: Route) {
        *self.route.lock() = Some(route);
        self.quit();
    }

    pub fn take_route(&self) -> Option<Route> {
        self.route.lock().take()
    }

    /// Signal shutdown
    pub fn quit(&self) {
        self.should_quit.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown requested
    pub fn is_quitting(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }
}
