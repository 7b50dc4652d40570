use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "pinmap")]
#[command(about = "Pin the countries you want to visit on a terminal world map")]
#[command(version)]
pub struct Args {
    // Service
    /// Base URL of the trip-sharing service
    #[arg(long, env = "PINMAP_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// Bearer token for the signed-in user
    #[arg(long, env = "PINMAP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Timeout for each pin request (seconds)
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Retries for a failed pin delete before it is restored
    #[arg(long, default_value = "2")]
    pub delete_retries: u32,

    // Data
    /// Session snapshot with the signed-in user, trips and countries
    #[arg(long, env = "PINMAP_SESSION")]
    pub session: Option<PathBuf>,

    /// Country boundaries GeoJSON (defaults to the bundled dataset)
    #[arg(long)]
    pub boundaries: Option<PathBuf>,

    // Map
    /// Minimum zoom level
    #[arg(long, default_value = "1.19")]
    pub min_zoom: f64,

    // Debug
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
