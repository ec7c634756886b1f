use std::path::PathBuf;

use clap::Parser;

/// Tally: local wallet transaction history cache with a REST API.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Wallet engine JSON-RPC URL.
    #[arg(long, default_value = "http://127.0.0.1:18082/json_rpc", env = "TALLY_ENGINE_URL")]
    pub engine_url: String,

    /// Engine RPC username.
    #[arg(long, env = "TALLY_ENGINE_USER")]
    pub engine_user: Option<String>,

    /// Engine RPC password.
    #[arg(long, env = "TALLY_ENGINE_PASS")]
    pub engine_pass: Option<String>,

    /// Cookie file holding `username:password` for the engine RPC.
    #[arg(long, env = "TALLY_ENGINE_COOKIE_FILE")]
    pub engine_cookie_file: Option<PathBuf>,

    /// Maximum outbound engine requests per second (unlimited if omitted).
    #[arg(long)]
    pub engine_requests_per_second: Option<u32>,

    /// Maximum calls per JSON-RPC batch request.
    #[arg(long, default_value = "50")]
    pub engine_batch_chunk_size: usize,

    /// Serve history from a JSON wallet snapshot instead of a live engine.
    #[arg(long, env = "TALLY_SNAPSHOT", conflicts_with = "engine_user")]
    pub snapshot: Option<PathBuf>,

    /// Only include confirmed entries above this height.
    #[arg(long, default_value = "0")]
    pub min_height: u64,

    /// Only include confirmed entries at or below this height.
    #[arg(long)]
    pub max_height: Option<u64>,

    /// Seconds between background refreshes; 0 disables them.
    #[arg(long, default_value = "30")]
    pub refresh_interval_secs: u64,

    /// Address to bind the web server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "3090")]
    pub port: u16,
}
