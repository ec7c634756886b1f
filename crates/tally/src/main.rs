mod cli;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{eyre, WrapErr};

use tally_core::engine::{HttpEngineClient, SnapshotEngine, WalletEngine};
use tally_core::{HistoryConfig, TransactionHistory};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let api_token = generate_api_token();

    let engine = build_engine(&args)?;

    let network = engine.network_type().await.map_err(|err| {
        let message = format_engine_connect_error(&args.engine_url, &err.to_string());
        eyre!(message).wrap_err("while attempting to connect to the wallet engine")
    })?;
    let height = engine
        .blockchain_height()
        .await
        .context("read wallet blockchain height")?;
    tracing::info!(%network, height, "connected to wallet engine");

    let config = HistoryConfig {
        min_height: args.min_height,
        max_height: args.max_height.unwrap_or(u64::MAX),
    };
    if config.min_height >= config.max_height {
        return Err(eyre!(
            "--min-height ({}) must be below --max-height ({})",
            config.min_height,
            config.max_height
        ));
    }

    let history = Arc::new(TransactionHistory::with_config(engine, config));
    history
        .refresh()
        .await
        .context("initial transaction history refresh")?;

    if args.refresh_interval_secs > 0 {
        spawn_refresh_loop(
            history.clone(),
            Duration::from_secs(args.refresh_interval_secs),
        );
    } else {
        tracing::info!("background refresh disabled; use POST /api/v1/history/refresh");
    }

    let state = server::AppState {
        history,
        api_token: api_token.clone(),
    };

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let origin = format!("http://{}:{}", args.bind, args.port);
    let router = server::build_router(state, &origin);

    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0, so wallet history is reachable from the network");
    }

    println!();
    println!("  Tally is running:");
    println!("    URL:       http://{bind_addr}/api/v1/history");
    println!("    API token: {api_token}");
    println!();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("bind TCP listener")?;

    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run HTTP server")?;

    Ok(())
}

fn build_engine(args: &cli::Cli) -> eyre::Result<Arc<dyn WalletEngine>> {
    if let Some(path) = &args.snapshot {
        let engine = SnapshotEngine::from_path(path)
            .with_context(|| format!("load wallet snapshot {}", path.display()))?;
        return Ok(Arc::new(engine));
    }

    let client = HttpEngineClient::new(
        &args.engine_url,
        args.engine_user.as_deref(),
        args.engine_pass.as_deref(),
        args.engine_cookie_file.as_deref(),
        args.engine_requests_per_second,
        args.engine_batch_chunk_size,
    )
    .context("configure wallet engine client")?;
    Ok(Arc::new(client))
}

/// Refresh on a fixed cadence. Failures are logged by the history itself and
/// the previous collection stays in place until the next tick.
fn spawn_refresh_loop(history: Arc<TransactionHistory>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately and startup already refreshed.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Ok(stats) = history.refresh().await {
                tracing::debug!(records = stats.total(), "background refresh complete");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Random API token for this server session.
fn generate_api_token() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

fn format_engine_connect_error(engine_url: &str, source_error: &str) -> String {
    let mut lines = vec![
        format!("could not reach wallet engine at `{engine_url}`"),
        format!("engine error: {source_error}"),
    ];

    if source_error.contains("dns error") || source_error.contains("Could not resolve host") {
        lines.push("hint: hostname resolution failed; verify the engine hostname".into());
    } else if source_error.contains("Connection refused") || source_error.contains("connect") {
        lines.push(
            "hint: nothing is listening there; start the wallet RPC or pass --snapshot".into(),
        );
    } else if source_error.contains("401") || source_error.contains("403") {
        lines.push(
            "hint: authentication failed; verify --engine-user/--engine-pass or the cookie file"
                .into(),
        );
    } else if source_error.contains("404") {
        lines.push("hint: endpoint path is invalid; the JSON-RPC path is usually /json_rpc".into());
    }

    lines.join("\n")
}
