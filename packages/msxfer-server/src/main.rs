//! msxfer-serve — HTTP receiver for mzML/msz file transfers.
//!
//! Exposes `/v1/upload`, `/v1/transfer/{id}/status` and `/v1/health`,
//! backed by an in-memory transfer registry and a periodic sweep task
//! that evicts terminal records past their TTL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use msxfer_core::StubCodec;
use msxfer_server::state::{AppState, ServerConfig, StoreAs};
use msxfer_server::{build_router, default_authenticator};

#[derive(Parser, Debug)]
#[command(name = "msxfer-serve", version, about = "mzML/msz transfer receiver")]
struct Args {
    /// Host to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "MSXFER_HOST")]
    host: String,

    /// Port to listen on. The original CLI's default.
    #[arg(long, default_value_t = 1319, env = "MSXFER_PORT")]
    port: u16,

    /// Directory to write received and converted files into.
    #[arg(long, env = "MSXFER_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Storage mode: keep the received `.msz` form, or decompress to
    /// `.mzML` before marking a transfer done.
    #[arg(long, default_value = "msz", env = "MSXFER_STORE_AS")]
    store_as: String,

    /// Shared API key. When set, all non-health routes require it via
    /// `Authorization: Bearer <key>` or `?api_key=<key>`.
    #[arg(long, env = "MSXFER_API_KEY")]
    api_key: Option<String>,

    /// How many chunks elapse between throttled `bytes_received` updates.
    #[arg(long, default_value_t = 16, env = "MSXFER_PROGRESS_UPDATE_CHUNKS")]
    progress_update_chunks: u32,

    /// Terminal records older than this many seconds are evicted.
    #[arg(long, default_value_t = 300, env = "MSXFER_REGISTRY_TTL_SECS")]
    registry_ttl_secs: i64,

    /// Interval between registry sweep runs, in seconds.
    #[arg(long, default_value_t = 60, env = "MSXFER_SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msxfer_server=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let store_as: StoreAs = args
        .store_as
        .parse()
        .unwrap_or_else(|e| panic!("invalid --store-as value: {e}"));

    std::fs::create_dir_all(&args.output_dir)
        .unwrap_or_else(|e| panic!("failed to create output dir {:?}: {e}", args.output_dir));

    let config = ServerConfig {
        store_as,
        progress_update_chunks: args.progress_update_chunks,
        registry_ttl_secs: args.registry_ttl_secs,
    };

    let auth = default_authenticator(args.api_key.clone());
    if args.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::info!("authentication disabled (no-auth mode)");
    }

    let state = AppState::new(args.output_dir.clone(), config, auth, Arc::new(StubCodec));

    let sweep_state = state.clone();
    let sweep_interval = args.sweep_interval_secs;
    let ttl_secs = args.registry_ttl_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            let max_age = Duration::from_secs(ttl_secs.max(0) as u64);
            let removed = sweep_state.registry.sweep(max_age);
            if removed > 0 {
                tracing::info!(removed, "swept expired transfer records");
            }
        }
    });

    let app = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!(addr = %addr, store_as = store_as.as_str(), output_dir = ?args.output_dir, "msxfer-serve starting");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app).await.expect("server error");
}
