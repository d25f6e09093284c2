//! msxfer — CLI front-end for the batch sender.
//!
//! Argument parsing and progress rendering are thin wrappers over
//! `msxfer_client`; the interesting engineering lives in the library.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use msxfer_client::{resolve_inputs, send_batch, ProgressListener, SendConfig};
use msxfer_core::{StubCodec, TransferState};

#[derive(Parser, Debug)]
#[command(name = "msxfer", version, about = "Send mzML/msz files to an msxfer-serve endpoint")]
struct Args {
    /// File or directory paths to send.
    paths: Vec<PathBuf>,

    /// Target host[:port]. Port defaults to the original CLI's 1319.
    target: String,

    /// Recurse into directories.
    #[arg(short, long)]
    recursive: bool,

    /// Concurrent uploads.
    #[arg(short, long, default_value_t = 4)]
    parallel: usize,
}

/// Parse `host` or `host:port`, defaulting the port to 1319 (matching the
/// original CLI's `parse_target`).
fn parse_target(target: &str) -> (String, u16) {
    match target.rsplit_once(':') {
        Some((host, port_str)) => match port_str.parse::<u16>() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (target.to_string(), 1319),
        },
        None => (target.to_string(), 1319),
    }
}

struct StderrProgressListener;

impl ProgressListener for StderrProgressListener {
    fn file_done(&self, index: usize, record: &msxfer_core::TransferRecord) {
        eprintln!("[{index}] {} -> {:?}", record.filename, record.state);
    }

    fn file_error(&self, index: usize, cause: &str) {
        eprintln!("[{index}] failed: {cause}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msxfer_client=info".into()),
        )
        .init();

    let args = Args::parse();
    let (host, port) = parse_target(&args.target);
    let base_url = format!("http://{host}:{port}");

    let file_paths = resolve_inputs(&args.paths, args.recursive)?;
    eprintln!(
        "Sending {} file(s) to {base_url} (parallel={})",
        file_paths.len(),
        args.parallel
    );

    let results = send_batch(
        Arc::new(StubCodec),
        &file_paths,
        &base_url,
        args.parallel,
        Arc::new(SendConfig::default()),
        Some(Arc::new(StderrProgressListener)),
    )
    .await;

    let ok = results
        .iter()
        .filter(|r| matches!(&r.record, Some(rec) if rec.state == TransferState::Done))
        .count();
    let fail = results.len() - ok;

    if fail > 0 {
        eprintln!("\n{ok} succeeded, {fail} failed");
        for result in &results {
            let failed = !matches!(&result.record, Some(rec) if rec.state == TransferState::Done);
            if failed {
                let detail = result
                    .error
                    .clone()
                    .or_else(|| result.record.as_ref().and_then(|r| r.error.clone()))
                    .unwrap_or_else(|| "unknown error".to_string());
                eprintln!("  - {}: {detail}", result.filename);
            }
        }
        std::process::exit(1);
    }

    eprintln!("\nAll {ok} file(s) transferred successfully.");
    Ok(())
}
