//! Server-wide configuration and shared state, mirroring the
//! `RelayConfig`/`RelayState` split the teacher keeps between CLI-derived
//! settings and the live, clonable handle passed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use msxfer_core::{CodecAdapter, TransferRegistry};

use crate::auth::Authenticator;

/// How received bodies are ultimately stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAs {
    /// Keep the on-the-wire `.msz` form as the final artifact.
    Msz,
    /// Decompress to `.mzML` on a worker thread before marking `done`.
    MzMl,
}

impl StoreAs {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreAs::Msz => "msz",
            StoreAs::MzMl => "mzml",
        }
    }
}

impl std::str::FromStr for StoreAs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msz" => Ok(StoreAs::Msz),
            "mzml" => Ok(StoreAs::MzMl),
            other => Err(format!("invalid store-as mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub store_as: StoreAs,
    /// How many chunks elapse between throttled `bytes_received` updates.
    pub progress_update_chunks: u32,
    /// Records in a terminal state older than this are swept.
    pub registry_ttl_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            store_as: StoreAs::Msz,
            progress_update_chunks: 16,
            registry_ttl_secs: 300,
        }
    }
}

/// Shared, cheaply-clonable application state handed to every axum
/// handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TransferRegistry>,
    pub codec: Arc<dyn CodecAdapter>,
    pub auth: Arc<dyn Authenticator>,
    pub config: Arc<ServerConfig>,
    pub output_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(
        output_dir: PathBuf,
        config: ServerConfig,
        auth: Arc<dyn Authenticator>,
        codec: Arc<dyn CodecAdapter>,
    ) -> Self {
        Self {
            registry: Arc::new(TransferRegistry::new()),
            codec,
            auth,
            config: Arc::new(config),
            output_dir: Arc::new(output_dir),
        }
    }
}
