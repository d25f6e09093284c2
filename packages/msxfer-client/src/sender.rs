//! Single-file sender: classify, stream, upload, and poll to a terminal
//! state. Grounds the generator-based streaming-with-progress-callback
//! shape of the original's `_counting_generator`/`_file_chunk_generator`
//! in an async `reqwest::Body::wrap_stream` fed by a blocking producer
//! thread, since the codec adapter's streaming surface is itself
//! synchronous (`CodecAdapter::compress_stream` returns a blocking
//! iterator).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use msxfer_core::{CodecAdapter, FileKind, TransferRecord, TransferState};
use reqwest::Client;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;
use crate::progress::ProgressListener;

/// Client-tunable parameters for a single transfer. Defaults mirror the
/// original's `send_file`/`_poll_status` constants.
#[derive(Debug, Clone)]
pub struct SendConfig {
    pub chunk_size: usize,
    /// Overall request timeout (connect + body streaming).
    pub request_timeout: Duration,
    /// Per-poll HTTP request timeout.
    pub poll_request_timeout: Duration,
    /// How long without observable progress before polling gives up.
    pub poll_no_progress_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_048_576,
            request_timeout: Duration::from_secs(3600),
            poll_request_timeout: Duration::from_secs(10),
            poll_no_progress_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Send a single file to `base_url` and drive it to a terminal state,
/// reporting progress through `listener` at position `index` within a
/// batch (or 0 for a standalone send).
pub async fn send_file(
    codec: Arc<dyn CodecAdapter>,
    path: &Path,
    base_url: &str,
    config: &SendConfig,
    listener: Arc<dyn ProgressListener>,
    index: usize,
) -> Result<TransferRecord, ClientError> {
    let transfer_id = Uuid::new_v4().to_string();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let kind = codec.detect(path)?;

    let total_bytes = match kind {
        FileKind::MzMl => None,
        _ => std::fs::metadata(path).ok().map(|m| m.len()),
    };
    listener.file_started(index, path, total_bytes);

    let body = build_body(codec, path, kind, config.chunk_size, listener.clone(), index)?;

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(config.request_timeout)
        .build()?;

    let source_format = match kind {
        FileKind::MzMl => "mzML",
        FileKind::Msz => "msz",
        FileKind::Mszx => "mszx",
        FileKind::Unknown => "unknown",
    };

    let resp = client
        .post(format!("{base_url}/v1/upload"))
        .header("X-Transfer-ID", &transfer_id)
        .header("X-Original-Filename", &filename)
        .header("X-Source-Format", source_format)
        .header("Content-Type", "application/octet-stream")
        .body(body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let detail = resp.text().await.unwrap_or_default();
        return Err(ClientError::ServerError { status, detail });
    }

    let mut record: TransferRecord = resp.json().await?;

    if !record.state.is_terminal() {
        record = poll_status(&client, base_url, &transfer_id, config).await?;
    }

    match record.state {
        TransferState::Error => {
            let cause = record.error.clone().unwrap_or_default();
            listener.file_error(index, &cause);
        }
        _ => listener.file_done(index, &record),
    }

    Ok(record)
}

fn build_body(
    codec: Arc<dyn CodecAdapter>,
    path: &Path,
    kind: FileKind,
    chunk_size: usize,
    listener: Arc<dyn ProgressListener>,
    index: usize,
) -> Result<reqwest::Body, ClientError> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(8);
    let path = path.to_path_buf();

    std::thread::spawn(move || {
        let result = match kind {
            FileKind::MzMl => pump_compressed(&codec, &path, chunk_size, listener.as_ref(), index, &tx),
            _ => pump_raw(&path, chunk_size, listener.as_ref(), index, &tx),
        };
        if let Err(e) = result {
            let _ = tx.blocking_send(Err(e));
        }
    });

    Ok(reqwest::Body::wrap_stream(ReceiverStream::new(rx)))
}

/// Mirrors the original's `_counting_generator`: calls `file_progress`
/// synchronously for each chunk before handing it to the channel.
fn pump_compressed(
    codec: &Arc<dyn CodecAdapter>,
    path: &Path,
    chunk_size: usize,
    listener: &dyn ProgressListener,
    index: usize,
    tx: &tokio::sync::mpsc::Sender<Result<Bytes, std::io::Error>>,
) -> std::io::Result<()> {
    let chunks = codec
        .compress_stream(path, chunk_size)
        .map_err(std::io::Error::other)?;
    for chunk in chunks {
        let chunk = chunk?;
        listener.file_progress(index, chunk.bytes.len() as u64);
        if tx.blocking_send(Ok(Bytes::from(chunk.bytes))).is_err() {
            break;
        }
    }
    Ok(())
}

fn pump_raw(
    path: &Path,
    chunk_size: usize,
    listener: &dyn ProgressListener,
    index: usize,
    tx: &tokio::sync::mpsc::Sender<Result<Bytes, std::io::Error>>,
) -> std::io::Result<()> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        listener.file_progress(index, n as u64);
        if tx
            .blocking_send(Ok(Bytes::copy_from_slice(&buf[..n])))
            .is_err()
        {
            break;
        }
    }
    Ok(())
}

/// Poll `/v1/transfer/{id}/status` until a terminal state is reached.
/// The no-progress deadline resets whenever `state` or `bytes_received`
/// advances, per the "measures time without observable progress, not
/// total time" semantics required for arbitrarily long decompressions.
async fn poll_status(
    client: &Client,
    base_url: &str,
    transfer_id: &str,
    config: &SendConfig,
) -> Result<TransferRecord, ClientError> {
    let mut deadline = tokio::time::Instant::now() + config.poll_no_progress_timeout;
    let mut last_state: Option<TransferState> = None;
    let mut last_bytes: u64 = 0;

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(ClientError::Timeout);
        }

        let resp = client
            .get(format!("{base_url}/v1/transfer/{transfer_id}/status"))
            .timeout(config.poll_request_timeout)
            .send()
            .await;

        if let Ok(resp) = resp {
            if resp.status().is_success() {
                if let Ok(record) = resp.json::<TransferRecord>().await {
                    let progressed = Some(record.state) != last_state
                        || record.bytes_received != last_bytes;
                    if progressed {
                        deadline = tokio::time::Instant::now() + config.poll_no_progress_timeout;
                        last_state = Some(record.state);
                        last_bytes = record.bytes_received;
                    }

                    if record.state.is_terminal() {
                        return Ok(record);
                    }
                }
            }
        } else {
            debug!(transfer_id, "poll request failed, retrying");
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}
