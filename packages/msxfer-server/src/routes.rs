//! Route handlers: upload, status, health.

use std::path::{Path as FsPath, PathBuf};

use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use msxfer_core::{RecordPatch, TransferRecord, TransferState};
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::{AppState, StoreAs};

const TRANSFER_ID_HEADER: &str = "X-Transfer-ID";
const ORIGINAL_FILENAME_HEADER: &str = "X-Original-Filename";

fn require_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    let value = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingHeader(name))?;
    if value.trim().is_empty() {
        return Err(ApiError::MissingHeader(name));
    }
    Ok(value)
}

fn authenticate(state: &AppState, headers: &HeaderMap, query: Option<&str>) -> Result<(), ApiError> {
    state
        .auth
        .authenticate(headers, query.unwrap_or(""))
        .map(|_identity| ())
        .map_err(|_| ApiError::Unauthorized)
}

/// Strip directory components from a client-declared filename and return
/// the file stem (no extension) — prevents path traversal via
/// `X-Original-Filename` values like `../../etc/passwd`.
fn safe_stem(original_filename: &str) -> String {
    let basename = FsPath::new(original_filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(original_filename);
    FsPath::new(basename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(basename)
        .to_string()
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "store_as": state.config.store_as.as_str(),
    }))
}

pub async fn status_handler(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    authenticate(&state, &headers, query.as_deref())?;

    match state.registry.get(&transfer_id) {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::NotFound(transfer_id)),
    }
}

pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Body,
) -> Result<Response, ApiError> {
    authenticate(&state, &headers, query.as_deref())?;

    let transfer_id = require_header(&headers, TRANSFER_ID_HEADER)?.to_string();
    let filename = require_header(&headers, ORIGINAL_FILENAME_HEADER)?.to_string();

    let record = state.registry.create(&transfer_id, &filename)?;
    info!(transfer_id = %transfer_id, filename = %filename, "transfer created");

    let stem = safe_stem(&filename);
    let staging_path = state.output_dir.join(format!("{stem}.msz"));

    let staging_file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging_path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            let msg = format!("staging path already exists: {}", staging_path.display());
            state.registry.update(
                &transfer_id,
                RecordPatch::new().state(TransferState::Error).error(msg.clone()),
            );
            return Err(ApiError::Conflict(msg));
        }
        Err(e) => return Err(ApiError::Io(e)),
    };

    let record = match stream_to_staging(&state, &transfer_id, staging_file, body).await {
        Ok(bytes_written) => {
            info!(transfer_id = %transfer_id, bytes_written, "body received");
            state
                .registry
                .update(&transfer_id, RecordPatch::new().state(TransferState::Received))
                .unwrap_or(record)
        }
        Err(e) => {
            warn!(transfer_id = %transfer_id, error = %e, "upload I/O failure");
            let record = state
                .registry
                .update(
                    &transfer_id,
                    RecordPatch::new()
                        .state(TransferState::Error)
                        .error(e.to_string()),
                )
                .unwrap_or(record);
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(record)).into_response());
        }
    };

    let record = finalize(&state, &transfer_id, &staging_path, record).await;

    let status = if matches!(record.state, TransferState::Done | TransferState::Decompressing) {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok((status, Json(record)).into_response())
}

/// Stream the request body into the already-exclusively-opened
/// `staging_file`, updating `bytes_received` on a throttled cadence
/// (every `progress_update_chunks` chunks) plus a final flush, per the
/// batched-update requirement on the upload contract. Returns the total
/// bytes written.
async fn stream_to_staging(
    state: &AppState,
    transfer_id: &str,
    mut file: tokio::fs::File,
    body: Body,
) -> std::io::Result<u64> {
    let mut stream = body.into_data_stream();

    let mut total: u64 = 0;
    let mut chunks_since_update: u32 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| std::io::Error::other(e.to_string()))?;
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
        chunks_since_update += 1;

        if chunks_since_update >= state.config.progress_update_chunks {
            state
                .registry
                .update(transfer_id, RecordPatch::new().bytes_received(total));
            chunks_since_update = 0;
        }
    }

    file.flush().await?;
    state
        .registry
        .update(transfer_id, RecordPatch::new().bytes_received(total));

    Ok(total)
}

/// Apply the server's `store_as` policy once the body has been fully
/// received: either promote the staging file in place, or dispatch
/// decompression to a blocking worker so it never shares the async
/// runtime's I/O-handling threads with in-flight uploads.
async fn finalize(
    state: &AppState,
    transfer_id: &str,
    staging_path: &PathBuf,
    record: TransferRecord,
) -> TransferRecord {
    match state.config.store_as {
        StoreAs::Msz => state
            .registry
            .update(
                transfer_id,
                RecordPatch::new()
                    .state(TransferState::Done)
                    .stored_as(staging_path.display().to_string()),
            )
            .unwrap_or(record),
        StoreAs::MzMl => {
            state
                .registry
                .update(transfer_id, RecordPatch::new().state(TransferState::Decompressing));

            let output_path = staging_path.with_extension("mzML");
            let codec = state.codec.clone();
            let staging_clone = staging_path.clone();
            let output_clone = output_path.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                codec.decompress(&staging_clone, &output_clone)
            })
            .await;

            match outcome {
                Ok(Ok(())) => {
                    if let Err(e) = std::fs::remove_file(staging_path) {
                        warn!(transfer_id = %transfer_id, error = %e, "failed to remove staging file after decompression");
                    }
                    state
                        .registry
                        .update(
                            transfer_id,
                            RecordPatch::new()
                                .state(TransferState::Done)
                                .stored_as(output_path.display().to_string()),
                        )
                        .unwrap_or(record)
                }
                Ok(Err(e)) => {
                    warn!(transfer_id = %transfer_id, error = %e, "decompression failed");
                    state
                        .registry
                        .update(
                            transfer_id,
                            RecordPatch::new().state(TransferState::Error).error(e.to_string()),
                        )
                        .unwrap_or(record)
                }
                Err(join_err) => {
                    warn!(transfer_id = %transfer_id, error = %join_err, "decompression worker panicked");
                    state
                        .registry
                        .update(
                            transfer_id,
                            RecordPatch::new()
                                .state(TransferState::Error)
                                .error(join_err.to_string()),
                        )
                        .unwrap_or(record)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_stem_strips_directories_and_extension() {
        assert_eq!(safe_stem("spectra.mzML"), "spectra");
        assert_eq!(safe_stem("../../etc/passwd"), "passwd");
        assert_eq!(safe_stem("a/b/c.msz"), "c");
    }
}
