//! Batch driver: bounded-parallel fan-out of §4.7 single-file sends over
//! many inputs, with input-order result aggregation.

use std::path::PathBuf;
use std::sync::Arc;

use msxfer_core::{CodecAdapter, TransferRecord};
use tokio::sync::Semaphore;

use crate::progress::{NullProgressListener, ProgressListener};
use crate::sender::{self, SendConfig};

/// The outcome of one file within a batch.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub filename: String,
    pub record: Option<TransferRecord>,
    pub error: Option<String>,
}

impl FileResult {
    pub fn is_success(&self) -> bool {
        matches!(&self.record, Some(r) if matches!(r.state, msxfer_core::TransferState::Done))
    }
}

/// Send every file in `paths` to `base_url`, running at most `parallel`
/// transfers concurrently. A single file's failure never cancels its
/// peers; every input produces exactly one result, returned in input
/// order (not completion order) via a pre-sized result vector — the same
/// shape as the original's `results: list[dict] = [None] * len(file_paths)`
/// indexed by `future_to_idx`.
pub async fn send_batch(
    codec: Arc<dyn CodecAdapter>,
    paths: &[PathBuf],
    base_url: &str,
    parallel: usize,
    config: Arc<SendConfig>,
    listener: Option<Arc<dyn ProgressListener>>,
) -> Vec<FileResult> {
    let worker_count = parallel.max(1).min(paths.len().max(1));
    let semaphore = Arc::new(Semaphore::new(worker_count));
    let listener = listener.unwrap_or_else(|| Arc::new(NullProgressListener));

    let mut results: Vec<Option<FileResult>> = vec![None; paths.len()];
    let mut handles = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let codec = codec.clone();
        let base_url = base_url.to_string();
        let config = config.clone();
        let listener = listener.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            let outcome = sender::send_file(codec, &path, &base_url, &config, listener.clone(), index)
                .await;

            let result = match outcome {
                Ok(record) => FileResult {
                    filename,
                    record: Some(record),
                    error: None,
                },
                Err(e) => FileResult {
                    filename,
                    record: None,
                    error: Some(e.to_string()),
                },
            };

            (index, result)
        }));
    }

    for handle in handles {
        match handle.await {
            Ok((index, result)) => results[index] = Some(result),
            Err(join_err) => {
                tracing::error!(error = %join_err, "batch worker panicked");
            }
        }
    }

    results
        .into_iter()
        .map(|r| {
            r.unwrap_or(FileResult {
                filename: "unknown".to_string(),
                record: None,
                error: Some("worker task did not complete".to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_result_success_requires_done_state() {
        let result = FileResult {
            filename: "a.msz".to_string(),
            record: None,
            error: Some("boom".to_string()),
        };
        assert!(!result.is_success());
    }
}
