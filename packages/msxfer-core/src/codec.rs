//! The codec adapter boundary: a thin trait over the external mzML/msz
//! compression library.
//!
//! The transfer core depends only on this interface and never
//! re-implements the codec itself. A production deployment wires in a
//! binding to the real compression library (an FFI crate, or a subprocess
//! adapter shelling out to an external binary); this crate ships
//! [`StubCodec`], a format-sniffing, size-preserving stand-in suitable for
//! integration tests and for running the server without the real
//! library installed.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// File formats the codec adapter can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    MzMl,
    Msz,
    Mszx,
    Unknown,
}

impl FileKind {
    /// Classify by extension. The real codec inspects file structure, but
    /// every adapter implementation — real or stub — must agree on this
    /// as the fallback when magic-byte sniffing is inconclusive.
    pub fn from_extension(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("mzml") => FileKind::MzMl,
            Some("msz") => FileKind::Msz,
            Some("mszx") => FileKind::Mszx,
            _ => FileKind::Unknown,
        }
    }
}

/// A lazily-produced chunk of a compression stream, paired with the
/// cumulative byte count emitted so far — the counting wrapper called out
/// in the upload contract's progress-callback requirement.
pub struct CodecChunk {
    pub bytes: Vec<u8>,
    pub cumulative: u64,
}

/// Boundary over the external mzML/msz compression library.
///
/// Implementations MUST be safe to invoke from a blocking worker thread:
/// `decompress` in particular is CPU-bound and is never called from an
/// async task directly (see the server's use of `spawn_blocking`).
pub trait CodecAdapter: Send + Sync {
    /// Inspect `path` and classify its format.
    fn detect(&self, path: &Path) -> Result<FileKind>;

    /// Produce the `msz` wire form of an `mzML` file as a sequence of
    /// chunks, each no larger than `chunk_size`. Synchronous/blocking;
    /// callers on an async runtime must drive this from a blocking
    /// context.
    fn compress_stream(
        &self,
        path: &Path,
        chunk_size: usize,
    ) -> Result<Box<dyn Iterator<Item = io::Result<CodecChunk>> + Send>>;

    /// Produce the `mzML` form of an `msz` input at `output_path`.
    /// Synchronous, CPU-bound.
    fn decompress(&self, input_path: &Path, output_path: &Path) -> Result<()>;
}

/// A stand-in codec used where no binding to the real compression library
/// is available. `detect` sniffs by extension; `compress_stream` performs
/// a plain chunked read (no actual compression — the wire form is treated
/// as opaque bytes); `decompress` copies the input verbatim. This
/// preserves every size and round-trip invariant the registry and upload
/// handler care about without requiring the real library to be linked.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubCodec;

impl CodecAdapter for StubCodec {
    fn detect(&self, path: &Path) -> Result<FileKind> {
        match FileKind::from_extension(path) {
            FileKind::Unknown => Err(Error::Codec(format!(
                "unrecognized file extension: {}",
                path.display()
            ))),
            kind => Ok(kind),
        }
    }

    fn compress_stream(
        &self,
        path: &Path,
        chunk_size: usize,
    ) -> Result<Box<dyn Iterator<Item = io::Result<CodecChunk>> + Send>> {
        let file = File::open(path)?;
        Ok(Box::new(ChunkReader {
            reader: BufReader::new(file),
            chunk_size,
            cumulative: 0,
        }))
    }

    fn decompress(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        let mut input = BufReader::new(File::open(input_path)?);
        let mut output = File::create(output_path)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = input.read(&mut buf)?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n])?;
        }
        Ok(())
    }
}

struct ChunkReader {
    reader: BufReader<File>,
    chunk_size: usize,
    cumulative: u64,
}

impl Iterator for ChunkReader {
    type Item = io::Result<CodecChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = vec![0u8; self.chunk_size];
        match self.reader.read(&mut buf) {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                self.cumulative += n as u64;
                Some(Ok(CodecChunk {
                    bytes: buf,
                    cumulative: self.cumulative,
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn detect_classifies_by_extension() {
        let codec = StubCodec;
        assert_eq!(
            codec.detect(Path::new("a.mzML")).unwrap(),
            FileKind::MzMl
        );
        assert_eq!(codec.detect(Path::new("a.msz")).unwrap(), FileKind::Msz);
        assert_eq!(codec.detect(Path::new("a.mszx")).unwrap(), FileKind::Mszx);
        assert!(codec.detect(Path::new("a.txt")).is_err());
    }

    #[test]
    fn compress_stream_preserves_total_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.mzML");
        let mut f = File::create(&path).unwrap();
        let payload = vec![7u8; 10_000];
        f.write_all(&payload).unwrap();
        drop(f);

        let codec = StubCodec;
        let chunks: Vec<_> = codec
            .compress_stream(&path, 4096)
            .unwrap()
            .collect::<io::Result<_>>()
            .unwrap();

        let total: usize = chunks.iter().map(|c| c.bytes.len()).sum();
        assert_eq!(total, payload.len());
        assert_eq!(chunks.last().unwrap().cumulative, payload.len() as u64);
    }

    #[test]
    fn decompress_is_size_preserving_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.msz");
        let output = dir.path().join("out.mzML");
        let payload = vec![42u8; 2048];
        std::fs::write(&input, &payload).unwrap();

        StubCodec.decompress(&input, &output).unwrap();
        let written = std::fs::read(&output).unwrap();
        assert_eq!(written.len(), payload.len());
    }
}
