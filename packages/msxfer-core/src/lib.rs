//! Shared transfer record, registry, and codec adapter used by both the
//! msxfer server and client crates.

pub mod codec;
pub mod error;
pub mod record;
pub mod registry;

pub use codec::{CodecAdapter, CodecChunk, FileKind, StubCodec};
pub use error::{Error, Result};
pub use record::{RecordPatch, TransferRecord, TransferState};
pub use registry::TransferRegistry;
