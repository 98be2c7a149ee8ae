//! Single-file persistence for the in-memory store.
//!
//! Layout on disk: named MessagePack, LZ4-compressed with the uncompressed
//! size prepended, SHA-256 checksum appended. The CLI round-trips the store
//! through this between invocations; a hosted deployment would talk to a
//! real document store instead and never touch this module.

mod error;
mod file;
mod format;

pub use error::SnapshotError;
pub use file::SnapshotFile;
pub use format::{decode_snapshot, encode_snapshot, snapshot_to_json, StoreSnapshot};

/// Snapshot format version, bumped on incompatible layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;
