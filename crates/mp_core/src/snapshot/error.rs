use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decompression error")]
    Decompression,

    #[error("corrupted snapshot")]
    Corrupted,

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("version mismatch: found {found}, expected at most {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("snapshot not found: {path}")]
    FileNotFound { path: String },
}

impl SnapshotError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            SnapshotError::Io(_) => true,
            SnapshotError::FileNotFound { .. } => true,
            SnapshotError::Corrupted => false,
            SnapshotError::ChecksumMismatch => false,
            SnapshotError::VersionMismatch { .. } => false,
            _ => false,
        }
    }
}
