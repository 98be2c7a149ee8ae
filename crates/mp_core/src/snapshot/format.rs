use chrono::{DateTime, Utc};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::SnapshotError;
use super::SNAPSHOT_VERSION;
use crate::model::{Match, PointRecord, Post};

const CHECKSUM_LEN: usize = 32;

/// Everything the store persists: all three collections plus format
/// metadata.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoreSnapshot {
    /// Snapshot format version for migration.
    pub version: u32,

    /// When the snapshot was captured.
    pub saved_at: DateTime<Utc>,

    pub matches: Vec<Match>,
    pub records: Vec<PointRecord>,
    pub posts: Vec<Post>,
}

impl StoreSnapshot {
    pub fn empty(saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            matches: Vec::new(),
            records: Vec::new(),
            posts: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut match_ids = std::collections::HashSet::new();
        for m in &self.matches {
            if !match_ids.insert(&m.id) {
                return Err(SnapshotError::Corrupted);
            }
        }

        let mut record_ids = std::collections::HashSet::new();
        for r in &self.records {
            if !record_ids.insert(&r.id) {
                return Err(SnapshotError::Corrupted);
            }
        }

        Ok(())
    }
}

/// Serialize and compress a snapshot.
pub fn encode_snapshot(snapshot: &StoreSnapshot) -> Result<Vec<u8>, SnapshotError> {
    snapshot.validate()?;

    let msgpack = to_vec_named(snapshot).map_err(SnapshotError::Serialization)?;
    let compressed = compress_prepend_size(&msgpack);

    let mut hasher = Sha256::new();
    hasher.update(&compressed);
    let checksum = hasher.finalize();

    let mut result = compressed;
    result.extend_from_slice(&checksum);
    Ok(result)
}

/// Verify, decompress and deserialize a snapshot.
pub fn decode_snapshot(bytes: &[u8]) -> Result<StoreSnapshot, SnapshotError> {
    // Size-prefix header plus checksum is the minimum viable payload.
    if bytes.len() < 4 + CHECKSUM_LEN {
        return Err(SnapshotError::Corrupted);
    }

    let (payload, checksum_bytes) = bytes.split_at(bytes.len() - CHECKSUM_LEN);

    let mut hasher = Sha256::new();
    hasher.update(payload);
    if &hasher.finalize()[..] != checksum_bytes {
        return Err(SnapshotError::ChecksumMismatch);
    }

    let msgpack =
        decompress_size_prepended(payload).map_err(|_| SnapshotError::Decompression)?;
    let snapshot: StoreSnapshot =
        from_slice(&msgpack).map_err(SnapshotError::Deserialization)?;

    if snapshot.version > SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    snapshot.validate()?;
    Ok(snapshot)
}

/// Human-readable JSON rendition, for inspection and ad-hoc tooling. Not a
/// load format; the binary layout above is the one the store round-trips.
pub fn snapshot_to_json(snapshot: &StoreSnapshot) -> Result<String, SnapshotError> {
    snapshot.validate()?;
    Ok(serde_json::to_string_pretty(snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchDraft, UserProfile};
    use chrono::TimeZone;

    fn sample() -> StoreSnapshot {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let draft = MatchDraft {
            location: "Quadra 1".to_string(),
            scheduled_at: Utc.with_ymd_and_hms(2025, 4, 5, 20, 0, 0).unwrap(),
            capacity: 14,
        };
        let m = Match::from_draft(&draft, &UserProfile::new("u1", "Ana"), now).unwrap();

        let mut snapshot = StoreSnapshot::empty(now);
        snapshot.matches.push(m);
        snapshot
    }

    #[test]
    fn test_roundtrip() {
        let snapshot = sample();
        let bytes = encode_snapshot(&snapshot).unwrap();
        let decoded = decode_snapshot(&bytes).unwrap();

        assert_eq!(decoded.version, snapshot.version);
        assert_eq!(decoded.matches, snapshot.matches);
        assert_eq!(decoded.saved_at, snapshot.saved_at);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        if let Some(last) = bytes.last_mut() {
            *last = last.wrapping_add(1);
        }
        assert!(matches!(decode_snapshot(&bytes), Err(SnapshotError::ChecksumMismatch)));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut snapshot = sample();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let bytes = encode_snapshot(&snapshot).unwrap();
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(SnapshotError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_match_ids_rejected() {
        let mut snapshot = sample();
        let dup = snapshot.matches[0].clone();
        snapshot.matches.push(dup);
        assert!(matches!(encode_snapshot(&snapshot), Err(SnapshotError::Corrupted)));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        assert!(matches!(decode_snapshot(&[0u8; 10]), Err(SnapshotError::Corrupted)));
    }

    #[test]
    fn test_json_export() {
        let json = snapshot_to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], SNAPSHOT_VERSION);
        assert_eq!(value["matches"][0]["location"], "Quadra 1");
    }
}
