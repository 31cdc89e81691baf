//! Snapshot encoding for the whole lock store.
//!
//! On-disk format:
//! ```text
//! [4 bytes: magic "BLKL"]
//! [4 bytes: format version (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (JSON array of LockRecord)]
//! ```
//!
//! The payload stays JSON so an operator can inspect a snapshot by stripping
//! the 12-byte header. The CRC catches torn or truncated writes.

use tracing::debug;

use blocklocker_types::LockRecord;

use crate::error::{StoreError, StoreResult};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const MAGIC: &[u8; 4] = b"BLKL";

/// Header size: magic + version + CRC.
const HEADER_SIZE: usize = 12;

/// Serialize records into a framed snapshot.
pub fn encode_snapshot(records: &[LockRecord]) -> StoreResult<Vec<u8>> {
    let payload =
        serde_json::to_vec(records).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&payload);

    debug!(records = records.len(), bytes = out.len(), "encoded snapshot");
    Ok(out)
}

/// Parse a framed snapshot back into records.
///
/// When the same key appears more than once the caller receives every
/// entry in file order; loading into a store therefore keeps the last one.
pub fn decode_snapshot(bytes: &[u8]) -> StoreResult<Vec<LockRecord>> {
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Snapshot(format!(
            "snapshot too short: {} bytes",
            bytes.len()
        )));
    }
    let (header, payload) = bytes.split_at(HEADER_SIZE);

    if &header[0..4] != MAGIC {
        return Err(StoreError::Snapshot("bad magic".into()));
    }

    let version = read_u32(&header[4..8]);
    if version != SNAPSHOT_VERSION {
        return Err(StoreError::Snapshot(format!(
            "unsupported snapshot version {version} (expected {SNAPSHOT_VERSION})"
        )));
    }

    let expected = read_u32(&header[8..12]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(StoreError::Snapshot(format!(
            "CRC mismatch: expected {expected:#010x}, got {actual:#010x}"
        )));
    }

    let records: Vec<LockRecord> =
        serde_json::from_slice(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
    debug!(records = records.len(), "decoded snapshot");
    Ok(records)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklocker_types::{ActorId, CoordinateKey, LockMode, WorldBounds};
    use chrono::Utc;

    fn sample(n: i64) -> Vec<LockRecord> {
        let owner = ActorId::random();
        (0..n)
            .map(|x| {
                let key = CoordinateKey::new("world", x, 70, x, &WorldBounds::default()).unwrap();
                let mut r = LockRecord::new(key, owner, LockMode::Shared, Utc::now());
                r.trusted.insert(ActorId::random());
                r
            })
            .collect()
    }

    #[test]
    fn encode_decode_preserves_records() {
        let records = sample(5);
        let bytes = encode_snapshot(&records).unwrap();
        assert_eq!(&bytes[..4], b"BLKL");
        assert_eq!(decode_snapshot(&bytes).unwrap(), records);
    }

    #[test]
    fn empty_snapshot_is_valid() {
        let bytes = encode_snapshot(&[]).unwrap();
        assert!(decode_snapshot(&bytes).unwrap().is_empty());
    }

    #[test]
    fn rejects_truncated_input() {
        let err = decode_snapshot(b"BLK").unwrap_err();
        assert!(matches!(err, StoreError::Snapshot(_)));

        let mut bytes = encode_snapshot(&sample(2)).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(decode_snapshot(&bytes), Err(StoreError::Snapshot(_))));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode_snapshot(&sample(1)).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_snapshot(&bytes), Err(StoreError::Snapshot(_))));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = encode_snapshot(&sample(1)).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_snapshot(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version 99"));
    }

    #[test]
    fn detects_payload_corruption() {
        let mut bytes = encode_snapshot(&sample(3)).unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0xFF;
        let err = decode_snapshot(&bytes).unwrap_err();
        assert!(err.to_string().contains("CRC mismatch"));
    }
}
