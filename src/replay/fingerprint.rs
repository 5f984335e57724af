//! Snapshot Sequence Fingerprint
//!
//! SHA-256 over the canonical JSON of every snapshot, in order. Two replays of the same
//! records through the same adapter must produce the same fingerprint.
//!
//! ```text
//! Fingerprint = H("BOXFP_V1" || len(s0) || json(s0) || len(s1) || json(s1) || ...)
//! ```

use crate::replay::snapshot::BoxScoreSnapshot;
use sha2::{Digest, Sha256};

/// Fingerprint version string - increment when format changes.
pub const FINGERPRINT_VERSION: &str = "BOXFP_V1";

/// Hex-encoded fingerprint of a snapshot sequence.
pub fn fingerprint_snapshots(snapshots: &[BoxScoreSnapshot]) -> anyhow::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_VERSION.as_bytes());
    for snapshot in snapshots {
        // Snapshot maps are ordered, so serialization is canonical.
        let bytes = serde_json::to_vec(snapshot)?;
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}
