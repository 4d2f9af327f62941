//! Frame and verdict records for replay.

use serde::{Deserialize, Serialize};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that can occur when working with records.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("frame is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// One captured ingress frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub version: u32,
    /// Monotonic capture time in nanoseconds.
    pub ts_ns: u64,
    /// Frame bytes, hex encoded, starting at the Ethernet header.
    pub frame: String,
}

impl FrameRecord {
    /// Create a record for raw frame bytes.
    pub fn new(ts_ns: u64, frame: &[u8]) -> Self {
        Self {
            version: SCHEMA_VERSION,
            ts_ns,
            frame: hex::encode(frame),
        }
    }

    /// Decode the frame bytes.
    pub fn frame_bytes(&self) -> Result<Vec<u8>, SchemaError> {
        Ok(hex::decode(&self.frame)?)
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        // A struct of integers and a string always serializes.
        serde_json::to_string(self).expect("FrameRecord serialization cannot fail")
    }

    /// Deserialize from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let record: FrameRecord = serde_json::from_str(json)?;
        check_version(record.version)?;
        Ok(record)
    }
}

/// Classifier output for one replayed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub version: u32,
    pub ts_ns: u64,
    /// `ACCEPT` or `DROP`.
    pub verdict: String,
    /// Branch that produced the verdict, snake_case.
    pub reason: String,
    /// Dotted-quad source address, when the IPv4 header was readable.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
}

impl VerdictRecord {
    pub fn new(ts_ns: u64, verdict: &str, reason: &str, source: Option<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            ts_ns,
            verdict: verdict.to_string(),
            reason: reason.to_string(),
            source,
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("VerdictRecord serialization cannot fail")
    }

    /// Deserialize from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let record: VerdictRecord = serde_json::from_str(json)?;
        check_version(record.version)?;
        Ok(record)
    }
}

fn check_version(found: u32) -> Result<(), SchemaError> {
    if found != SCHEMA_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // FrameRecord
    // ===========================================

    #[test]
    fn test_frame_record_encodes_hex() {
        let record = FrameRecord::new(5, &[0xde, 0xad, 0x00]);
        assert_eq!(record.frame, "dead00");
        assert_eq!(
            record.to_json(),
            r#"{"version":1,"ts_ns":5,"frame":"dead00"}"#
        );
    }

    #[test]
    fn test_frame_record_parses_line() {
        let record =
            FrameRecord::from_json(r#"{"version":1,"ts_ns":1000,"frame":"0A0b"}"#).expect("parse");
        assert_eq!(record.ts_ns, 1000);
        assert_eq!(record.frame_bytes().expect("hex"), vec![0x0a, 0x0b]);
    }

    #[test]
    fn test_frame_record_bad_hex() {
        let record =
            FrameRecord::from_json(r#"{"version":1,"ts_ns":0,"frame":"abc"}"#).expect("parse");
        assert!(matches!(record.frame_bytes(), Err(SchemaError::Hex(_))));
    }

    #[test]
    fn test_frame_record_version_mismatch() {
        let err = FrameRecord::from_json(r#"{"version":9,"ts_ns":0,"frame":""}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema version mismatch: expected 1, found 9"
        );
    }

    #[test]
    fn test_frame_record_missing_field() {
        let err = FrameRecord::from_json(r#"{"version":1,"frame":""}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    // ===========================================
    // VerdictRecord
    // ===========================================

    #[test]
    fn test_verdict_record_omits_missing_source() {
        let record = VerdictRecord::new(7, "DROP", "malformed_header", None);
        assert_eq!(
            record.to_json(),
            r#"{"version":1,"ts_ns":7,"verdict":"DROP","reason":"malformed_header"}"#
        );
    }

    #[test]
    fn test_verdict_record_with_source() {
        let record = VerdictRecord::new(7, "ACCEPT", "authorized", Some("10.0.0.1".to_string()));
        let restored = VerdictRecord::from_json(&record.to_json()).expect("parse");
        assert_eq!(record, restored);
    }
}
