//! knockgate replay schema
//!
//! Defines the versioned JSONL records consumed and produced by frame replay.

mod record;

pub use record::{FrameRecord, SchemaError, VerdictRecord, SCHEMA_VERSION};
