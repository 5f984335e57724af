//! Box Score Replay Library
//!
//! Exposes the replay engine for the CLI binary and integration tests.

pub mod replay;
