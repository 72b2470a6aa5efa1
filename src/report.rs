//! JSON report payloads emitted by the file and stream adapters.

use serde::{Deserialize, Serialize};

/// Sentinel `songid` used by the stream adapter when no match has ever been
/// seen for a stream yet.
pub const NO_SONG_DETECTED: &str = "Not Recognized";

/// Result of identifying a single file: the best-matching song, if any, and
/// its raw histogram-peak score. `song` serializes as JSON `null` when no
/// match was found — the `"Not Recognized"` sentinel is a stream-layer
/// concept, not part of this payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchReport {
    pub song: Option<String>,
    pub score: u32,
}

/// Notification emitted when a stream's detected song changes from what was
/// last recorded for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamNotification {
    pub stream: String,
    pub song: String,
    pub score: u32,
}
