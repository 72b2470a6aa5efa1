//! fpcore: acoustic fingerprinting and matching core.
//!
//! Turns audio into a constellation of spectral peaks, hashes peak pairs
//! into a compact index, and matches a query's hashes against a store of
//! previously indexed songs. The pipeline is: decode → spectrogram → peaks
//! → hash → store → rank.

pub mod config;
pub mod decode;
pub mod hash;
pub mod peaks;
pub mod pipeline;
pub mod rank;
pub mod report;
pub mod spectrogram;
pub mod store;

pub use config::FingerprintConfig;
pub use decode::{decode_audio, DecodeError};
pub use hash::{hash_peaks, HashRecord};
pub use peaks::{find_peaks, Peak};
pub use pipeline::{
    fingerprint_file, fingerprint_samples, identify_stream_segment, IndexPipeline,
    PipelineError, QueryPipeline,
};
pub use rank::best_match;
pub use report::{MatchReport, StreamNotification, NO_SONG_DETECTED};
pub use spectrogram::{spectrogram, Spectrogram};
pub use store::{FingerprintStore, Match, SqliteStore, StoreConfig, StoreError};
