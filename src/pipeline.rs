//! Top-level API: audio file → fingerprints → store → ranked match.

use std::path::Path;

use thiserror::Error;

use crate::config::FingerprintConfig;
use crate::decode::{decode_audio, DecodeError};
use crate::hash::{hash_peaks, HashRecord};
use crate::peaks::find_peaks;
use crate::rank::{best_match, DEFAULT_BIN_WIDTH_SECS};
use crate::report::{MatchReport, StreamNotification, NO_SONG_DETECTED};
use crate::spectrogram::spectrogram;
use crate::store::{FingerprintStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Run the decode → spectrogram → peaks → hash chain on a file, independent
/// of any store — the shared first half of both indexing and querying.
pub fn fingerprint_file(
    path: &Path,
    config: &FingerprintConfig,
) -> Result<Vec<HashRecord>, DecodeError> {
    let samples = decode_audio(path, config)?;
    Ok(fingerprint_samples(&samples, config))
}

/// Run the spectrogram → peaks → hash chain on already-decoded samples.
pub fn fingerprint_samples(samples: &[i16], config: &FingerprintConfig) -> Vec<HashRecord> {
    let spec = spectrogram(samples, config);
    let peaks = find_peaks(&spec, config);
    hash_peaks(&peaks, config)
}

/// Indexes new songs into a [`FingerprintStore`].
pub struct IndexPipeline<'s, S: FingerprintStore> {
    store: &'s mut S,
    config: FingerprintConfig,
}

impl<'s, S: FingerprintStore> IndexPipeline<'s, S> {
    pub fn new(store: &'s mut S, config: FingerprintConfig) -> Self {
        Self { store, config }
    }

    /// Fingerprint `path` and store every hash under `songid`, returning the
    /// number of hash rows written.
    pub fn index_file(&mut self, path: &Path, songid: &str) -> Result<usize, PipelineError> {
        let records = fingerprint_file(path, &self.config)?;
        Ok(self.store.insert(songid, &records)?)
    }
}

/// Queries a [`FingerprintStore`] to identify a song or stream segment.
pub struct QueryPipeline<'s, S: FingerprintStore> {
    store: &'s S,
    config: FingerprintConfig,
}

impl<'s, S: FingerprintStore> QueryPipeline<'s, S> {
    pub fn new(store: &'s S, config: FingerprintConfig) -> Self {
        Self { store, config }
    }

    /// Identify a standalone file. Reports the raw score unconditionally,
    /// with no threshold applied — matches the file adapter's behavior.
    pub fn identify_file(&self, path: &Path) -> Result<MatchReport, PipelineError> {
        let records = fingerprint_file(path, &self.config)?;
        self.identify_records(&records)
    }

    fn identify_records(&self, records: &[HashRecord]) -> Result<MatchReport, PipelineError> {
        let matches = self.store.lookup(records)?;
        let (song, score) = best_match(&matches, DEFAULT_BIN_WIDTH_SECS);
        Ok(MatchReport { song, score })
    }
}

/// Identifies a stream segment and, on change, updates stream state and
/// returns a notification. Callers publish the notification (e.g. to a
/// pub/sub topic); that delivery is outside this crate's scope.
pub fn identify_stream_segment<S: FingerprintStore>(
    store: &mut S,
    config: &FingerprintConfig,
    stream_name: &str,
    path: &Path,
) -> Result<Option<StreamNotification>, PipelineError> {
    let records = fingerprint_file(path, config)?;
    let matches = store.lookup(&records)?;
    let (song, score) = best_match(&matches, DEFAULT_BIN_WIDTH_SECS);
    let detected_songid = song.unwrap_or_else(|| NO_SONG_DETECTED.to_string());

    let last = store.get_stream_song(stream_name)?;
    if last.as_deref() == Some(detected_songid.as_str()) {
        return Ok(None);
    }

    store.upsert_stream_song(stream_name, &detected_songid)?;
    Ok(Some(StreamNotification {
        stream: stream_name.to_string(),
        song: detected_songid,
        score,
    }))
}
