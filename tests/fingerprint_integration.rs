//! End-to-end tests across the decode → spectrogram → peaks → hash → store
//! → rank pipeline, using synthetic signals (no bundled fixture audio).

use std::f32::consts::PI;
use std::io::Write;
use std::path::Path;

use fpcore::{
    best_match, fingerprint_samples, identify_stream_segment, FingerprintConfig, FingerprintStore,
    IndexPipeline, QueryPipeline, SqliteStore, StoreConfig, NO_SONG_DETECTED,
};

/// Write mono 16-bit PCM samples as a minimal WAV file, so the decode path
/// can be exercised end to end without bundling fixture audio.
fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) {
    let mut file = std::fs::File::create(path).unwrap();
    let data_bytes = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;

    file.write_all(b"RIFF").unwrap();
    file.write_all(&(36 + data_bytes).to_le_bytes()).unwrap();
    file.write_all(b"WAVE").unwrap();

    file.write_all(b"fmt ").unwrap();
    file.write_all(&16u32.to_le_bytes()).unwrap();
    file.write_all(&1u16.to_le_bytes()).unwrap(); // PCM
    file.write_all(&1u16.to_le_bytes()).unwrap(); // mono
    file.write_all(&sample_rate.to_le_bytes()).unwrap();
    file.write_all(&byte_rate.to_le_bytes()).unwrap();
    file.write_all(&2u16.to_le_bytes()).unwrap(); // block align
    file.write_all(&16u16.to_le_bytes()).unwrap(); // bits per sample

    file.write_all(b"data").unwrap();
    file.write_all(&data_bytes.to_le_bytes()).unwrap();
    for s in samples {
        file.write_all(&s.to_le_bytes()).unwrap();
    }
}

fn sine_wave(freq: f32, duration_secs: f32, sample_rate: u32) -> Vec<i16> {
    let n = (sample_rate as f32 * duration_secs) as usize;
    (0..n)
        .map(|i| {
            let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
            (s * 20000.0) as i16
        })
        .collect()
}

/// Deterministic pseudo-noise, not actual white noise, but unrelated enough
/// to any single tone to stand in for "a different song" in these tests.
fn noise(duration_secs: f32, sample_rate: u32, seed: u64) -> Vec<i16> {
    let n = (sample_rate as f32 * duration_secs) as usize;
    let mut state = seed | 1;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ((state % 40000) as i64 - 20000) as i16
        })
        .collect()
}

// --- S1: exact match -------------------------------------------------------

#[test]
fn s1_exact_match_identifies_the_indexed_song() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    let song = sine_wave(523.25, 6.0, config.sample_rate);
    let records = fingerprint_samples(&song, &config);
    store.insert("song-a", &records).unwrap();

    let query_records = fingerprint_samples(&song, &config);
    let matches = store.lookup(&query_records).unwrap();
    let (best, score) = best_match(&matches, fpcore::rank::DEFAULT_BIN_WIDTH_SECS);
    assert_eq!(best, Some("song-a".to_string()));
    assert!(score > 0);
}

// --- S2: noisy match (truncated/clipped query still identifies the song) --

#[test]
fn s2_partial_clip_still_identifies_the_song() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    let song = sine_wave(880.0, 8.0, config.sample_rate);
    let records = fingerprint_samples(&song, &config);
    store.insert("song-b", &records).unwrap();

    // A 3-second clip from partway through the track.
    let start = config.sample_rate as usize * 2;
    let end = config.sample_rate as usize * 5;
    let clip = &song[start..end];
    let clip_records = fingerprint_samples(clip, &config);
    let matches = store.lookup(&clip_records).unwrap();
    let (best, _score) = best_match(&matches, fpcore::rank::DEFAULT_BIN_WIDTH_SECS);
    assert_eq!(best, Some("song-b".to_string()));
}

// --- S3: no match -----------------------------------------------------------

#[test]
fn s3_unrelated_query_does_not_match_indexed_song() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    let song = sine_wave(440.0, 6.0, config.sample_rate);
    let records = fingerprint_samples(&song, &config);
    store.insert("song-c", &records).unwrap();

    let unrelated = noise(6.0, config.sample_rate, 0xDEADBEEF);
    let query_records = fingerprint_samples(&unrelated, &config);
    let matches = store.lookup(&query_records).unwrap();
    // Either no hash collisions at all, or a score far below the exact-match case.
    let (_best, score) = best_match(&matches, fpcore::rank::DEFAULT_BIN_WIDTH_SECS);

    let self_matches = store.lookup(&fingerprint_samples(&song, &config)).unwrap();
    let (_, self_score) = best_match(&self_matches, fpcore::rank::DEFAULT_BIN_WIDTH_SECS);
    assert!(score < self_score);
}

// --- S4: stream change notification -----------------------------------------

#[test]
fn s4_stream_notifies_when_detected_song_changes() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    let song_a = sine_wave(330.0, 6.0, config.sample_rate);
    let song_b = sine_wave(660.0, 6.0, config.sample_rate);
    store
        .insert("song-a", &fingerprint_samples(&song_a, &config))
        .unwrap();
    store
        .insert("song-b", &fingerprint_samples(&song_b, &config))
        .unwrap();

    // Seed the stream at song-a.
    store.upsert_stream_song("radio-1", "song-a").unwrap();

    let matches = store.lookup(&fingerprint_samples(&song_b, &config)).unwrap();
    let (best, _score) = best_match(&matches, fpcore::rank::DEFAULT_BIN_WIDTH_SECS);
    assert_eq!(best, Some("song-b".to_string()));

    let previous = store
        .upsert_stream_song("radio-1", best.as_deref().unwrap())
        .unwrap();
    assert_eq!(previous, Some("song-a".to_string()));
}

// --- S5: first-ever stream segment seeds "Not Recognized" -------------------

#[test]
fn s5_first_stream_segment_with_no_match_seeds_sentinel() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    assert_eq!(store.get_stream_song("radio-2").unwrap(), None);

    let unindexed = noise(4.0, config.sample_rate, 42);
    let matches = store.lookup(&fingerprint_samples(&unindexed, &config)).unwrap();
    let (best, _score) = best_match(&matches, fpcore::rank::DEFAULT_BIN_WIDTH_SECS);
    assert_eq!(best, None);

    let detected = best.unwrap_or_else(|| NO_SONG_DETECTED.to_string());
    let previous = store.upsert_stream_song("radio-2", &detected).unwrap();
    assert_eq!(previous, None);
    assert_eq!(
        store.get_stream_song("radio-2").unwrap(),
        Some(NO_SONG_DETECTED.to_string())
    );
}

// --- S6: batching across byte-limit configurations --------------------------

#[test]
fn s6_batching_does_not_lose_or_duplicate_rows() {
    let config = FingerprintConfig::default();
    let song = sine_wave(220.0, 5.0, config.sample_rate);
    let records = fingerprint_samples(&song, &config);
    assert!(!records.is_empty());

    for max_batch_bytes in [32usize, 128, 4096, 1_000_000] {
        let mut store =
            SqliteStore::open_in_memory(StoreConfig { max_batch_bytes }).unwrap();
        let inserted = store.insert("song-x", &records).unwrap();
        assert_eq!(inserted, records.len());

        let matches = store.lookup(&records).unwrap();
        let distinct_hashes: std::collections::HashSet<u64> =
            records.iter().map(|r| r.hash).collect();
        // Every distinct query hash that was actually stored should be found,
        // regardless of how many batches it took to write or read it.
        let found_hashes: std::collections::HashSet<u64> =
            matches.iter().map(|m| m.hash).collect();
        assert_eq!(found_hashes, distinct_hashes);
    }
}

// --- Property: determinism ---------------------------------------------------

#[test]
fn fingerprinting_is_deterministic() {
    let config = FingerprintConfig::default();
    let song = sine_wave(523.25, 4.0, config.sample_rate);
    let a = fingerprint_samples(&song, &config);
    let b = fingerprint_samples(&song, &config);
    assert_eq!(a, b);
}

// --- Full pipeline facade (IndexPipeline / QueryPipeline) -------------------

#[test]
fn index_pipeline_then_query_pipeline_identify_a_real_wav_file() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song-y.wav");
    let song = sine_wave(1046.5, 5.0, config.sample_rate);
    write_wav(&path, &song, config.sample_rate);

    let mut indexer = IndexPipeline::new(&mut store, config);
    let inserted = indexer.index_file(&path, "song-y").unwrap();
    assert!(inserted > 0);

    let querier = QueryPipeline::new(&store, config);
    let report = querier.identify_file(&path).unwrap();
    assert_eq!(report.song, Some("song-y".to_string()));
    assert!(report.score > 0);
}

#[test]
fn identify_stream_segment_notifies_on_change_and_is_silent_when_unchanged() {
    let config = FingerprintConfig::default();
    let mut store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("song-a.wav");
    let song_a = sine_wave(330.0, 5.0, config.sample_rate);
    write_wav(&path_a, &song_a, config.sample_rate);

    {
        let mut indexer = IndexPipeline::new(&mut store, config);
        indexer.index_file(&path_a, "song-a").unwrap();
    }

    let first = identify_stream_segment(&mut store, &config, "radio-4", &path_a).unwrap();
    assert_eq!(first.unwrap().song, "song-a");

    // Same segment again: detected song hasn't changed, so no notification.
    let second = identify_stream_segment(&mut store, &config, "radio-4", &path_a).unwrap();
    assert!(second.is_none());
    assert_eq!(
        store.get_stream_song("radio-4").unwrap(),
        Some("song-a".to_string())
    );
}
