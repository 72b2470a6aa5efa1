//! Histogram-peak ranking of fingerprint matches into a best-song decision.

use std::collections::HashMap;

use crate::store::Match;

/// Bucket width for the `stored_time - query_time` histogram, in seconds.
/// One spectrogram hop step at the canonical rate and window size
/// (`44100 Hz`, `0.2s` window, 50% overlap): `0.1s`.
pub const DEFAULT_BIN_WIDTH_SECS: f32 = 0.1;

/// Pick the best-matching song from a set of hash collisions.
///
/// For each candidate song, bucket every match's `stored_time - query_time`
/// offset into `bin_width`-wide bins; a consistent song alignment produces a
/// tall peak in one bin (many hash collisions agreeing on the same offset),
/// while an unrelated song's collisions scatter across many bins. The
/// winning song is the one whose tallest bin has the most matches; ties
/// break on the lexicographically smaller `songid` for determinism. An empty
/// match set returns `(None, 0)` — no threshold is applied here, that
/// decision belongs to the caller.
pub fn best_match(matches: &[Match], bin_width: f32) -> (Option<String>, u32) {
    if matches.is_empty() {
        return (None, 0);
    }

    let mut histograms: HashMap<&str, HashMap<i64, u32>> = HashMap::new();
    for m in matches {
        let delta = m.stored_time - m.query_time;
        let bin = (delta / bin_width).round() as i64;
        *histograms
            .entry(m.songid.as_str())
            .or_default()
            .entry(bin)
            .or_insert(0) += 1;
    }

    let mut best: Option<(&str, u32)> = None;
    for (songid, hist) in &histograms {
        let peak = hist.values().copied().max().unwrap_or(0);
        best = match best {
            None => Some((songid, peak)),
            Some((best_song, best_peak)) => {
                if peak > best_peak || (peak == best_peak && *songid < best_song) {
                    Some((songid, peak))
                } else {
                    Some((best_song, best_peak))
                }
            }
        };
    }

    match best {
        Some((songid, score)) => (Some(songid.to_string()), score),
        None => (None, 0),
    }
}
