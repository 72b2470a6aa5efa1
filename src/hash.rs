//! Target-zone peak pairing and stable 64-bit hash construction.

use crate::config::FingerprintConfig;
use crate::peaks::Peak;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// One hashed peak pair, tagged with the anchor's time so the store can later
/// answer "at what offset into the query did this hash occur".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashRecord {
    pub hash: u64,
    pub anchor_time: f32,
}

/// Enumerate anchor/target peak pairs and hash each pair.
///
/// For every peak acting as an anchor, every other peak whose `(time, freq)`
/// falls inside the anchor's forward-looking target zone is paired with it:
///
/// ```text
/// time  in [anchor.time_sec + target_start, anchor.time_sec + target_start + target_t]
/// freq  in [anchor.freq_hz  - target_f / 2,  anchor.freq_hz - target_f / 2 + target_f]
/// ```
///
/// This is a direct port of the target-zone box used by the reference
/// implementation, strictly forward in time (`target_start > 0`), so a peak
/// never pairs with itself or with anything at or before its own instant.
pub fn hash_peaks(peaks: &[Peak], config: &FingerprintConfig) -> Vec<HashRecord> {
    let mut records = Vec::new();

    for anchor in peaks {
        let x_min = anchor.time_sec + config.target_start;
        let x_max = x_min + config.target_t;
        let y_min = anchor.freq_hz - config.target_f * 0.5;
        let y_max = y_min + config.target_f;

        for target in peaks {
            if target.time_sec < x_min || target.time_sec > x_max {
                continue;
            }
            if target.freq_hz < y_min || target.freq_hz > y_max {
                continue;
            }
            records.push(HashRecord {
                hash: hash_peak_pair(anchor, target),
                anchor_time: anchor.time_sec,
            });
        }
    }

    // Peaks arrive sorted by descending power; re-sort by anchor time
    // ascending (stable, so pairs sharing an anchor keep their relative
    // order) to match the reference implementation's hash ordering.
    records.sort_by(|a, b| a.anchor_time.total_cmp(&b.anchor_time));
    records
}

/// Hash an anchor/target peak pair into a single stable 64-bit value.
///
/// Combines the anchor's frequency bin, the target's frequency bin, and the
/// forward time delta `target.time_sec - anchor.time_sec`. The reference
/// implementation computes this third term as the target's time minus
/// itself, which is always zero; this crate uses the corrected delta so that
/// pairs at different offsets within the same frequency pair hash
/// differently, as the target-zone design intends.
fn hash_peak_pair(anchor: &Peak, target: &Peak) -> u64 {
    let delta_millis = ((target.time_sec - anchor.time_sec) * 1000.0).round() as i64;
    let mut h = FNV_OFFSET_BASIS;
    h = fnv_mix(h, anchor.freq_idx as u64);
    h = fnv_mix(h, target.freq_idx as u64);
    h = fnv_mix(h, delta_millis as u64);
    h
}

fn fnv_mix(mut h: u64, value: u64) -> u64 {
    for byte in value.to_le_bytes() {
        h ^= byte as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}
