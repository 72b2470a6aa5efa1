//! Local-maximum peak picking over a power spectrogram, with a density cap.

use crate::config::FingerprintConfig;
use crate::spectrogram::Spectrogram;

/// A single constellation point: a local power maximum at a given
/// frequency/time bin. Carries both bin indices (for hashing, which must be
/// exact-integer stable) and physical units (for reporting/inspection).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub freq_idx: usize,
    pub time_idx: usize,
    pub freq_hz: f32,
    pub time_sec: f32,
    pub power: f32,
}

/// Find local maxima of `spec.power` within a `peak_box_size`-square
/// neighborhood, then keep only the strongest ones up to a density cap.
///
/// A bin is a peak if no other bin within `box_size/2` in either axis holds
/// strictly greater power; out-of-bounds neighbors are treated as zero power,
/// which never disqualifies a candidate since power is never negative.
/// Surviving candidates are sorted by descending power and truncated to
/// `floor(n_freqs * n_times / box_size^2 * point_efficiency)` — the number of
/// points a perfectly spaced grid could fit into the spectrogram's area,
/// scaled down by `point_efficiency`. This matches the reference
/// implementation's density formula exactly.
pub fn find_peaks(spec: &Spectrogram, config: &FingerprintConfig) -> Vec<Peak> {
    let box_size = config.peak_box_size;
    let half = (box_size / 2) as isize;
    let n_freqs = spec.n_freqs();
    let n_times = spec.n_times();

    let mut candidates = Vec::new();

    for f in 0..n_freqs {
        for t in 0..n_times {
            let value = spec.power[f][t];
            if is_local_max(spec, f, t, value, half, n_freqs, n_times) {
                candidates.push(Peak {
                    freq_idx: f,
                    time_idx: t,
                    freq_hz: spec.freqs[f],
                    time_sec: spec.times[t],
                    power: value,
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.power.total_cmp(&a.power));

    let total = n_freqs * n_times;
    let area = (box_size * box_size) as f32;
    let target = ((total as f32 / area) * config.point_efficiency) as usize;
    candidates.truncate(target);
    candidates
}

fn is_local_max(
    spec: &Spectrogram,
    f: usize,
    t: usize,
    value: f32,
    half: isize,
    n_freqs: usize,
    n_times: usize,
) -> bool {
    for df in -half..=half {
        let ff = f as isize + df;
        if ff < 0 || ff as usize >= n_freqs {
            continue;
        }
        for dt in -half..=half {
            let tt = t as isize + dt;
            if tt < 0 || tt as usize >= n_times {
                continue;
            }
            if spec.power[ff as usize][tt as usize] > value {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_wave(freq: f32, duration_secs: f32, sample_rate: u32) -> Vec<i16> {
        let n = (sample_rate as f32 * duration_secs) as usize;
        (0..n)
            .map(|i| {
                let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
                (s * 20000.0) as i16
            })
            .collect()
    }

    #[test]
    fn peaks_fall_within_spectrogram_bounds() {
        let config = FingerprintConfig::default();
        let samples = sine_wave(440.0, 3.0, config.sample_rate);
        let spec = crate::spectrogram::spectrogram(&samples, &config);
        let peaks = find_peaks(&spec, &config);
        for p in &peaks {
            assert!(p.freq_idx < spec.n_freqs());
            assert!(p.time_idx < spec.n_times());
        }
    }

    #[test]
    fn peaks_are_sorted_by_descending_power() {
        let config = FingerprintConfig::default();
        let samples = sine_wave(440.0, 3.0, config.sample_rate);
        let spec = crate::spectrogram::spectrogram(&samples, &config);
        let peaks = find_peaks(&spec, &config);
        assert!(peaks.windows(2).all(|w| w[0].power >= w[1].power));
    }

    #[test]
    fn higher_point_efficiency_yields_at_least_as_many_peaks() {
        let config_low = FingerprintConfig::default().with_point_efficiency(0.1);
        let config_high = FingerprintConfig::default().with_point_efficiency(0.9);
        let samples = sine_wave(440.0, 3.0, config_low.sample_rate);

        let spec_low = crate::spectrogram::spectrogram(&samples, &config_low);
        let spec_high = crate::spectrogram::spectrogram(&samples, &config_high);

        let low = find_peaks(&spec_low, &config_low);
        let high = find_peaks(&spec_high, &config_high);
        assert!(high.len() >= low.len());
    }

    #[test]
    fn silence_yields_no_or_trivial_peaks() {
        let config = FingerprintConfig::default();
        let samples = vec![0i16; config.sample_rate as usize * 2];
        let spec = crate::spectrogram::spectrogram(&samples, &config);
        let peaks = find_peaks(&spec, &config);
        assert!(peaks.iter().all(|p| p.power == 0.0));
    }
}
