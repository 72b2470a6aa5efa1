//! Short-time Fourier power spectrogram.

use std::f32::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::FingerprintConfig;

/// Dense power spectrogram with physical coordinate axes.
///
/// `power[f][t]` is the non-negative power at frequency bin `f`, time frame
/// `t`. `freqs`/`times` are strictly monotonically increasing and index the
/// same axes as `power`'s outer/inner dimensions respectively.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub freqs: Vec<f32>,
    pub times: Vec<f32>,
    pub power: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn n_freqs(&self) -> usize {
        self.freqs.len()
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }
}

/// Compute a power spectrogram from mono PCM samples.
///
/// Window length is `config.nperseg()` samples, 50% overlap, Hann window,
/// one-sided density scaling — see spec §4.2.
pub fn spectrogram(samples: &[i16], config: &FingerprintConfig) -> Spectrogram {
    let nperseg = config.nperseg().max(2);
    let hop = (nperseg / 2).max(1);
    let sample_rate = config.sample_rate as f32;

    let window = hann_window(nperseg);
    let window_sq_sum: f32 = window.iter().map(|w| w * w).sum();

    let n_bins = nperseg / 2 + 1;
    let freqs: Vec<f32> = (0..n_bins)
        .map(|i| i as f32 * sample_rate / nperseg as f32)
        .collect();

    let floats: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let mut times = Vec::new();
    let mut power: Vec<Vec<f32>> = vec![Vec::new(); n_bins];

    let mut pos = 0;
    while pos + nperseg <= floats.len() {
        let mut buf: Vec<Complex<f32>> = (0..nperseg)
            .map(|i| Complex::new(floats[pos + i] * window[i], 0.0))
            .collect();
        fft.process(&mut buf);

        for (bin, slot) in power.iter_mut().enumerate().take(n_bins) {
            let mag_sq = buf[bin].norm_sqr();
            let mut p = mag_sq / (sample_rate * window_sq_sum);
            // One-sided density: double all bins except DC and (if present) Nyquist.
            if bin != 0 && !(nperseg % 2 == 0 && bin == n_bins - 1) {
                p *= 2.0;
            }
            slot.push(p);
        }

        times.push((pos as f32 + nperseg as f32 / 2.0) / sample_rate);
        pos += hop;
    }

    Spectrogram { freqs, times, power }
}

fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}
