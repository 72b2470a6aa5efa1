//! Audio file decoding: any symphonia-supported container → mono i16 PCM.

use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use crate::config::FingerprintConfig;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no audio stream found in input")]
    NoAudioStream,
    #[error("decoded zero samples")]
    EmptyAudio,
    #[error("codec error: {0}")]
    Codec(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode an audio file to mono `i16` PCM at `config.sample_rate`.
///
/// Best-effort concatenation: a mid-stream codec error truncates the decode
/// at the last good frame rather than failing the whole file. Absence of any
/// audio stream, or zero decoded samples, are fatal.
pub fn decode_audio(path: &Path, config: &FingerprintConfig) -> Result<Vec<i16>, DecodeError> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut format = probed.format;
    let track = format.default_track().ok_or(DecodeError::NoAudioStream)?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params.sample_rate.unwrap_or(config.sample_rate);
    let channels = codec_params.channels.map(|c| c.count()).max(Some(1)).unwrap();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut floats: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            // A recoverable codec error mid-stream: stop here, keep what we have.
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };
        let spec = *decoded.spec();
        let n_frames = decoded.capacity();
        let mut sample_buf = SampleBuffer::<f32>::new(n_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(channels) {
            let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
            floats.push(mono);
        }
    }

    if floats.is_empty() {
        return Err(DecodeError::EmptyAudio);
    }

    if source_rate != config.sample_rate {
        floats = resample(&floats, source_rate, config.sample_rate);
    }

    if floats.is_empty() {
        return Err(DecodeError::EmptyAudio);
    }

    Ok(floats.into_iter().map(f32_to_i16).collect())
}

/// `[-1.0, 1.0]` float sample to signed 16-bit, per spec §4.1's scaling rule.
fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// High-quality resampling via sinc interpolation (mirrors the teacher's
/// `ear::decode::resample`).
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    use rubato::{FftFixedIn, Resampler};

    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler =
        match FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1) {
            Ok(r) => r,
            Err(_) => return samples.to_vec(),
        };

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    let mut pos = 0;
    while pos + chunk_size <= samples.len() {
        let chunk = vec![samples[pos..pos + chunk_size].to_vec()];
        if let Ok(out) = resampler.process(&chunk, None) {
            if let Some(ch) = out.first() {
                output.extend_from_slice(ch);
            }
        }
        pos += chunk_size;
    }

    if pos < samples.len() {
        let remaining = samples.len() - pos;
        let mut padded = samples[pos..].to_vec();
        padded.resize(chunk_size, 0.0);
        let chunk = vec![padded];
        if let Ok(out) = resampler.process(&chunk, None) {
            if let Some(ch) = out.first() {
                let take = ((remaining as f64 * ratio) as usize).min(ch.len());
                output.extend_from_slice(&ch[..take]);
            }
        }
    }

    output
}
