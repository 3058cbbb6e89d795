//! Float-sample to 16-bit PCM conversion for the wire.
//!
//! The transcription service consumes raw little-endian signed 16-bit
//! samples, so every captured block goes through here before it is
//! handed to the transport.

/// Convert one float sample in [-1.0, 1.0] to a signed 16-bit sample.
///
/// Symmetric scaling: negative values scale by 32768, non-negative by
/// 32767, rounded to nearest. Out-of-range input is clamped first.
pub fn encode_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round() as i16
}

/// Convert a block of float samples to 16-bit PCM, preserving length.
pub fn encode(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

/// Pack samples as little-endian bytes for a binary transport frame.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
