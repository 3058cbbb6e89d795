//! HTTP clients for the request/response collaborators: speech
//! synthesis and the legacy upload-and-transcribe path.

pub mod tts;
pub mod upload;

pub use tts::{HttpSynthesizer, Synthesizer};
pub use upload::{wav_bytes, UploadClient, UploadResponse};
