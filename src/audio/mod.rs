pub mod capture;
pub mod pcm;

pub use capture::{CaptureBackend, CaptureConfig, CapturePipeline, CaptureState, CpalCapture};
