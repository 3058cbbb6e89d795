pub mod player;
pub mod sink;

pub use player::SpeechPlayer;
pub use sink::{PlaybackBackend, PlaybackHandle, PlaybackSink, RodioOutput};
