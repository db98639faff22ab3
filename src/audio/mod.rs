pub mod buffer;
#[cfg(feature = "audio-io")]
pub mod recorder;
pub mod silence;
pub mod wav;

pub use buffer::LevelTap;
#[cfg(feature = "audio-io")]
pub use recorder::Recorder;
pub use silence::{SilenceConfig, SilenceDetector, SilenceTracker, SpeechEvent};
pub use wav::encode_wav;

/// A finished microphone capture: WAV-encoded bytes plus the generated
/// upload filename
#[derive(Debug, Clone)]
pub struct RecordedAudio {
    pub data: Vec<u8>,
    pub title: String,
}
