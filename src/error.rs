use thiserror::Error;

use crate::format::Direction;
use crate::source::StreamHandle;

pub type Result<T> = std::result::Result<T, WavSinkError>;

#[derive(Error, Debug)]
pub enum WavSinkError {
    #[error("Invalid recording {file_name}: {reason}")]
    InvalidRecording { file_name: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported stream format '{0}', only CS16 and CF32 are supported")]
    UnsupportedFormat(String),

    #[error("Unsupported {operation} flags: {flags}")]
    UnsupportedOption { operation: &'static str, flags: i32 },

    #[error("Stream is not active")]
    StreamNotActive,

    #[error("Unsupported direction {0:?}, wav_sink is RX only")]
    UnsupportedDirection(Direction),

    #[error("Unknown stream handle {0}")]
    UnknownStream(StreamHandle),

    #[error("Unsupported channel {0}, only channel 0 is available")]
    UnsupportedChannel(usize),

    #[error("Buffer holds {actual} samples but stream format is {expected}")]
    BufferMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl WavSinkError {
    pub(crate) fn invalid_recording(file_name: &str, reason: impl Into<String>) -> Self {
        WavSinkError::InvalidRecording {
            file_name: file_name.to_string(),
            reason: reason.into(),
        }
    }
}
