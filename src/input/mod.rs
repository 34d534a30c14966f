pub mod wav;

use crate::error::{Result, WavSinkError};

pub use wav::WavLoader;

/// Shortest recording that still paces realistically (256K samples per channel)
pub const MIN_SAMPLES_PER_CHANNEL: usize = 256 * 1024;

/// Decoded recording as produced by a loader: per-channel sample arrays plus
/// the shape reported by the container.
#[derive(Debug, Clone)]
pub struct Recording {
    channels: u16,
    bits_per_sample: u16,
    sample_rate: u32,
    samples: Vec<Vec<i16>>,
}

impl Recording {
    pub fn new(
        channels: u16,
        bits_per_sample: u16,
        sample_rate: u32,
        samples: Vec<Vec<i16>>,
    ) -> Self {
        Self {
            channels,
            bits_per_sample,
            sample_rate,
            samples,
        }
    }

    /// Two-channel 16-bit recording, I on channel 0 and Q on channel 1
    pub fn iq(sample_rate: u32, i: Vec<i16>, q: Vec<i16>) -> Self {
        Self::new(2, 16, sample_rate, vec![i, q])
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> &[i16] {
        self.samples.get(index).map_or(&[], Vec::as_slice)
    }

    /// Check the shape required for replay. `file_name` only labels the error.
    pub fn validate(&self, file_name: &str) -> Result<()> {
        if self.channels != 2 || self.samples.len() != 2 {
            return Err(WavSinkError::invalid_recording(
                file_name,
                format!("audio file with 2 channels expected, got {}", self.channels),
            ));
        }
        if self.bits_per_sample != 16 {
            return Err(WavSinkError::invalid_recording(
                file_name,
                format!("audio file with 16 bit depth expected, got {}", self.bits_per_sample),
            ));
        }
        if self.sample_rate == 0 {
            return Err(WavSinkError::invalid_recording(file_name, "sample rate is zero"));
        }
        if self.samples[0].len() != self.samples[1].len() {
            return Err(WavSinkError::invalid_recording(
                file_name,
                format!(
                    "channel lengths differ ({} vs {})",
                    self.samples[0].len(),
                    self.samples[1].len()
                ),
            ));
        }
        if self.samples_per_channel() < MIN_SAMPLES_PER_CHANNEL {
            return Err(WavSinkError::invalid_recording(
                file_name,
                format!(
                    "audio file is too short ({} samples per channel, at least {} required)",
                    self.samples_per_channel(),
                    MIN_SAMPLES_PER_CHANNEL
                ),
            ));
        }
        Ok(())
    }
}

/// Failure reported by a [`RecordingLoader`]
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Turns a file identifier into a decoded [`Recording`]
pub trait RecordingLoader {
    fn load(&self, file_name: &str) -> std::result::Result<Recording, LoadError>;
}
