use chrono::{DateTime, Local};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::Result;
use crate::format::StreamFormat;

/// Streams delivered chunks into a stereo WAV file
///
/// CS16 streams are written as int16 PCM (what HDSDR and URH expect), CF32
/// streams as float32 (inspectrum, SDR++).
pub struct CaptureWriter {
    writer: WavWriter<BufWriter<File>>,
    samples_written: u64,
}

impl CaptureWriter {
    pub fn create<P: AsRef<Path>>(path: P, format: StreamFormat, sample_rate: u32) -> Result<Self> {
        let spec = match format {
            StreamFormat::Cs16 => WavSpec {
                channels: 2,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
            StreamFormat::Cf32 => WavSpec {
                channels: 2,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        };

        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            samples_written: 0,
        })
    }

    /// IQ pairs written so far
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Append interleaved CS16 pairs
    pub fn write_cs16(&mut self, interleaved: &[i16]) -> Result<()> {
        for &sample in interleaved {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += (interleaved.len() / 2) as u64;
        Ok(())
    }

    /// Append interleaved CF32 pairs
    pub fn write_cf32(&mut self, interleaved: &[f32]) -> Result<()> {
        for &sample in interleaved {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += (interleaved.len() / 2) as u64;
        Ok(())
    }

    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

/// Generate output filename for a capture
pub fn generate_filename(
    file_name: &str,
    format: StreamFormat,
    start_time: DateTime<Local>,
) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("capture");

    format!(
        "{}_{}_{}.wav",
        stem,
        format.name().to_lowercase(),
        start_time.format("%Y-%m-%d_%H-%M-%S")
    )
}
