use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;

use super::{LoadError, Recording, RecordingLoader};

/// Loads recordings from WAV files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct WavLoader;

impl RecordingLoader for WavLoader {
    fn load(&self, file_name: &str) -> Result<Recording, LoadError> {
        read_wav(file_name)
    }
}

/// Read a WAV file into per-channel arrays (HDSDR/SDR++ IQ: I=left, Q=right)
///
/// Only integer data of 16 bits or less is decoded. Anything else comes back
/// with its header shape and no samples so validation can reject it.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Recording, LoadError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let bits_per_sample = match spec.sample_format {
        SampleFormat::Int => spec.bits_per_sample,
        SampleFormat::Float => 32,
    };

    let samples = if spec.sample_format == SampleFormat::Int && spec.bits_per_sample <= 16 {
        read_int16_channels(reader, spec.channels)?
    } else {
        vec![Vec::new(); spec.channels as usize]
    };

    Ok(Recording::new(spec.channels, bits_per_sample, spec.sample_rate, samples))
}

fn read_int16_channels<R: Read>(
    mut reader: WavReader<R>,
    channels: u16,
) -> Result<Vec<Vec<i16>>, hound::Error> {
    let channels = channels.max(1) as usize;
    let per_channel = reader.duration() as usize;
    let mut samples: Vec<Vec<i16>> = (0..channels)
        .map(|_| Vec::with_capacity(per_channel))
        .collect();

    for (idx, sample) in reader.samples::<i16>().enumerate() {
        samples[idx % channels].push(sample?);
    }

    Ok(samples)
}
