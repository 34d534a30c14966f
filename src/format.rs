use std::fmt;
use std::str::FromStr;

use crate::error::WavSinkError;

/// Full scale of the native CS16 representation.
pub const NATIVE_FULL_SCALE: f64 = 32768.0;

/// Stream direction. Only RX is backed by a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Interleaved IQ representations a stream can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamFormat {
    /// Complex signed 16-bit, the recording's native layout
    Cs16,
    /// Complex float32 normalized to [-1, 1)
    Cf32,
}

impl StreamFormat {
    pub const SUPPORTED: [StreamFormat; 2] = [StreamFormat::Cs16, StreamFormat::Cf32];

    pub fn name(&self) -> &'static str {
        match self {
            StreamFormat::Cs16 => "CS16",
            StreamFormat::Cf32 => "CF32",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamFormat {
    type Err = WavSinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CS16" => Ok(StreamFormat::Cs16),
            "CF32" => Ok(StreamFormat::Cf32),
            _ => Err(WavSinkError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Caller-owned interleaved output buffer (I, Q, I, Q, ...)
#[derive(Debug)]
pub enum SampleBuffer<'a> {
    Cs16(&'a mut [i16]),
    Cf32(&'a mut [f32]),
}

impl SampleBuffer<'_> {
    pub fn format(&self) -> StreamFormat {
        match self {
            SampleBuffer::Cs16(_) => StreamFormat::Cs16,
            SampleBuffer::Cf32(_) => StreamFormat::Cf32,
        }
    }

    /// Number of IQ pairs the buffer can hold
    pub fn capacity(&self) -> usize {
        match self {
            SampleBuffer::Cs16(buf) => buf.len() / 2,
            SampleBuffer::Cf32(buf) => buf.len() / 2,
        }
    }

    /// Write `i` and `q` channel slices as interleaved pairs from the start of the buffer
    pub(crate) fn fill(&mut self, i: &[i16], q: &[i16]) {
        match self {
            SampleBuffer::Cs16(buf) => {
                for ((pair, &i), &q) in buf.chunks_exact_mut(2).zip(i).zip(q) {
                    pair[0] = i;
                    pair[1] = q;
                }
            }
            SampleBuffer::Cf32(buf) => {
                let scale = NATIVE_FULL_SCALE as f32;
                for ((pair, &i), &q) in buf.chunks_exact_mut(2).zip(i).zip(q) {
                    pair[0] = i as f32 / scale;
                    pair[1] = q as f32 / scale;
                }
            }
        }
    }
}
