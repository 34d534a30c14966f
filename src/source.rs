//! Virtual RX device backed by a looping IQ recording

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, WavSinkError};
use crate::format::{Direction, SampleBuffer, StreamFormat, NATIVE_FULL_SCALE};
use crate::input::{Recording, RecordingLoader, WavLoader};
use crate::pacing::{self, PlaybackCursor};
use crate::registry::{Kwargs, DRIVER_NAME, FILE_NAME_KEY, ORIGIN};

/// Opaque identifier for a stream opened on a [`VirtualSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u64);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct StreamSession {
    format: StreamFormat,
}

/// A recording exposed as a live sample source.
///
/// One consumer drives a source: activation, polling and deactivation all
/// take `&mut self`, so sharing a source across threads requires the caller
/// to serialize access.
pub struct VirtualSource<C: Clock = SystemClock> {
    file_name: String,
    recording: Recording,
    clock: C,
    sessions: HashMap<StreamHandle, StreamSession>,
    next_handle: u64,
    active: bool,
    cursor: PlaybackCursor,
}

impl VirtualSource<SystemClock> {
    /// Open a WAV recording paced by wall-clock time
    pub fn open(file_name: &str) -> Result<Self> {
        Self::open_with(&WavLoader, file_name, SystemClock::new())
    }
}

impl<C: Clock> VirtualSource<C> {
    pub fn open_with<L: RecordingLoader + ?Sized>(
        loader: &L,
        file_name: &str,
        clock: C,
    ) -> Result<Self> {
        let recording = loader.load(file_name).map_err(|e| {
            warn!("Unable to open wav file {}: {}", file_name, e);
            WavSinkError::invalid_recording(file_name, format!("unable to open wav file: {e}"))
        })?;
        Self::from_recording(file_name, recording, clock)
    }

    /// Wrap an already decoded recording after validating its shape
    pub fn from_recording(
        file_name: impl Into<String>,
        recording: Recording,
        clock: C,
    ) -> Result<Self> {
        let file_name = file_name.into();
        if let Err(e) = recording.validate(&file_name) {
            warn!(
                "Rejected {}: channels={} bits={} rate={} samples/channel={}",
                file_name,
                recording.channels(),
                recording.bits_per_sample(),
                recording.sample_rate(),
                recording.samples_per_channel()
            );
            return Err(e);
        }

        info!(
            "Loaded {} ({} samples/channel at {} Hz)",
            file_name,
            recording.samples_per_channel(),
            recording.sample_rate()
        );

        Ok(Self {
            file_name,
            recording,
            clock,
            sessions: HashMap::new(),
            next_handle: 1,
            active: false,
            cursor: PlaybackCursor::default(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn driver_key(&self) -> &'static str {
        DRIVER_NAME
    }

    pub fn hardware_key(&self) -> &str {
        &self.file_name
    }

    pub fn hardware_info(&self) -> Kwargs {
        let mut info = Kwargs::new();
        info.insert(FILE_NAME_KEY.to_string(), self.file_name.clone());
        info.insert("origin".to_string(), ORIGIN.to_string());
        info
    }

    pub fn num_channels(&self, direction: Direction) -> usize {
        match direction {
            Direction::Rx => 1,
            Direction::Tx => 0,
        }
    }

    pub fn full_duplex(&self) -> bool {
        false
    }

    /// The recording's rate; no resampling is offered
    pub fn sample_rate(&self) -> f64 {
        self.recording.sample_rate() as f64
    }

    pub fn list_sample_rates(&self) -> Vec<f64> {
        vec![self.sample_rate()]
    }

    pub fn stream_formats(&self) -> &'static [StreamFormat] {
        &StreamFormat::SUPPORTED
    }

    /// Native format and its full-scale value
    pub fn native_format(&self, direction: Direction) -> Result<(StreamFormat, f64)> {
        if direction != Direction::Rx {
            return Err(WavSinkError::UnsupportedDirection(direction));
        }
        Ok((StreamFormat::Cs16, NATIVE_FULL_SCALE))
    }

    /// Open a stream delivering `format` ("CS16" or "CF32"). Only RX channel 0 exists.
    pub fn open_stream(
        &mut self,
        direction: Direction,
        format: &str,
        channels: &[usize],
    ) -> Result<StreamHandle> {
        info!("setup_stream num_channels={} format={}", channels.len(), format);

        if direction != Direction::Rx {
            return Err(WavSinkError::UnsupportedDirection(direction));
        }
        if let Some(&channel) = channels.iter().find(|&&ch| ch != 0) {
            return Err(WavSinkError::UnsupportedChannel(channel));
        }
        let format = format.parse::<StreamFormat>().inspect_err(|_| {
            error!("Invalid stream format '{}'", format);
        })?;

        let handle = StreamHandle(self.next_handle);
        self.next_handle += 1;
        self.sessions.insert(handle, StreamSession { format });
        Ok(handle)
    }

    /// Deactivate and forget a stream. Unknown handles are ignored.
    pub fn close_stream(&mut self, handle: StreamHandle) {
        if self.sessions.remove(&handle).is_some() {
            self.active = false;
            debug!("Closed stream {}", handle);
        } else {
            debug!("close_stream on unknown stream {}", handle);
        }
    }

    /// Start delivery: resets the cursor and takes a new time reference.
    /// Only `flags == 0` is supported.
    pub fn activate(&mut self, handle: StreamHandle, flags: i32) -> Result<()> {
        let session = self.session(handle)?;
        info!("activate_stream format={} flags={}", session.format, flags);

        if flags != 0 {
            return Err(WavSinkError::UnsupportedOption {
                operation: "activate",
                flags,
            });
        }

        self.active = true;
        self.cursor.restart(self.clock.now_ms());
        Ok(())
    }

    /// Stop delivery. The cursor is kept for inspection until the next activation.
    pub fn deactivate(&mut self, handle: StreamHandle, flags: i32) -> Result<()> {
        self.session(handle)?;
        debug!("deactivate_stream flags={}", flags);

        if flags != 0 {
            return Err(WavSinkError::UnsupportedOption {
                operation: "deactivate",
                flags,
            });
        }

        self.active = false;
        Ok(())
    }

    /// Poll for the next slice of samples.
    ///
    /// Returns 0 when the slice is not due yet (after a short throttle sleep),
    /// otherwise the number of IQ pairs written to `buffer`.
    pub fn read_stream(
        &mut self,
        handle: StreamHandle,
        buffer: &mut SampleBuffer<'_>,
        requested: usize,
    ) -> Result<usize> {
        let session = self.session(handle)?;
        if !self.active {
            return Err(WavSinkError::StreamNotActive);
        }
        if buffer.format() != session.format {
            return Err(WavSinkError::BufferMismatch {
                expected: session.format.name(),
                actual: buffer.format().name(),
            });
        }

        Ok(pacing::deliver(
            &self.recording,
            &mut self.cursor,
            &self.clock,
            buffer,
            requested,
        ))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn stream_format(&self, handle: StreamHandle) -> Option<StreamFormat> {
        self.sessions.get(&handle).map(|s| s.format)
    }

    fn session(&self, handle: StreamHandle) -> Result<StreamSession> {
        self.sessions
            .get(&handle)
            .copied()
            .ok_or(WavSinkError::UnknownStream(handle))
    }
}
