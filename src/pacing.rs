//! Real-time pacing and delivery of recorded IQ samples
//!
//! Each poll works out how many samples a real device would have produced
//! since activation. A slice is handed out only once the whole slice is due,
//! otherwise the caller is held back for [`THROTTLE_INTERVAL`] and gets zero
//! samples. The recording loops forever: a slice that would run past the end
//! restarts from sample 0 instead.

use std::time::Duration;

use crate::clock::Clock;
use crate::format::SampleBuffer;
use crate::input::Recording;

/// Baseline slice size in samples per channel
pub const BASE_SLICE_SIZE: usize = 32768;

/// Pause applied when the next slice is not due yet
pub const THROTTLE_INTERVAL: Duration = Duration::from_millis(5);

/// Read position and delivery accounting for an activated source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackCursor {
    position: usize,
    delivered: u64,
    started_at_ms: u64,
}

impl PlaybackCursor {
    /// Index of the next sample to read in each channel
    pub fn position(&self) -> usize {
        self.position
    }

    /// Samples delivered since the last activation
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Clock reading taken at activation
    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub(crate) fn restart(&mut self, now_ms: u64) {
        *self = Self {
            position: 0,
            delivered: 0,
            started_at_ms: now_ms,
        };
    }
}

/// Slice size for a poll: the baseline scaled by sample rate, then capped at `requested`.
///
/// Faster captures need bigger slices. The two thresholds are empirical.
pub fn slice_size(sample_rate: u32, requested: usize) -> usize {
    let scaled = if sample_rate > 1_000_000 {
        BASE_SLICE_SIZE * 4
    } else if sample_rate > 500_000 {
        BASE_SLICE_SIZE * 2
    } else {
        BASE_SLICE_SIZE
    };
    scaled.min(requested)
}

/// Samples a real device would have produced after `elapsed_ms`
pub fn due_samples(elapsed_ms: u64, sample_rate: u32) -> u64 {
    elapsed_ms.saturating_mul(sample_rate as u64) / 1000
}

/// Deliver one slice into `buffer`, or throttle and return 0 if it is not due yet.
///
/// `requested` is capped at the buffer's capacity. The return value is always
/// either 0 or the full slice size.
pub fn deliver<C: Clock>(
    recording: &Recording,
    cursor: &mut PlaybackCursor,
    clock: &C,
    buffer: &mut SampleBuffer<'_>,
    requested: usize,
) -> usize {
    let sample_rate = recording.sample_rate();
    let slice = slice_size(sample_rate, requested.min(buffer.capacity()));

    // never read past the end in one go
    if cursor.position + slice > recording.samples_per_channel() {
        cursor.position = 0;
    }

    let elapsed_ms = clock.now_ms().saturating_sub(cursor.started_at_ms);
    let due = due_samples(elapsed_ms, sample_rate);
    if due < cursor.delivered + slice as u64 {
        clock.sleep(THROTTLE_INTERVAL);
        return 0;
    }

    let range = cursor.position..cursor.position + slice;
    buffer.fill(
        &recording.channel(0)[range.clone()],
        &recording.channel(1)[range],
    );

    cursor.position += slice;
    cursor.delivered += slice as u64;
    slice
}
