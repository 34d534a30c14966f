//! Virtual SDR receiver that replays a two-channel (I/Q) WAV recording in real time.
//!
//! ```no_run
//! use wav_sink::{Direction, SampleBuffer, VirtualSource};
//!
//! let mut source = VirtualSource::open("HDSDR_20120317_155627Z_RDXC_CW_14045kHz_RF.wav")?;
//! let stream = source.open_stream(Direction::Rx, "CF32", &[0])?;
//! source.activate(stream, 0)?;
//!
//! let mut buf = vec![0.0f32; 2 * 16384];
//! loop {
//!     let n = source.read_stream(stream, &mut SampleBuffer::Cf32(&mut buf), 16384)?;
//!     if n > 0 {
//!         println!("got {} samples", n);
//!         break;
//!     }
//! }
//! source.close_stream(stream);
//! # Ok::<(), wav_sink::WavSinkError>(())
//! ```

pub mod clock;
pub mod error;
pub mod format;
pub mod input;
pub mod monitor;
pub mod output;
pub mod pacing;
pub mod registry;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, WavSinkError};
pub use format::{Direction, SampleBuffer, StreamFormat};
pub use input::{LoadError, Recording, RecordingLoader, WavLoader};
pub use pacing::PlaybackCursor;
pub use registry::{find_devices, make_device, parse_kwargs, DriverConfig, Kwargs};
pub use source::{StreamHandle, VirtualSource};
