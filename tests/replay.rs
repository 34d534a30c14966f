//! End-to-end replay of WAV fixtures through discovery, activation and pacing

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use wav_sink::input::MIN_SAMPLES_PER_CHANNEL;
use wav_sink::pacing::BASE_SLICE_SIZE;
use wav_sink::{
    find_devices, make_device, parse_kwargs, Clock, Direction, DriverConfig, ManualClock,
    SampleBuffer, VirtualSource, WavLoader, WavSinkError,
};

/// Write an IQ WAV where I counts up and Q counts down
fn write_fixture(dir: &Path, name: &str, spec: WavSpec, frames: usize) -> PathBuf {
    let path = dir.join(name);
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for n in 0..frames {
        let v = (n % 32_000) as i32;
        for ch in 0..spec.channels {
            let sample = if ch % 2 == 0 { v } else { -v };
            if spec.bits_per_sample == 8 {
                writer.write_sample((sample % 128) as i8).unwrap();
            } else {
                writer.write_sample(sample as i16).unwrap();
            }
        }
    }
    writer.finalize().unwrap();
    path
}

fn iq_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn discovers_and_opens_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "rx.wav", iq_spec(96_000), MIN_SAMPLES_PER_CHANNEL);

    let config = DriverConfig::new(Some(path_str(&path).to_string()));
    let found = find_devices(&parse_kwargs("driver=wav_sink"), &config);
    assert_eq!(found.len(), 1);

    let source = make_device(&found[0]).unwrap();
    assert_eq!(source.sample_rate(), 96_000.0);
    assert_eq!(source.recording().samples_per_channel(), MIN_SAMPLES_PER_CHANNEL);
    assert_eq!(source.hardware_info()["file_name"], path_str(&path));
}

#[test]
fn rejects_unsuitable_recordings() {
    let dir = tempfile::tempdir().unwrap();

    let short = write_fixture(dir.path(), "short.wav", iq_spec(96_000), 1024);
    let mono = write_fixture(
        dir.path(),
        "mono.wav",
        WavSpec {
            channels: 1,
            ..iq_spec(96_000)
        },
        MIN_SAMPLES_PER_CHANNEL,
    );
    let eight_bit = write_fixture(
        dir.path(),
        "8bit.wav",
        WavSpec {
            bits_per_sample: 8,
            ..iq_spec(96_000)
        },
        MIN_SAMPLES_PER_CHANNEL,
    );

    for path in [&short, &mono, &eight_bit] {
        let err = VirtualSource::open(path_str(path)).err().unwrap();
        assert!(
            matches!(err, WavSinkError::InvalidRecording { .. }),
            "{}: {err}",
            path.display()
        );
    }
}

#[test]
fn replay_loops_over_the_recording() {
    let dir = tempfile::tempdir().unwrap();
    let frames = MIN_SAMPLES_PER_CHANNEL + 1000;
    let path = write_fixture(dir.path(), "loop.wav", iq_spec(96_000), frames);

    let clock = ManualClock::new();
    let mut source = VirtualSource::open_with(&WavLoader, path_str(&path), clock.clone()).unwrap();
    let handle = source.open_stream(Direction::Rx, "CS16", &[0]).unwrap();
    source.activate(handle, 0).unwrap();

    let mut buf = vec![0i16; 2 * BASE_SLICE_SIZE];
    let mut delivered = 0u64;
    let mut positions = Vec::new();
    while delivered < 10 * BASE_SLICE_SIZE as u64 {
        let n = source
            .read_stream(handle, &mut SampleBuffer::Cs16(&mut buf), usize::MAX)
            .unwrap();
        assert!(n == 0 || n == BASE_SLICE_SIZE);
        if n > 0 {
            delivered += n as u64;
            positions.push(source.cursor().position());
        }
    }

    // eight slices fit, the ninth wraps back to the start of the file
    assert_eq!(positions[7], 8 * BASE_SLICE_SIZE);
    assert_eq!(positions[8], BASE_SLICE_SIZE);
    assert_eq!(positions[9], 2 * BASE_SLICE_SIZE);

    // buffer holds the second slice after the wrap: I = n, Q = -n
    let first = (BASE_SLICE_SIZE % 32_000) as i16;
    assert_eq!(&buf[..2], &[first, -first]);

    // simulated time only moved by throttle sleeps; the last slice was due
    let due = clock.now_ms() * 96_000 / 1000;
    assert!(due >= source.cursor().delivered());
}

#[test]
fn float_stream_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "f.wav", iq_spec(700_000), MIN_SAMPLES_PER_CHANNEL);

    let clock = ManualClock::new();
    let mut source = VirtualSource::open_with(&WavLoader, path_str(&path), clock.clone()).unwrap();
    let handle = source.open_stream(Direction::Rx, "CF32", &[]).unwrap();
    source.activate(handle, 0).unwrap();
    clock.advance(Duration::from_secs(1));

    let mut buf = vec![0.0f32; 2 * 2 * BASE_SLICE_SIZE];
    let n = source
        .read_stream(handle, &mut SampleBuffer::Cf32(&mut buf), usize::MAX)
        .unwrap();

    // 700 kHz doubles the slice
    assert_eq!(n, 2 * BASE_SLICE_SIZE);
    assert_eq!(buf[2 * 16384], 0.5);
    assert_eq!(buf[2 * 16384 + 1], -0.5);
}

#[test]
fn wall_clock_pacing_holds_back_early_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "rt.wav", iq_spec(96_000), MIN_SAMPLES_PER_CHANNEL);

    let mut source = make_device(&parse_kwargs(&format!("file_name={}", path_str(&path)))).unwrap();
    let handle = source.open_stream(Direction::Rx, "CS16", &[0]).unwrap();
    let mut buf = vec![0i16; 2 * 4096];

    source.activate(handle, 0).unwrap();
    let started = Instant::now();

    // nothing is due right after activation
    assert_eq!(
        source.read_stream(handle, &mut SampleBuffer::Cs16(&mut buf), 4096).unwrap(),
        0
    );

    // 4096 samples at 96 kHz are due after ~43 ms
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(
        source.read_stream(handle, &mut SampleBuffer::Cs16(&mut buf), 4096).unwrap(),
        4096
    );

    while source.cursor().delivered() < 4 * 4096 {
        source.read_stream(handle, &mut SampleBuffer::Cs16(&mut buf), 4096).unwrap();
    }

    // 16384 samples cannot be handed out before ~170 ms of real time
    assert!(started.elapsed() >= Duration::from_millis(165));

    source.deactivate(handle, 0).unwrap();
    assert!(matches!(
        source.read_stream(handle, &mut SampleBuffer::Cs16(&mut buf), 4096),
        Err(WavSinkError::StreamNotActive)
    ));
    source.close_stream(handle);
}
