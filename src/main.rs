use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use wav_sink::monitor::PowerMeter;
use wav_sink::output::{generate_filename, CaptureWriter};
use wav_sink::registry::FILE_ENV_VAR;
use wav_sink::{
    find_devices, make_device, parse_kwargs, Direction, DriverConfig, Kwargs, SampleBuffer,
    StreamFormat,
};

/// Replay stereo IQ WAV recordings as a real-time virtual SDR receiver
#[derive(Parser, Debug)]
#[command(name = "wav-sink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Recording used when the device arguments carry no file_name
    #[arg(long, global = true, env = FILE_ENV_VAR, value_name = "FILE")]
    default_file: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List devices matching the arguments
    Find {
        /// Device arguments, e.g. "driver=wav_sink,file_name=rec.wav"
        #[arg(short, long, default_value = "")]
        args: String,
    },

    /// Print device properties
    Probe {
        #[arg(short, long, default_value = "")]
        args: String,
    },

    /// Stream from the device and report the delivered rate
    Stream {
        #[arg(short, long, default_value = "")]
        args: String,

        /// Stream format: CS16, CF32
        #[arg(short, long, default_value = "CS16")]
        format: String,

        /// Samples requested per read
        #[arg(short, long, default_value = "32768")]
        num_elems: usize,

        /// How long to stream in seconds
        #[arg(short, long, default_value = "5")]
        duration_secs: f64,

        /// Give up if no samples arrive for this many milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Write delivered samples to a WAV file in this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = DriverConfig::new(cli.default_file.clone());

    match &cli.command {
        Command::Find { args } => {
            let found = find_devices(&parse_kwargs(args), &config);
            if found.is_empty() {
                println!("No devices found");
            }
            for (idx, device) in found.iter().enumerate() {
                println!("Found device {}", idx);
                for (key, value) in device {
                    println!("  {} = {}", key, value);
                }
            }
        }
        Command::Probe { args } => {
            let device_args = resolve_device(args, &config)?;
            probe(&device_args)?;
        }
        Command::Stream {
            args,
            format,
            num_elems,
            duration_secs,
            timeout_ms,
            output_dir,
        } => {
            let device_args = resolve_device(args, &config)?;
            let format = format.parse::<StreamFormat>()?;
            stream(
                &device_args,
                format,
                *num_elems,
                Duration::from_secs_f64(duration_secs.max(0.0)),
                timeout_ms.map(Duration::from_millis),
                output_dir.as_deref(),
                cli.verbose,
            )?;
        }
    }

    Ok(())
}

/// Pick the first discovered device, as host tools do before constructing it
fn resolve_device(args: &str, config: &DriverConfig) -> Result<Kwargs, Box<dyn std::error::Error>> {
    find_devices(&parse_kwargs(args), config)
        .into_iter()
        .next()
        .ok_or_else(|| {
            format!("No device found (pass file_name=... or set {})", FILE_ENV_VAR).into()
        })
}

fn probe(device_args: &Kwargs) -> Result<(), Box<dyn std::error::Error>> {
    let source = make_device(device_args)?;

    println!("driver = {}", source.driver_key());
    println!("hardware = {}", source.hardware_key());
    for (key, value) in source.hardware_info() {
        println!("  {} = {}", key, value);
    }

    let (native, full_scale) = source.native_format(Direction::Rx)?;
    let formats: Vec<_> = source.stream_formats().iter().map(|f| f.name()).collect();
    println!("RX channels: {}", source.num_channels(Direction::Rx));
    println!("TX channels: {}", source.num_channels(Direction::Tx));
    println!("Full duplex: {}", source.full_duplex());
    println!("Sample rates: {:?} Hz", source.list_sample_rates());
    println!("Stream formats: {}", formats.join(", "));
    println!("Native format: {} [full-scale={}]", native, full_scale);

    let recording = source.recording();
    println!(
        "Recording: {} samples/channel ({:.2}s)",
        recording.samples_per_channel(),
        recording.samples_per_channel() as f64 / source.sample_rate()
    );

    Ok(())
}

fn stream(
    device_args: &Kwargs,
    format: StreamFormat,
    num_elems: usize,
    duration: Duration,
    timeout: Option<Duration>,
    output_dir: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = make_device(device_args)?;
    let sample_rate = source.sample_rate();
    let handle = source.open_stream(Direction::Rx, format.name(), &[0])?;

    let mut capture = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let filename = generate_filename(source.file_name(), format, Local::now());
            let writer = CaptureWriter::create(dir.join(&filename), format, sample_rate as u32)?;
            if verbose {
                println!("Writing to: {}", filename);
            }
            Some(writer)
        }
        None => None,
    };
    let mut meter = verbose.then(|| PowerMeter::new(4096));

    let mut native_buf = Vec::new();
    let mut float_buf = Vec::new();
    match format {
        StreamFormat::Cs16 => native_buf.resize(2 * num_elems, 0i16),
        StreamFormat::Cf32 => float_buf.resize(2 * num_elems, 0.0f32),
    }

    println!(
        "Streaming {} at {:.3} Msps for {:.1}s...",
        format,
        sample_rate / 1e6,
        duration.as_secs_f64()
    );

    source.activate(handle, 0)?;
    let started = Instant::now();
    let mut last_data = started;
    let mut last_report = started;
    let mut total: u64 = 0;
    let mut reads: u64 = 0;
    let mut throttled: u64 = 0;

    while started.elapsed() < duration {
        let mut buffer = match format {
            StreamFormat::Cs16 => SampleBuffer::Cs16(&mut native_buf),
            StreamFormat::Cf32 => SampleBuffer::Cf32(&mut float_buf),
        };
        let produced = source.read_stream(handle, &mut buffer, num_elems)?;

        if produced == 0 {
            throttled += 1;
            if let Some(timeout) = timeout {
                if last_data.elapsed() >= timeout {
                    source.close_stream(handle);
                    return Err(format!("No samples within {} ms", timeout.as_millis()).into());
                }
            }
            continue;
        }

        reads += 1;
        total += produced as u64;
        last_data = Instant::now();

        let len = 2 * produced;
        let power_db = match format {
            StreamFormat::Cs16 => {
                if let Some(writer) = capture.as_mut() {
                    writer.write_cs16(&native_buf[..len])?;
                }
                meter.as_mut().map(|m| m.measure_cs16(&native_buf[..len]))
            }
            StreamFormat::Cf32 => {
                if let Some(writer) = capture.as_mut() {
                    writer.write_cf32(&float_buf[..len])?;
                }
                meter.as_mut().map(|m| m.measure_cf32(&float_buf[..len]))
            }
        };

        if let (Some(power_db), Some(meter)) = (power_db, meter.as_ref()) {
            if last_report.elapsed() >= Duration::from_secs(1) {
                last_report = Instant::now();
                println!(
                    "[monitor] pos: {}, peak_power: {:.1} dB, noise_floor: {:.1} dB",
                    source.cursor().position(),
                    power_db,
                    meter.noise_floor_db().unwrap_or(f32::NEG_INFINITY)
                );
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    source.deactivate(handle, 0)?;
    source.close_stream(handle);

    if let Some(writer) = capture {
        let written = writer.samples_written();
        writer.finalize()?;
        if verbose {
            println!("Wrote {} samples", written);
        }
    }

    println!(
        "Delivered {} samples in {} reads over {:.2}s ({:.3} Msps, nominal {:.3} Msps, {} throttled polls)",
        total,
        reads,
        elapsed,
        total as f64 / elapsed / 1e6,
        sample_rate / 1e6,
        throttled
    );

    Ok(())
}
