//! Device discovery and construction for host tooling

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{Result, WavSinkError};
use crate::source::VirtualSource;

pub const DRIVER_NAME: &str = "wav_sink";
pub const FILE_NAME_KEY: &str = "file_name";

/// Environment variable hosts may use to supply a default file
pub const FILE_ENV_VAR: &str = "SOAPY_WAV_SINK_FILE";

pub const ORIGIN: &str = "https://github.com/alexander-sholohov/SoapyAfedri";

/// Device arguments / descriptors
pub type Kwargs = BTreeMap<String, String>;

/// Parse `key=value,key=value` device arguments. A bare key maps to an empty value.
pub fn parse_kwargs(args: &str) -> Kwargs {
    args.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Driver configuration resolved once by the host
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    /// Used by discovery when the arguments carry no `file_name`
    pub default_file_name: Option<String>,
}

impl DriverConfig {
    pub fn new(default_file_name: Option<String>) -> Self {
        Self {
            default_file_name: default_file_name.filter(|f| !f.is_empty()),
        }
    }
}

/// Discover the device described by `args`.
///
/// The configured default file is used only when `file_name` is absent; an
/// explicit empty `file_name` finds nothing.
pub fn find_devices(args: &Kwargs, config: &DriverConfig) -> Vec<Kwargs> {
    if args.get("driver").is_some_and(|d| d != DRIVER_NAME) {
        return Vec::new();
    }

    let file_name = match args.get(FILE_NAME_KEY) {
        Some(file_name) => file_name,
        None => match config.default_file_name.as_ref() {
            Some(file_name) => file_name,
            None => return Vec::new(),
        },
    };
    if file_name.is_empty() {
        return Vec::new();
    }

    let mut device = Kwargs::new();
    device.insert("driver".to_string(), DRIVER_NAME.to_string());
    device.insert("label".to_string(), format!("{} :: {}", DRIVER_NAME, file_name));
    device.insert(FILE_NAME_KEY.to_string(), file_name.clone());
    vec![device]
}

/// Construct a device from arguments. `file_name` is required.
pub fn make_device(args: &Kwargs) -> Result<VirtualSource> {
    info!("Making {} device", DRIVER_NAME);
    let file_name = args.get(FILE_NAME_KEY).ok_or_else(|| {
        WavSinkError::Configuration(format!(
            "unable to create {} device without {}",
            DRIVER_NAME, FILE_NAME_KEY
        ))
    })?;
    VirtualSource::open(file_name)
}
