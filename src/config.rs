//! Configuration management for audio conversion

use crate::audio::{ContainerType, FormatId};
use crate::conversion::{ConversionRequest, DEFAULT_BUFFER_BYTE_SIZE};
use crate::error::{ConvertError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest scratch buffer a job may allocate.
pub const MAX_BUFFER_BYTE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionConfig,
    pub processing: ProcessingConfig,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// 0 keeps the source rate.
    pub sample_rate: f64,
    pub output_format: String,
    pub container: String,
    pub buffer_byte_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub verbose: bool,
    /// Delay before a simulated interruption begins, in milliseconds. 0 disables it.
    pub simulate_interruption_after_ms: u64,
    /// How long a simulated interruption lasts, in milliseconds.
    pub simulate_interruption_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conversion: ConversionConfig::default(),
            processing: ProcessingConfig::default(),
            input_path: PathBuf::from("input.wav"),
            output_path: PathBuf::from("output.wav"),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 0.0,
            output_format: "lpcm".to_string(),
            container: "wav".to_string(),
            buffer_byte_size: DEFAULT_BUFFER_BYTE_SIZE,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            simulate_interruption_after_ms: 0,
            simulate_interruption_ms: 50,
        }
    }
}

impl Config {
    /// Get output format (convenience method)
    pub fn output_format(&self) -> Result<FormatId> {
        self.conversion.output_format.parse()
    }

    /// Get container type (convenience method)
    pub fn container(&self) -> Result<ContainerType> {
        self.conversion.container.parse()
    }

    /// Get verbose mode (convenience method)
    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }

    /// Simulated interruption as (delay before it begins, duration), if enabled.
    pub fn simulated_interruption(&self) -> Option<(Duration, Duration)> {
        (self.processing.simulate_interruption_after_ms > 0).then(|| {
            (
                Duration::from_millis(self.processing.simulate_interruption_after_ms),
                Duration::from_millis(self.processing.simulate_interruption_ms),
            )
        })
    }

    /// Build the conversion request described by this config.
    pub fn request(&self) -> Result<ConversionRequest> {
        Ok(ConversionRequest::new(&self.input_path, &self.output_path)
            .with_sample_rate(self.conversion.sample_rate)
            .with_output_format(self.output_format()?)
            .with_container(self.container()?)
            .with_buffer_byte_size(self.conversion.buffer_byte_size))
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "audioconvert", about = "Interruption-resilient audio file converter", version, author)]
pub struct Args {
    #[arg(short = 'i', long = "input", help = "Source audio file path")]
    pub input: PathBuf,

    #[arg(short = 'o', long = "output", default_value = "output.wav", help = "Destination audio file path")]
    pub output: PathBuf,

    #[arg(short = 'r', long = "sample-rate", default_value = "0", help = "Destination sample rate in Hz (0 keeps the source rate)")]
    pub sample_rate: f64,

    #[arg(short = 'f', long = "format", default_value = "lpcm", help = "Destination encoding (lpcm, ilbc, ima4, ulaw, alaw, aac, alac or a four-character code)")]
    pub format: String,

    #[arg(long = "container", default_value = "wav", help = "Destination container type")]
    pub container: String,

    #[arg(short = 'b', long = "buffer-size", default_value_t = DEFAULT_BUFFER_BYTE_SIZE, help = "Scratch buffer size in bytes")]
    pub buffer_size: usize,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "interrupt-after", default_value = "0", help = "Simulate an interruption this many milliseconds after starting (0 disables)")]
    pub interrupt_after_ms: u64,

    #[arg(long = "interrupt-for", default_value = "50", help = "Duration of the simulated interruption in milliseconds")]
    pub interrupt_for_ms: u64,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_args_and_config(args)
    }

    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        config.input_path = args.input;
        config.output_path = args.output;
        config.conversion.sample_rate = args.sample_rate;
        config.conversion.output_format = args.format;
        config.conversion.container = args.container;
        config.conversion.buffer_byte_size = args.buffer_size;
        config.processing.verbose = args.verbose;
        config.processing.simulate_interruption_after_ms = args.interrupt_after_ms;
        config.processing.simulate_interruption_ms = args.interrupt_for_ms;

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ConvertError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        let rate = self.conversion.sample_rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConvertError::config("Sample rate must be 0 or a positive number"));
        }
        if rate > 384000.0 {
            return Err(ConvertError::config("Sample rate cannot exceed 384000 Hz"));
        }

        self.output_format()?;
        self.container()?;

        if self.conversion.buffer_byte_size == 0 {
            return Err(ConvertError::config("Buffer size must be greater than 0"));
        }
        if self.conversion.buffer_byte_size > MAX_BUFFER_BYTE_SIZE {
            return Err(ConvertError::config(format!(
                "Buffer size cannot exceed {} bytes", MAX_BUFFER_BYTE_SIZE
            )));
        }

        if self.processing.simulate_interruption_after_ms > 0 && self.processing.simulate_interruption_ms == 0 {
            return Err(ConvertError::config("Simulated interruption duration must be greater than 0"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConvertError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConvertError::config(format!("Failed to write config file: {}", e)))
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}
