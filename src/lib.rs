//! AudioConvert - Interruption-Resilient Audio File Converter
//!
//! Streams an audio file through a fixed-size buffer into a new sample rate
//! and encoding, pausing and resuming around audio session interruptions
//! without dropping or duplicating frames.

pub mod audio;
pub mod config;
pub mod conversion;
pub mod error;
pub mod testing;

pub use config::{Config, Args};
pub use conversion::{ConversionJob, ConversionObserver, ConversionOutcome, ConversionRequest};
pub use error::{ConvertError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .parse_env("RUST_LOG")
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)
    }
}
