//! Audio Module
//!
//! Stream format descriptions, the file I/O collaborator interfaces, and a
//! WAV backend that implements them.

pub mod converter;
pub mod format;
pub mod format_info;
pub mod fourcc;
pub mod io;
pub mod sample;
pub mod wav;

pub use converter::StreamingResampler;
pub use format::{ContainerType, CreateFlags, FormatFlags, FormatId, StreamDescription};
pub use format_info::{BuiltinFormatInfo, FormatInfoResolver};
pub use fourcc::FourCharCode;
pub use io::{AudioFile, AudioFileIo, Converter, ResumeCapability, WriteOutcome};
pub use wav::{WavDestinationFile, WavFileIo, WavSourceFile};
