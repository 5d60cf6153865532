//! Audio file I/O collaborator interfaces
//!
//! The conversion core never touches containers or codecs directly. It talks
//! to an [`AudioFileIo`] backend that opens and creates [`AudioFile`]
//! handles, which read and write client-format PCM and perform any
//! conversion to the file's data format inside `write`.

use std::path::Path;

use crate::audio::{ContainerType, CreateFlags, StreamDescription};
use crate::error::{Result, StatusCode};

/// Result of handing a buffer of client-format frames to a destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Success,
    /// The codec became unavailable mid-write, but the buffer was consumed.
    CodecUnavailableInputConsumed,
    /// The codec became unavailable mid-write and the buffer was NOT consumed.
    CodecUnavailableInputNotConsumed,
    Failed(StatusCode),
}

impl WriteOutcome {
    pub const INPUT_CONSUMED_CODE: StatusCode = StatusCode(-66559);
    pub const INPUT_NOT_CONSUMED_CODE: StatusCode = StatusCode(-66560);

    pub fn from_status(code: StatusCode) -> Self {
        match code {
            StatusCode::OK => WriteOutcome::Success,
            Self::INPUT_CONSUMED_CODE => WriteOutcome::CodecUnavailableInputConsumed,
            Self::INPUT_NOT_CONSUMED_CODE => WriteOutcome::CodecUnavailableInputNotConsumed,
            other => WriteOutcome::Failed(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WriteOutcome::Success => StatusCode::OK,
            WriteOutcome::CodecUnavailableInputConsumed => Self::INPUT_CONSUMED_CODE,
            WriteOutcome::CodecUnavailableInputNotConsumed => Self::INPUT_NOT_CONSUMED_CODE,
            WriteOutcome::Failed(code) => *code,
        }
    }
}

/// Answer to "can this converter resume after an interruption?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeCapability {
    CanResume,
    /// Interruptions destroy the codec state.
    CannotResume,
    /// The converter does not implement the query, so it holds no hardware state.
    Unsupported,
}

impl ResumeCapability {
    pub fn is_resumable(self) -> bool {
        !matches!(self, ResumeCapability::CannotResume)
    }
}

/// Converter owned by a destination file.
pub trait Converter: Send {
    fn can_resume(&self) -> Result<ResumeCapability>;

    fn dispose(self: Box<Self>) {}
}

/// An open audio file handle.
pub trait AudioFile: Send {
    /// Format of the data stored in the file.
    fn file_format(&self) -> Result<StreamDescription>;

    /// Format exchanged by `read` and `write`. Must be linear PCM.
    fn set_client_format(&mut self, format: &StreamDescription) -> Result<()>;

    /// Reads up to `max_frames` client-format frames into `buffer`.
    /// Returns 0 at end of stream.
    fn read(&mut self, max_frames: u32, buffer: &mut [u8]) -> Result<u32>;

    fn write(&mut self, frames: u32, buffer: &[u8]) -> WriteOutcome;

    /// Moves the read position to `frame`, counted in client frames.
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Hands out the converter created by `set_client_format`, if any.
    fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>>;

    fn dispose(self: Box<Self>) {}
}

/// Opens and creates audio files.
pub trait AudioFileIo: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioFile>>;

    fn create(
        &self,
        path: &Path,
        container: ContainerType,
        format: &StreamDescription,
        flags: CreateFlags,
    ) -> Result<Box<dyn AudioFile>>;
}
