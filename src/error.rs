//! Error Types

use std::fmt;
use thiserror::Error;

use crate::audio::FourCharCode;

/// Raw status code reported by an audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    pub const PARAM_ERR: StatusCode = StatusCode(-50);
    /// Our own code for "an interruption destroyed the converter state".
    pub const CANNOT_RESUME_FROM_INTERRUPTION: StatusCode =
        StatusCode(FourCharCode::from_bytes(*b"CANT").as_i32());

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = FourCharCode::from_i32(self.0);
        if code.is_printable() {
            write!(f, "'{}' ({})", code, self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Main error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// Open/create/property configuration failed before the loop started.
    #[error("Setup error: {message}")]
    Setup { message: String, code: Option<StatusCode> },

    /// The format-info resolver could not complete a compressed description.
    #[error("Format resolution error: {message}")]
    FormatResolution { message: String },

    #[error("Interruption error: the audio converter cannot resume after an interruption (status {code})")]
    InterruptionCannotResume { code: StatusCode },

    #[error("Write error: {message} (status {code})")]
    FatalWrite { message: String, code: StatusCode },

    #[error("Read error: {message}")]
    Read { message: String },

    #[error("Seek error: {message}")]
    Seek { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl ConvertError {
    pub fn setup<S: Into<String>>(msg: S) -> Self { Self::Setup { message: msg.into(), code: None } }
    pub fn setup_with_code<S: Into<String>>(msg: S, code: StatusCode) -> Self {
        Self::Setup { message: msg.into(), code: Some(code) }
    }
    pub fn format_resolution<S: Into<String>>(msg: S) -> Self { Self::FormatResolution { message: msg.into() } }
    pub fn cannot_resume() -> Self {
        Self::InterruptionCannotResume { code: StatusCode::CANNOT_RESUME_FROM_INTERRUPTION }
    }
    pub fn fatal_write<S: Into<String>>(msg: S, code: StatusCode) -> Self {
        Self::FatalWrite { message: msg.into(), code }
    }
    pub fn read<S: Into<String>>(msg: S) -> Self { Self::Read { message: msg.into() } }
    pub fn seek<S: Into<String>>(msg: S) -> Self { Self::Seek { message: msg.into() } }
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }

    /// Setup failures abort the job before the conversion loop starts.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup { .. } | Self::FormatResolution { .. })
    }

    /// Status code carried by the error, if the backend reported one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Setup { code, .. } => *code,
            Self::InterruptionCannotResume { code } | Self::FatalWrite { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<hound::Error> for ConvertError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ConvertError::setup("open failed");
        assert!(e.to_string().contains("Setup"));
        assert!(e.is_setup());
        assert!(ConvertError::format_resolution("ilbc").is_setup());
        assert!(!ConvertError::cannot_resume().is_setup());
    }

    #[test]
    fn test_cannot_resume_code() {
        let e = ConvertError::cannot_resume();
        assert_eq!(e.status(), Some(StatusCode::CANNOT_RESUME_FROM_INTERRUPTION));
        assert!(e.to_string().contains("'CANT'"));
    }

    #[test]
    fn test_plain_status_display() {
        assert_eq!(StatusCode(-50).to_string(), "-50");
    }
}
