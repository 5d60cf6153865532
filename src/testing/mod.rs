//! Testing utilities and mock implementations.
//!
//! [`MockAudioIo`] is an in-memory [`AudioFileIo`](crate::audio::AudioFileIo)
//! whose write outcomes, converter and failures can be scripted, and which
//! records every call so tests can check ordering and frame continuity.
//!
//! # Example
//!
//! ```rust,ignore
//! use audioconvert::testing::{fixtures, MockAudioIo};
//!
//! let io = MockAudioIo::new(fixtures::pcm16(44100.0, 1), fixtures::ramp(1000, 1))
//!     .with_write_script([WriteOutcome::CodecUnavailableInputNotConsumed]);
//! ```

mod memory_io;

pub use memory_io::{MockAudioIo, MockEvent, ReadHook};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::audio::StreamDescription;

    pub fn pcm16(sample_rate: f64, channels: u32) -> StreamDescription {
        StreamDescription::linear_pcm(sample_rate, channels, 16)
    }

    /// Interleaved samples whose value is their index, wrapping below `i16::MAX`.
    pub fn ramp(frames: usize, channels: usize) -> Vec<i16> {
        (0..frames * channels).map(|i| (i % 32000) as i16).collect()
    }
}
