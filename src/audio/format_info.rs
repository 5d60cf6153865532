//! Compressed format lookup

use crate::audio::{FormatFlags, FormatId, StreamDescription};
use crate::error::{ConvertError, Result};

/// Fills in a complete description for a codec from a few hints.
pub trait FormatInfoResolver: Send + Sync {
    fn resolve(&self, format_id: FormatId, sample_rate: f64, channels: u32) -> Result<StreamDescription>;
}

/// Table of the packet layouts of common codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormatInfo;

impl BuiltinFormatInfo {
    pub const ILBC_SAMPLE_RATE: f64 = 8000.0;
}

impl FormatInfoResolver for BuiltinFormatInfo {
    fn resolve(&self, format_id: FormatId, sample_rate: f64, channels: u32) -> Result<StreamDescription> {
        if channels == 0 {
            return Err(ConvertError::format_resolution(format!(
                "'{}' needs at least one channel", format_id
            )));
        }
        if format_id != FormatId::Ilbc && !(sample_rate > 0.0) {
            return Err(ConvertError::format_resolution(format!(
                "'{}' needs a sample rate, got {}", format_id, sample_rate
            )));
        }

        let base = StreamDescription {
            sample_rate,
            format_id,
            channels,
            ..Default::default()
        };

        let desc = match format_id {
            FormatId::Ilbc => {
                if channels != 1 {
                    return Err(ConvertError::format_resolution("iLBC only encodes mono audio"));
                }
                if sample_rate != 0.0 && sample_rate != Self::ILBC_SAMPLE_RATE {
                    return Err(ConvertError::format_resolution(format!(
                        "iLBC only supports {} Hz, got {}", Self::ILBC_SAMPLE_RATE, sample_rate
                    )));
                }
                // 30 ms frame mode
                StreamDescription {
                    sample_rate: Self::ILBC_SAMPLE_RATE,
                    bytes_per_packet: 50,
                    frames_per_packet: 240,
                    ..base
                }
            }
            FormatId::ImaAdpcm => StreamDescription {
                bytes_per_packet: 34 * channels,
                frames_per_packet: 64,
                ..base
            },
            FormatId::ULaw | FormatId::ALaw => StreamDescription {
                bits_per_channel: 8,
                bytes_per_frame: channels,
                bytes_per_packet: channels,
                frames_per_packet: 1,
                ..base
            },
            FormatId::Aac => StreamDescription {
                frames_per_packet: 1024,
                ..base
            },
            FormatId::AppleLossless => StreamDescription {
                frames_per_packet: 4096,
                // 16-bit source data
                flags: FormatFlags::from_bits(1),
                ..base
            },
            FormatId::LinearPcm | FormatId::Other(_) => {
                return Err(ConvertError::format_resolution(format!(
                    "No format information for '{}' at {} Hz, {} channel(s)",
                    format_id, sample_rate, channels
                )));
            }
        };

        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ilbc_is_mono_8k() {
        let desc = BuiltinFormatInfo.resolve(FormatId::Ilbc, 8000.0, 1).unwrap();
        assert_eq!(desc.channels, 1);
        assert_eq!(desc.sample_rate, 8000.0);
        assert_eq!(desc.frames_per_packet, 240);

        assert!(BuiltinFormatInfo.resolve(FormatId::Ilbc, 8000.0, 2).is_err());
        assert!(BuiltinFormatInfo.resolve(FormatId::Ilbc, 44100.0, 1).is_err());
    }

    #[test]
    fn test_aac_keeps_hints() {
        let desc = BuiltinFormatInfo.resolve(FormatId::Aac, 44100.0, 2).unwrap();
        assert_eq!(desc.sample_rate, 44100.0);
        assert_eq!(desc.channels, 2);
        assert_eq!(desc.frames_per_packet, 1024);
        assert_eq!(desc.bytes_per_packet, 0);
    }

    #[test]
    fn test_unknown_codec_fails() {
        let err = BuiltinFormatInfo
            .resolve(FormatId::Other("opus".parse().unwrap()), 48000.0, 2)
            .unwrap_err();
        assert!(matches!(err, ConvertError::FormatResolution { .. }));
    }

    #[test]
    fn test_missing_rate_fails() {
        assert!(BuiltinFormatInfo.resolve(FormatId::Aac, 0.0, 2).is_err());
    }
}
