//! Destination and client format negotiation

use std::sync::Arc;

use crate::audio::{FormatFlags, FormatId, FormatInfoResolver, StreamDescription};
use crate::error::{ConvertError, Result};

/// Formats a job exchanges: what lands in the file, and the uncompressed
/// representation handed between source reads and destination writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegotiatedFormats {
    pub destination: StreamDescription,
    pub client: StreamDescription,
}

pub struct FormatNegotiator {
    resolver: Arc<dyn FormatInfoResolver>,
}

impl FormatNegotiator {
    pub const PCM_BITS_PER_CHANNEL: u32 = 16;
    pub const CLIENT_BITS_PER_CHANNEL: u32 = 32;

    pub fn new(resolver: Arc<dyn FormatInfoResolver>) -> Self {
        Self { resolver }
    }

    /// `sample_rate == 0.0` keeps the source rate.
    pub fn negotiate(
        &self,
        source: &StreamDescription,
        sample_rate: f64,
        output_format: FormatId,
    ) -> Result<NegotiatedFormats> {
        if source.channels == 0 {
            return Err(ConvertError::setup("Source stream has no channels"));
        }
        let sample_rate = if sample_rate == 0.0 { source.sample_rate } else { sample_rate };

        let destination = if output_format.is_linear_pcm() {
            let channels = source.channels;
            let bytes_per_frame = (Self::PCM_BITS_PER_CHANNEL / 8) * channels;
            StreamDescription {
                sample_rate,
                format_id: FormatId::LinearPcm,
                channels,
                bits_per_channel: Self::PCM_BITS_PER_CHANNEL,
                bytes_per_frame,
                bytes_per_packet: bytes_per_frame,
                frames_per_packet: 1,
                flags: FormatFlags::IS_SIGNED_INTEGER | FormatFlags::IS_PACKED | FormatFlags::NATIVE_ENDIAN,
            }
        } else {
            let channels = if output_format.is_mono_only() { 1 } else { source.channels };
            let resolved = self.resolver.resolve(output_format, sample_rate, channels)?;
            Self::check_resolved(&resolved, output_format)?;
            resolved
        };

        let client = if output_format.is_linear_pcm() {
            destination
        } else {
            StreamDescription::linear_pcm(source.sample_rate, source.channels, Self::CLIENT_BITS_PER_CHANNEL)
        };

        Ok(NegotiatedFormats { destination, client })
    }

    fn check_resolved(desc: &StreamDescription, requested: FormatId) -> Result<()> {
        if desc.format_id != requested || desc.channels == 0 || !(desc.sample_rate > 0.0) {
            return Err(ConvertError::format_resolution(format!(
                "Incomplete description for '{}': {} Hz, {} channel(s)",
                requested, desc.sample_rate, desc.channels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BuiltinFormatInfo;

    fn negotiator() -> FormatNegotiator {
        FormatNegotiator::new(Arc::new(BuiltinFormatInfo))
    }

    #[test]
    fn test_pcm_keeps_source_rate_and_channels() {
        for channels in 1..=6 {
            let source = StreamDescription::linear_pcm_float(48000.0, channels);
            let formats = negotiator().negotiate(&source, 0.0, FormatId::LinearPcm).unwrap();
            assert_eq!(formats.destination.sample_rate, 48000.0);
            assert_eq!(formats.destination.channels, channels);
            assert_eq!(formats.destination.bits_per_channel, 16);
            assert_eq!(formats.destination.bytes_per_frame, 2 * channels);
            assert_eq!(formats.destination.bytes_per_packet, 2 * channels);
            assert_eq!(formats.destination.frames_per_packet, 1);
            assert_eq!(formats.client, formats.destination);
        }
    }

    #[test]
    fn test_pcm_rate_override() {
        let source = StreamDescription::linear_pcm(44100.0, 2, 16);
        let formats = negotiator().negotiate(&source, 22050.0, FormatId::LinearPcm).unwrap();
        assert_eq!(formats.destination.sample_rate, 22050.0);
        assert_eq!(formats.client.sample_rate, 22050.0);
    }

    #[test]
    fn test_mono_only_codec_forces_one_channel() {
        for channels in 1..=8 {
            let source = StreamDescription::linear_pcm(8000.0, channels, 16);
            let formats = negotiator().negotiate(&source, 0.0, FormatId::Ilbc).unwrap();
            assert_eq!(formats.destination.channels, 1);
            assert_eq!(formats.destination.format_id, FormatId::Ilbc);
            // the client side stays at the source layout
            assert_eq!(formats.client.channels, channels);
            assert_eq!(formats.client.bits_per_channel, 32);
            assert_eq!(formats.client.bytes_per_frame, 4 * channels);
            assert_eq!(formats.client.sample_rate, 8000.0);
            assert!(formats.client.is_linear_pcm());
        }
    }

    #[test]
    fn test_compressed_uses_resolver_hints() {
        let source = StreamDescription::linear_pcm(44100.0, 2, 16);
        let formats = negotiator().negotiate(&source, 32000.0, FormatId::Aac).unwrap();
        assert_eq!(formats.destination.sample_rate, 32000.0);
        assert_eq!(formats.destination.channels, 2);
        assert_eq!(formats.destination.frames_per_packet, 1024);
        assert_eq!(formats.client.sample_rate, 44100.0);
    }

    #[test]
    fn test_unresolvable_codec_fails() {
        let source = StreamDescription::linear_pcm(44100.0, 2, 16);
        let err = negotiator()
            .negotiate(&source, 0.0, FormatId::Ilbc)
            .unwrap_err();
        assert!(matches!(err, ConvertError::FormatResolution { .. }));
        assert!(err.is_setup());
    }

    struct HalfBakedResolver;

    impl FormatInfoResolver for HalfBakedResolver {
        fn resolve(&self, format_id: FormatId, _sample_rate: f64, _channels: u32) -> Result<StreamDescription> {
            Ok(StreamDescription { format_id, ..Default::default() })
        }
    }

    #[test]
    fn test_incomplete_resolution_fails() {
        let source = StreamDescription::linear_pcm(44100.0, 2, 16);
        let err = FormatNegotiator::new(Arc::new(HalfBakedResolver))
            .negotiate(&source, 0.0, FormatId::Aac)
            .unwrap_err();
        assert!(matches!(err, ConvertError::FormatResolution { .. }));
    }
}
