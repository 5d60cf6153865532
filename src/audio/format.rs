//! Stream format descriptions

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::audio::FourCharCode;
use crate::error::{ConvertError, Result};

/// Encoding of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormatId {
    #[default]
    LinearPcm,
    Ilbc,
    ImaAdpcm,
    ULaw,
    ALaw,
    Aac,
    AppleLossless,
    Other(FourCharCode),
}

impl FormatId {
    pub fn code(self) -> FourCharCode {
        match self {
            FormatId::LinearPcm => FourCharCode::from_bytes(*b"lpcm"),
            FormatId::Ilbc => FourCharCode::from_bytes(*b"ilbc"),
            FormatId::ImaAdpcm => FourCharCode::from_bytes(*b"ima4"),
            FormatId::ULaw => FourCharCode::from_bytes(*b"ulaw"),
            FormatId::ALaw => FourCharCode::from_bytes(*b"alaw"),
            FormatId::Aac => FourCharCode::from_bytes(*b"aac "),
            FormatId::AppleLossless => FourCharCode::from_bytes(*b"alac"),
            FormatId::Other(code) => code,
        }
    }

    pub fn from_code(code: FourCharCode) -> Self {
        const KNOWN: [FormatId; 7] = [
            FormatId::LinearPcm,
            FormatId::Ilbc,
            FormatId::ImaAdpcm,
            FormatId::ULaw,
            FormatId::ALaw,
            FormatId::Aac,
            FormatId::AppleLossless,
        ];
        KNOWN
            .into_iter()
            .find(|id| id.code() == code)
            .unwrap_or(FormatId::Other(code))
    }

    pub fn is_linear_pcm(self) -> bool {
        self == FormatId::LinearPcm
    }

    /// Codecs that only encode a single channel.
    pub fn is_mono_only(self) -> bool {
        self == FormatId::Ilbc
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for FormatId {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcm" | "lpcm" | "linear-pcm" | "linearpcm" => Ok(FormatId::LinearPcm),
            "ilbc" => Ok(FormatId::Ilbc),
            "ima4" | "ima-adpcm" => Ok(FormatId::ImaAdpcm),
            "ulaw" | "mulaw" => Ok(FormatId::ULaw),
            "alaw" => Ok(FormatId::ALaw),
            "aac" => Ok(FormatId::Aac),
            "alac" => Ok(FormatId::AppleLossless),
            _ => s.parse::<FourCharCode>().map(FormatId::from_code),
        }
    }
}

/// Format flag bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatFlags(u32);

impl FormatFlags {
    pub const NONE: FormatFlags = FormatFlags(0);
    pub const IS_FLOAT: FormatFlags = FormatFlags(1 << 0);
    pub const IS_BIG_ENDIAN: FormatFlags = FormatFlags(1 << 1);
    pub const IS_SIGNED_INTEGER: FormatFlags = FormatFlags(1 << 2);
    pub const IS_PACKED: FormatFlags = FormatFlags(1 << 3);
    pub const NATIVE_ENDIAN: FormatFlags =
        FormatFlags(if cfg!(target_endian = "big") { 1 << 1 } else { 0 });

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: FormatFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FormatFlags {
    type Output = FormatFlags;

    fn bitor(self, rhs: FormatFlags) -> FormatFlags {
        FormatFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatFlags {
    fn bitor_assign(&mut self, rhs: FormatFlags) {
        self.0 |= rhs.0;
    }
}

/// Description of an audio stream's layout.
///
/// For linear PCM every frame has the same size, so `bytes_per_frame` is the
/// divisor for all frame arithmetic. Compressed formats may leave the byte
/// counts at zero when packets are variable-sized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StreamDescription {
    pub sample_rate: f64,
    pub format_id: FormatId,
    pub channels: u32,
    pub bits_per_channel: u32,
    pub bytes_per_frame: u32,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub flags: FormatFlags,
}

impl StreamDescription {
    /// Packed interleaved integer PCM in native byte order.
    pub fn linear_pcm(sample_rate: f64, channels: u32, bits_per_channel: u32) -> Self {
        let bytes_per_frame = (bits_per_channel / 8) * channels;
        Self {
            sample_rate,
            format_id: FormatId::LinearPcm,
            channels,
            bits_per_channel,
            bytes_per_frame,
            bytes_per_packet: bytes_per_frame,
            frames_per_packet: 1,
            flags: FormatFlags::IS_SIGNED_INTEGER | FormatFlags::IS_PACKED | FormatFlags::NATIVE_ENDIAN,
        }
    }

    /// Packed interleaved 32-bit float PCM in native byte order.
    pub fn linear_pcm_float(sample_rate: f64, channels: u32) -> Self {
        Self {
            flags: FormatFlags::IS_FLOAT | FormatFlags::IS_PACKED | FormatFlags::NATIVE_ENDIAN,
            ..Self::linear_pcm(sample_rate, channels, 32)
        }
    }

    pub fn is_linear_pcm(&self) -> bool {
        self.format_id.is_linear_pcm()
    }

    pub fn is_float(&self) -> bool {
        self.flags.contains(FormatFlags::IS_FLOAT)
    }

    /// Duration in seconds of `frames` frames at this rate.
    pub fn duration_of(&self, frames: u64) -> f64 {
        if self.sample_rate > 0.0 {
            frames as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

impl fmt::Display for StreamDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sample Rate:         {:>10.0}", self.sample_rate)?;
        writeln!(f, "Format ID:           {:>10}", self.format_id.to_string())?;
        writeln!(f, "Format Flags:        {:>10X}", self.flags.bits())?;
        writeln!(f, "Bytes per Packet:    {:>10}", self.bytes_per_packet)?;
        writeln!(f, "Frames per Packet:   {:>10}", self.frames_per_packet)?;
        writeln!(f, "Bytes per Frame:     {:>10}", self.bytes_per_frame)?;
        writeln!(f, "Channels per Frame:  {:>10}", self.channels)?;
        write!(f, "Bits per Channel:    {:>10}", self.bits_per_channel)
    }
}

/// Output container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    Wav,
    Caf,
    Aiff,
}

impl ContainerType {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerType::Wav => "wav",
            ContainerType::Caf => "caf",
            ContainerType::Aiff => "aiff",
        }
    }
}

impl FromStr for ContainerType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(ContainerType::Wav),
            "caf" | "caff" => Ok(ContainerType::Caf),
            "aif" | "aiff" => Ok(ContainerType::Aiff),
            other => Err(ConvertError::config(format!("Unknown container type: {}", other))),
        }
    }
}

/// Options for creating a destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateFlags {
    /// Replace an existing file instead of failing.
    pub erase_file: bool,
}

impl Default for CreateFlags {
    fn default() -> Self {
        Self { erase_file: true }
    }
}
