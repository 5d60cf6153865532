//! Four-character codes used for format identifiers and backend status codes

use std::fmt;
use std::str::FromStr;

use crate::error::ConvertError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCharCode(u32);

impl FourCharCode {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn from_i32(value: i32) -> Self {
        Self(value as u32)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub const fn bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// True when every byte is printable ASCII, so the code reads as text.
    pub fn is_printable(self) -> bool {
        self.bytes().iter().all(|b| (0x20..=0x7e).contains(b))
    }
}

impl fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            for b in self.bytes() {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCharCode('{}')", self)
    }
}

impl FromStr for FourCharCode {
    type Err = ConvertError;

    /// Shorter codes are padded with trailing spaces (`"aac"` becomes `"aac "`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 4 || !s.is_ascii() {
            return Err(ConvertError::config(format!(
                "Four-character code must be 1 to 4 ASCII characters: {:?}", s
            )));
        }
        let mut bytes = [b' '; 4];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self::from_bytes(bytes))
    }
}
