//! Output formats the rendering tool knows how to produce.
//!
//! The set is closed: every format has a file extension, a mime type used in
//! `<source type=…>`, and an encoder flag passed to the rendering tool. The
//! only irregular entry is JPEG, which is written as `.jpg` but encoded by
//! the `mozjpeg` codec.
//!
//! | Format | Extension | Mime type | Encoder flag |
//! |---|---|---|---|
//! | AVIF | `avif` | `image/avif` | `--avif` |
//! | WebP | `webp` | `image/webp` | `--webp` |
//! | JPEG | `jpg` | `image/jpeg` | `--mozjpeg` |
//! | WebP 2 | `wp2` | `image/webp2` | `--wp2` |
//! | JPEG XL | `jxl` | `image/jxl` | `--jxl` |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported image format '{0}' (expected one of: avif, webp, jpg, wp2, jxl)")]
    Unsupported(String),
}

/// A requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Format {
    Avif,
    Webp,
    Jpg,
    Wp2,
    Jxl,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Avif,
        Format::Webp,
        Format::Jpg,
        Format::Wp2,
        Format::Jxl,
    ];

    /// File extension, also the identifier used in config files.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Avif => "avif",
            Format::Webp => "webp",
            Format::Jpg => "jpg",
            Format::Wp2 => "wp2",
            Format::Jxl => "jxl",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Avif => "image/avif",
            Format::Webp => "image/webp",
            Format::Jpg => "image/jpeg",
            Format::Wp2 => "image/webp2",
            Format::Jxl => "image/jxl",
        }
    }

    /// Codec name the rendering tool expects after `--`.
    pub fn encoder_flag(self) -> &'static str {
        match self {
            Format::Jpg => "mozjpeg",
            other => other.extension(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| FormatError::Unsupported(s.to_string()))
    }
}

impl TryFrom<String> for Format {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.extension().to_string()
    }
}
