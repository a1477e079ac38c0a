//! Encoding-aware file reading.
//!
//! Files are decoded by trying an ordered list of [`TextEncoding`]s and
//! keeping the first strict decode that succeeds. Content longer than the
//! configured character cap is truncated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported text encodings, named the way they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin1", alias = "latin-1")]
    Latin1,
    #[serde(rename = "cp1252", alias = "windows-1252")]
    Cp1252,
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
}

pub const DEFAULT_ENCODINGS: &[TextEncoding] = &[
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Cp1252,
    TextEncoding::Iso8859_1,
];

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Cp1252 => "cp1252",
            TextEncoding::Iso8859_1 => "iso-8859-1",
        }
    }

    /// Strict decode. `None` when `bytes` is not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            // ISO-8859-1 maps every byte to the code point of the same value.
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                Some(bytes.iter().map(|&b| b as char).collect())
            }
            TextEncoding::Cp1252 => bytes.iter().map(|&b| cp1252_char(b)).collect(),
        }
    }
}

/// Windows-1252 differs from ISO-8859-1 only in 0x80..=0x9F, where five
/// positions are undefined.
fn cp1252_char(b: u8) -> Option<char> {
    let c = match b {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => return None,
        other => other as char,
    };
    Some(c)
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not decodable as any of: {}", .tried.join(", "))]
    Undecodable { tried: Vec<&'static str> },
}

/// Decoded file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextContent {
    pub content: String,
    pub encoding: TextEncoding,
    pub truncated: bool,
}

/// Decode `bytes` with the first encoding in `encodings` that accepts them.
pub fn decode_with_fallback(
    bytes: &[u8],
    encodings: &[TextEncoding],
) -> Result<(String, TextEncoding), ReadError> {
    for encoding in encodings {
        if let Some(text) = encoding.decode(bytes) {
            return Ok((text, *encoding));
        }
    }
    Err(ReadError::Undecodable {
        tried: encodings.iter().map(TextEncoding::label).collect(),
    })
}

/// Read `path`, decode it, and cap it at `max_chars` characters.
pub fn read_text(
    path: &Path,
    encodings: &[TextEncoding],
    max_chars: usize,
) -> Result<TextContent, ReadError> {
    let bytes = std::fs::read(path)?;
    let (mut content, encoding) = decode_with_fallback(&bytes, encodings)?;

    let truncated = match content.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            content.truncate(cut);
            true
        }
        None => false,
    };

    Ok(TextContent {
        content,
        encoding,
        truncated,
    })
}
