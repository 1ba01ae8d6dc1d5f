//! Whole-file payloads and the text codec.
//!
//! Text is stored as a sequence of 16-bit code units (little-endian), two
//! bytes per unit, so every character up to U+FFFF maps to exactly one unit
//! and characters beyond it to a surrogate pair.

use crate::meta::ContentType;

/// Payload of a whole-file save or load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileData {
    Text(String),
    Binary(Vec<u8>),
}

impl FileData {
    pub fn content_type(&self) -> ContentType {
        match self {
            FileData::Text(_) => ContentType::Text,
            FileData::Binary(_) => ContentType::Binary,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileData::Text(s) => encode_text(&s),
            FileData::Binary(b) => b,
        }
    }
}

impl From<String> for FileData {
    fn from(value: String) -> Self {
        FileData::Text(value)
    }
}

impl From<&str> for FileData {
    fn from(value: &str) -> Self {
        FileData::Text(value.to_string())
    }
}

impl From<Vec<u8>> for FileData {
    fn from(value: Vec<u8>) -> Self {
        FileData::Binary(value)
    }
}

impl From<&[u8]> for FileData {
    fn from(value: &[u8]) -> Self {
        FileData::Binary(value.to_vec())
    }
}

pub fn encode_text(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

pub fn decode_text(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err(format!("odd text payload length {}", bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}
