use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque caller-supplied metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// How the last whole-file save encoded its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// 16-bit code units, little-endian.
    Text,
    Binary,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "string",
            ContentType::Binary => "binary",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    /// Case-insensitive; `arraybuffer` is accepted for records written by
    /// older stores that tagged binary payloads by their buffer type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ContentType::Text),
            "binary" | "arraybuffer" => Ok(ContentType::Binary),
            _ => Err(UnknownContentType(s.to_string())),
        }
    }
}

/// Catalog entry for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name; also the catalog key.
    pub key: String,

    #[serde(default)]
    pub data: Metadata,

    /// Highest byte offset ever written + 1. `None` until the first write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Raw tag; parsed with `ContentType::from_str` on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl FileRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: Metadata::new(),
            size: None,
            content_type: None,
        }
    }

    pub fn with_data(mut self, data: Metadata) -> Self {
        self.data = data;
        self
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = Some(content_type.as_str().to_string());
    }

    /// Grow the recorded size to `candidate`; never shrinks it.
    /// Returns whether the record changed.
    pub fn grow_size(&mut self, candidate: u64) -> bool {
        match self.size {
            Some(size) if size >= candidate => false,
            _ => {
                self.size = Some(candidate);
                true
            }
        }
    }
}
