//! Content-based image format detection.
//!
//! Sniffing is advisory: the declared type decides acceptance, the sniffed
//! format only produces warnings when the two disagree.

use serde::Serialize;
use tracing::trace;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SniffedFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Svg,
    Unknown,
}

impl SniffedFormat {
    pub fn mime(self) -> Option<&'static str> {
        match self {
            SniffedFormat::Png => Some("image/png"),
            SniffedFormat::Jpeg => Some("image/jpeg"),
            SniffedFormat::Gif => Some("image/gif"),
            SniffedFormat::Webp => Some("image/webp"),
            SniffedFormat::Bmp => Some("image/bmp"),
            SniffedFormat::Svg => Some("image/svg+xml"),
            SniffedFormat::Unknown => None,
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, SniffedFormat::Svg)
    }
}

// Checked in order; the first prefix that matches wins.
const MAGIC: &[(&[u8], SniffedFormat)] = &[
    (&[0x89, 0x50, 0x4E, 0x47], SniffedFormat::Png),
    (&[0xFF, 0xD8, 0xFF], SniffedFormat::Jpeg),
    (b"GIF8", SniffedFormat::Gif),
    (b"RIFF", SniffedFormat::Webp),
    (b"BM", SniffedFormat::Bmp),
];

const TEXT_WINDOW: usize = 100;

pub fn sniff(bytes: &[u8]) -> SniffedFormat {
    if let Some((_, format)) = MAGIC.iter().find(|(magic, _)| bytes.starts_with(magic)) {
        return *format;
    }
    let head = &bytes[..bytes.len().min(TEXT_WINDOW)];
    // The window may cut a multi-byte character in half.
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    if text.contains("<svg") || text.contains("<?xml") {
        return SniffedFormat::Svg;
    }
    trace!(head = ?&bytes[..bytes.len().min(8)], "unrecognized image signature");
    SniffedFormat::Unknown
}
