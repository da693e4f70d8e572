use std::io::Cursor;

use bytes::Bytes;
use serde::Serialize;
use tracing::trace;

use crate::{sniff::SniffedFormat, validate::Advisory};

/// Pixel dimensions of a candidate, when they mean anything.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dimensions {
    Measured { width: u32, height: u32 },
    /// Vector content has no intrinsic pixel size.
    NotApplicable,
    /// The probe did not run or could not decode the image.
    NotMeasured,
}

impl Dimensions {
    /// `width / height`, if both sides are non-zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match *self {
            Dimensions::Measured { width, height } if width > 0 && height > 0 => {
                Some(width as f64 / height as f64)
            }
            _ => None,
        }
    }

    /// Ratio of the longer side to the shorter one, at least `1.0`.
    pub fn elongation(&self) -> Option<f64> {
        self.aspect_ratio().map(|ratio| ratio.max(1.0 / ratio))
    }
}

/// Reads the pixel size of a raster image off the async executor.
///
/// Only the image header is decoded. The decoder lives inside the blocking
/// task and is dropped there whether decoding succeeds or not.
pub async fn probe(body: Bytes, format: SniffedFormat) -> Result<Dimensions, Advisory> {
    if format.is_vector() {
        return Ok(Dimensions::NotApplicable);
    }
    let (width, height) = blocking::unblock(move || read_dimensions(&body))
        .await
        .map_err(|error| {
            trace!(%error, "dimension probe failed");
            Advisory::new(format!("could not read image dimensions: {error}"))
        })?;
    Ok(Dimensions::Measured { width, height })
}

fn read_dimensions(body: &[u8]) -> image::ImageResult<(u32, u32)> {
    image::ImageReader::new(Cursor::new(body))
        .with_guessed_format()?
        .into_dimensions()
}
