use std::io::Cursor;

use crate::{candidate::CandidateImage, storage::local::LocalStorage};

mod validation;

pub(crate) fn encode(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

pub(crate) fn jpeg(width: u32, height: u32, file_name: &str) -> CandidateImage {
    CandidateImage::new(
        encode(width, height, image::ImageFormat::Jpeg),
        "image/jpeg",
        file_name,
    )
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend((data.len() as u32).to_be_bytes());
    let mut body = kind.to_vec();
    body.extend_from_slice(data);
    let crc = crc32fast::hash(&body);
    out.extend(body);
    out.extend(crc.to_be_bytes());
}

/// A PNG whose header claims the given size, without the pixel data to back
/// it. Enough for a header-only probe, cheap at any size.
pub(crate) fn png_header_only(width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = Vec::new();
    ihdr.extend(width.to_be_bytes());
    ihdr.extend(height.to_be_bytes());
    // bit depth 1, grayscale, deflate, adaptive filtering, no interlace
    ihdr.extend([1, 0, 0, 0, 0]);
    png_chunk(&mut out, b"IHDR", &ihdr);
    png_chunk(&mut out, b"IDAT", &[0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// 50 bytes starting with the PNG signature.
pub(crate) fn tiny_png() -> CandidateImage {
    let mut body = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    body.resize(50, 0);
    CandidateImage::new(body, "image/png", "tiny.png")
}

pub(crate) fn svg_with_script() -> CandidateImage {
    CandidateImage::new(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64"><rect width="64" height="64" fill="teal"/><script>alert(document.cookie)</script></svg>"#,
        "image/svg+xml",
        "badge.svg",
    )
}

pub(crate) async fn local_storage() -> LocalStorage {
    LocalStorage::open("sqlite::memory:").await.unwrap()
}

pub(crate) async fn stored_count(storage: &LocalStorage) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM images")
        .fetch_one(storage.pool())
        .await
        .unwrap()
}

#[test]
fn png_header_fixture_is_well_formed() {
    let png = png_header_only(9000, 9000);
    assert_eq!(&png[12..16], b"IHDR");
    assert_eq!(u32::from_be_bytes(png[16..20].try_into().unwrap()), 9000);
    // length + type + data + crc
    assert_eq!(png.len(), 8 + (12 + 13) + (12 + 8) + 12);
}

/// Storage that refuses every upload.
pub(crate) struct FailingStorage;

impl crate::storage::Client for FailingStorage {
    type Error = String;

    async fn put(&self, _upload: crate::storage::ImageUpload) -> Result<String, Self::Error> {
        Err("bucket unavailable".into())
    }
}
