//! Image encoding: raw image blob → decoded image → base64 PNG payload.
//!
//! Decoding before sending catches corrupt blobs locally, as an
//! [`AnalysisError::ImageDecode`] for that one image, instead of spending a
//! model call on them. PNG is lossless, so re-encoding never degrades the
//! figure the model reads.

use crate::error::AnalysisError;
use crate::model::EncodedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode an image blob (JPEG, PNG, …) into memory.
pub fn decode_image(job: &str, bytes: &[u8]) -> Result<DynamicImage, AnalysisError> {
    image::load_from_memory(bytes).map_err(|e| AnalysisError::ImageDecode {
        job: job.to_string(),
        detail: e.to_string(),
    })
}

/// Encode a decoded image as a base64 PNG ready for the model request.
pub fn encode_image(job: &str, img: &DynamicImage) -> Result<EncodedImage, AnalysisError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| AnalysisError::ImageDecode {
            job: job.to_string(),
            detail: format!("PNG encoding failed: {e}"),
        })?;

    let data = STANDARD.encode(&buf);
    debug!("{job}: {}x{} image → {} bytes base64", img.width(), img.height(), data.len());

    Ok(EncodedImage {
        mime_type: "image/png".to_string(),
        data,
    })
}

/// Decode then encode in one step.
pub fn prepare_image(job: &str, bytes: &[u8]) -> Result<EncodedImage, AnalysisError> {
    let img = decode_image(job, bytes)?;
    encode_image(job, &img)
}

/// Guess the MIME type of an encoded image blob for serving it back to the browser.
pub fn mime_type_of(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type(),
        Err(_) => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba(color)));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn prepare_small_image() {
        let data = prepare_image("image #1", &png_bytes([255, 0, 0, 255])).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        let img = image::load_from_memory(&decoded).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = prepare_image("image #4", b"not an image").unwrap_err();
        match err {
            AnalysisError::ImageDecode { job, .. } => assert_eq!(job, "image #4"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mime_type_detection() {
        assert_eq!(mime_type_of(&png_bytes([0, 0, 0, 255])), "image/png");
        assert_eq!(mime_type_of(b"????"), "application/octet-stream");
    }
}
