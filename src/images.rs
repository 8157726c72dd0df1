//! Image references and upload transcoding.
//!
//! Uploads are decoded, scaled down to a maximum width (never up) and
//! re-encoded as lossy WebP before anything touches the disk.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageReader};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An image field of a submitted payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageRef {
    #[default]
    Empty,
    /// A file sent alongside the payload under `key`.
    Uploaded { key: String },
    /// A public path written by an earlier save.
    Stored { path: String },
}

impl ImageRef {
    pub fn uploaded(key: impl Into<String>) -> Self {
        Self::Uploaded { key: key.into() }
    }

    pub fn stored(path: impl Into<String>) -> Self {
        Self::Stored { path: path.into() }
    }

    pub fn from_path(path: Option<&str>) -> Self {
        path.map_or(Self::Empty, Self::stored)
    }
}

/// A raw uploaded file, keyed by the name the payload refers to it by.
#[derive(Debug, Clone)]
pub struct Upload {
    pub key: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct TranscodeOptions {
    pub max_width: u32,
    pub quality: f32,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            max_width: 1200,
            quality: 80.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transcoded {
    pub width: u32,
    pub height: u32,
    pub webp: Vec<u8>,
}

pub fn transcode(bytes: &[u8], options: TranscodeOptions) -> Result<Transcoded> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    let img = if img.width() > options.max_width {
        let height = scaled_height(img.width(), img.height(), options.max_width);
        debug!(
            "Resizing {}x{} -> {}x{}",
            img.width(),
            img.height(),
            options.max_width,
            height
        );
        img.resize_exact(options.max_width, height, FilterType::Lanczos3)
    } else {
        img
    };

    // libwebp only takes 8-bit RGB(A)
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let encoder = webp::Encoder::from_image(&img).map_err(|e| Error::Image(e.to_string()))?;
    let webp = encoder.encode(options.quality).to_vec();

    Ok(Transcoded {
        width: img.width(),
        height: img.height(),
        webp,
    })
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2) / u64::from(width);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_wide_image_is_capped() {
        let out = transcode(&png(2400, 600), TranscodeOptions::default()).unwrap();
        assert_eq!((out.width, out.height), (1200, 300));

        let decoded = image::load_from_memory_with_format(&out.webp, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.width(), 1200);
    }

    #[test]
    fn test_small_image_is_not_enlarged() {
        let out = transcode(&png(320, 200), TranscodeOptions::default()).unwrap();
        assert_eq!((out.width, out.height), (320, 200));
        assert_eq!(&out.webp[..4], b"RIFF");
        assert_eq!(&out.webp[8..12], b"WEBP");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = transcode(b"definitely not an image", TranscodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Image(_) | Error::Io(_)));
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(2400, 600, 1200), 300);
        assert_eq!(scaled_height(5000, 1, 1200), 1);
    }

    #[test]
    fn test_image_ref_wire_format() {
        let json = serde_json::to_string(&ImageRef::uploaded("hero_a_b.jpg")).unwrap();
        assert_eq!(json, r#"{"kind":"uploaded","key":"hero_a_b.jpg"}"#);
        let parsed: ImageRef = serde_json::from_str(r#"{"kind":"empty"}"#).unwrap();
        assert_eq!(parsed, ImageRef::Empty);
        assert_eq!(ImageRef::from_path(Some("/images/x")), ImageRef::stored("/images/x"));
    }
}
