// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Screenshot geometry fixes and image decode checks.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, ImageResult};
use tracing::{debug, warn};

use crate::config::ScreenshotConfig;

/// Why an image payload failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageFault {
    /// The header does not match any known image format.
    Format,
    /// The format is recognized but the data does not decode.
    Decode,
}

/// Check that `bytes` is a decodable image.
pub fn decode_check(bytes: &[u8]) -> Result<(), (ImageFault, String)> {
    let format = image::guess_format(bytes).map_err(|e| (ImageFault::Format, e.to_string()))?;
    image::load_from_memory_with_format(bytes, format)
        .map(|_| ())
        .map_err(|e| (ImageFault::Decode, e.to_string()))
}

/// Target size for a screenshot whose aspect ratio is beyond `max_ratio`.
///
/// Too-wide images are doubled in height, too-tall ones in width.
pub fn stretched_dimensions(width: u32, height: u32, max_ratio: f32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let ratio = width as f32 / height as f32;
    if ratio > max_ratio {
        Some((width, height.saturating_mul(2)))
    } else if ratio < 1.0 / max_ratio {
        Some((width.saturating_mul(2), height))
    } else {
        None
    }
}

fn stretch(bytes: &[u8], max_ratio: f32) -> ImageResult<Option<Vec<u8>>> {
    let img = image::load_from_memory(bytes)?;
    let Some((width, height)) = stretched_dimensions(img.width(), img.height(), max_ratio) else {
        return Ok(None);
    };
    debug!(
        "Stretching screenshot {}x{} to {width}x{height}",
        img.width(),
        img.height()
    );
    let resized = img.resize_exact(width, height, FilterType::Nearest);
    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, ImageFormat::Png)?;
    Ok(Some(out.into_inner()))
}

/// Apply the platform's aspect-ratio correction to a screenshot.
///
/// Never fails: when the image cannot be processed the original bytes are
/// kept and a warning is logged.
pub fn normalize(config: &ScreenshotConfig, platform_id: &str, bytes: Vec<u8>) -> Vec<u8> {
    if !config.applies_to(platform_id) {
        return bytes;
    }
    match stretch(&bytes, config.max_aspect_ratio) {
        Ok(Some(stretched)) => stretched,
        Ok(None) => bytes,
        Err(e) => {
            warn!("Keeping {platform_id} screenshot unmodified: {e}");
            bytes
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use rstest::rstest;

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[rstest]
    #[case::square(4, 4, None)]
    #[case::wide(512, 224, Some((512, 448)))]
    #[case::tall(100, 300, Some((200, 300)))]
    #[case::at_limit(400, 200, None)]
    #[case::empty(0, 10, None)]
    fn test_stretched_dimensions(
        #[case] width: u32,
        #[case] height: u32,
        #[case] expected: Option<(u32, u32)>,
    ) {
        assert_eq!(stretched_dimensions(width, height, 2.0), expected);
    }

    #[test]
    fn test_normalize_stretches_configured_platform() {
        let config = ScreenshotConfig::default();
        let out = normalize(&config, "snes", png(8, 2));
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!((img.width(), img.height()), (8, 4));
    }

    #[test]
    fn test_normalize_skips_other_platforms() {
        let config = ScreenshotConfig::default();
        let original = png(8, 2);
        assert_eq!(normalize(&config, "nes", original.clone()), original);
    }

    #[test]
    fn test_normalize_keeps_undecodable_bytes() {
        let config = ScreenshotConfig::default();
        let garbage = vec![1, 2, 3, 4];
        assert_eq!(normalize(&config, "snes", garbage.clone()), garbage);
    }

    #[test]
    fn test_decode_check() {
        assert!(decode_check(&png(2, 2)).is_ok());
        assert_eq!(decode_check(b"hello").unwrap_err().0, ImageFault::Format);

        let mut truncated = png(16, 16);
        truncated.truncate(20);
        assert_eq!(decode_check(&truncated).unwrap_err().0, ImageFault::Decode);
    }
}
