//! Shrinking attached screenshots to fit provider payload budgets
//!
//! Images arrive as `data:<mime>;base64,<payload>` URLs. Anything over the
//! byte budget is progressively downscaled and re-encoded as JPEG.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};

/// Downscale steps as percentages of the original size
const SCALE_STEPS: [u64; 6] = [90, 80, 70, 60, 50, 40];
const MIN_SIDE: u32 = 200;
const START_QUALITY: u8 = 85;
const QUALITY_STEP: u8 = 15;
const MIN_QUALITY: u8 = 30;
const THUMBNAIL_SIDE: u32 = 400;
const THUMBNAIL_QUALITY: u8 = 40;

/// Split a data URL into its header and decoded bytes
#[must_use]
pub fn parse_data_url(data_url: &str) -> Option<(&str, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((header, bytes))
}

/// Shrink a data URL image until its decoded size is at most `max_bytes`
///
/// Returns the input unchanged when it already fits, a JPEG data URL when
/// re-encoding succeeded within budget, and `None` otherwise.
#[must_use]
pub fn compress_data_url(data_url: &str, max_bytes: usize) -> Option<String> {
    let (_, bytes) = parse_data_url(data_url)?;
    if bytes.len() <= max_bytes {
        return Some(data_url.to_string());
    }

    let img = match decode(&bytes) {
        Ok(img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        Err(e) => {
            tracing::debug!(error = %e, "could not decode attached image");
            return None;
        }
    };
    let (width, height) = img.dimensions();

    let mut quality = START_QUALITY;
    for pct in SCALE_STEPS {
        let resized = img.resize_exact(
            scaled(width, pct),
            scaled(height, pct),
            FilterType::Lanczos3,
        );
        if let Some(jpeg) = encode_jpeg(&resized, quality).filter(|b| b.len() <= max_bytes) {
            tracing::debug!(
                original = bytes.len(),
                compressed = jpeg.len(),
                scale_pct = pct,
                quality,
                "compressed attached image"
            );
            return Some(to_data_url(&jpeg));
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }

    let thumb = if width > THUMBNAIL_SIDE || height > THUMBNAIL_SIDE {
        img.resize(THUMBNAIL_SIDE, THUMBNAIL_SIDE, FilterType::Lanczos3)
    } else {
        img
    };
    let jpeg = encode_jpeg(&thumb, THUMBNAIL_QUALITY)?;
    if jpeg.len() <= max_bytes {
        tracing::debug!(original = bytes.len(), compressed = jpeg.len(), "thumbnailed attached image");
        return Some(to_data_url(&jpeg));
    }

    tracing::debug!(original = bytes.len(), max_bytes, "image too large even as thumbnail");
    None
}

fn decode(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}

fn scaled(side: u32, pct: u64) -> u32 {
    let side = u32::try_from(u64::from(side) * pct / 100).unwrap_or(u32::MAX);
    side.max(MIN_SIDE)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    match img.write_with_encoder(encoder) {
        Ok(()) => Some(buf),
        Err(e) => {
            tracing::debug!(error = %e, "jpeg encoding failed");
            None
        }
    }
}

fn to_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}
