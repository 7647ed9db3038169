use std::io::Cursor;

use image::{imageops, ImageBuffer, ImageFormat, Rgb, RgbImage};
use log::{debug, error};
use rand::seq::IndexedRandom;

use crate::media_downloader::MediaDownloader;
use crate::media_types::MediaListEntry;
use crate::size_descriptor::SizeDescriptor;

/// An image is portrait iff it is taller than it is wide.
pub fn is_portrait(dimensions: (f64, f64)) -> bool {
    dimensions.0 < dimensions.1
}

/// Fraction of a cropped-to-cover image's area that falls outside the
/// target canvas.
pub fn cut_loss(target: (f64, f64), source: (f64, f64)) -> f64 {
    let multiplier = (target.0 / source.0).max(target.1 / source.1);
    1.0 - (target.0 * target.1) / ((source.0 * multiplier) * (source.1 * multiplier))
}

/// Split the target canvas in half along whichever axis needs the smaller
/// scale-up of the source, so each tile stays close to the source's shape.
pub fn half_canvas(target: (f64, f64), source: (f64, f64)) -> (f64, f64) {
    let multiplier_width = target.0 / source.0;
    let multiplier_height = target.1 / source.1;
    if multiplier_height > multiplier_width {
        (target.0, target.1 / 2.0)
    } else {
        (target.0 / 2.0, target.1)
    }
}

/// Geometry of a two-image tiling of the requested canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinePlan {
    half: (f64, f64),
    /// Orientation the partner image must share with the current item.
    pub portrait_partners: bool,
}

impl CombinePlan {
    /// Crop descriptor for each tile (rounded up so the tiles cover the
    /// canvas).
    pub fn half_descriptor(&self) -> SizeDescriptor {
        SizeDescriptor::new(self.half.0.ceil() as u32, self.half.1.ceil() as u32, true)
    }

    /// Placement of the second tile relative to the canvas origin.
    fn second_offset(&self, canvas_width: u32) -> (i64, i64) {
        if (self.half.0 as u32) < canvas_width {
            (self.half.0.floor() as i64, 0)
        } else {
            (0, self.half.1.floor() as i64)
        }
    }
}

/// Decide whether tiling two images beats cropping the current item alone.
///
/// Returns `None` (single-image rendering) when the requested orientation
/// already matches the item's, when the item's dimensions are unknown, or
/// when the single-image cut loss is no worse than the per-tile loss.
pub fn plan_combination(
    requested_width: u32,
    requested_height: u32,
    source: Option<(f64, f64)>,
) -> Option<CombinePlan> {
    let source = source.filter(|d| d.0 > 0.0 && d.1 > 0.0)?;
    let target = (requested_width as f64, requested_height as f64);

    let source_portrait = is_portrait(source);
    if is_portrait(target) == source_portrait {
        return None;
    }

    let half = half_canvas(target, source);
    let loss_single = cut_loss(target, source);
    let loss_half = cut_loss(half, source);
    if loss_single <= loss_half {
        // Tiling would discard at least as much of the image
        return None;
    }

    Some(CombinePlan {
        half,
        portrait_partners: source_portrait,
    })
}

/// Uniformly pick a partner item sharing the current item's orientation.
/// Items without known dimensions cannot be orientation-checked and are
/// skipped.
pub fn pick_partner(
    photos: &[MediaListEntry],
    current_id: &str,
    portrait: bool,
) -> Option<MediaListEntry> {
    let candidates: Vec<&MediaListEntry> = photos
        .iter()
        .filter(|m| m.id != current_id)
        .filter(|m| m.dimensions().is_some_and(|d| is_portrait(d) == portrait))
        .collect();
    candidates.choose(&mut rand::rng()).map(|m| (*m).clone())
}

/// Fetch both tiles concurrently and compose them onto a canvas of the
/// requested size, encoded as JPEG. Returns `None` when either fetch or
/// decode fails; the caller falls back to single-image rendering.
pub async fn render(
    primary: &MediaDownloader,
    secondary: &MediaDownloader,
    plan: &CombinePlan,
    width: u32,
    height: u32,
) -> Option<Vec<u8>> {
    let descriptor = plan.half_descriptor();
    let (first, second) = tokio::join!(
        primary.download(&descriptor),
        secondary.download(&descriptor)
    );
    let (first, second) = (first?, second?);

    let first = decode(&first)?;
    let second = decode(&second)?;

    let mut canvas: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([255, 255, 255]));
    imageops::overlay(&mut canvas, &first, 0, 0);
    let (offset_x, offset_y) = plan.second_offset(width);
    imageops::overlay(&mut canvas, &second, offset_x, offset_y);

    let mut encoded = Vec::new();
    if let Err(e) = image::DynamicImage::ImageRgb8(canvas)
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
    {
        error!("Failed to encode combined image: {}", e);
        return None;
    }
    debug!(
        "Combined two images onto {}x{} canvas ({} bytes)",
        width,
        height,
        encoded.len()
    );
    Some(encoded)
}

fn decode(bytes: &[u8]) -> Option<RgbImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            error!("Failed to decode fetched image: {}", e);
            None
        }
    }
}
