// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Geometry conversion between COCO pixel values and normalized geometry.
//!
//! ## Coordinate Systems
//!
//! - **COCO**: pixel coordinates, `[x_min, y_min, width, height]` boxes and
//!   flat `[x1, y1, x2, y2, ...]` polygon rings
//! - **Canonical**: normalized 0-1 corner boxes and point polygons
//!
//! Pixel values written to COCO are truncated toward zero, after rounding
//! to 6 decimals so that float noise such as `9.999999999999998` still lands
//! on the intended pixel.

use super::types::CocoSegmentation;
use crate::{
    Error,
    geometry::{Bbox, Denormalize, Normalize, Normalized, Pixel, Polygon, round6},
    shapes::{box_to_polygon, largest_polygon, polygon_area},
};

/// Whole-pixel value written to COCO.
pub fn whole_pixels(value: f64) -> f64 {
    round6(value).trunc() + 0.0
}

/// Convert a COCO bbox `[x, y, w, h]` (top-left, pixels) to a normalized
/// corner box.
///
/// # Example
/// ```
/// use annoconv::coco::coco_bbox_to_box;
///
/// let bbox = coco_bbox_to_box(&[10.0, 10.0, 20.0, 10.0], 100, 50).unwrap();
/// assert!((bbox.min_x() - 0.1).abs() < 1e-9);
/// assert!((bbox.height() - 0.2).abs() < 1e-9);
/// ```
pub fn coco_bbox_to_box(
    bbox: &[f64; 4],
    image_width: u32,
    image_height: u32,
) -> Result<Bbox<Normalized>, Error> {
    let [x, y, w, h] = *bbox;
    Bbox::<Pixel>::new(x, y, w, h).to_normalized(image_width, image_height)
}

/// Convert a normalized box to a COCO bbox `[x, y, w, h]` in whole pixels.
pub fn box_to_coco_bbox(
    bbox: &Bbox<Normalized>,
    image_width: u32,
    image_height: u32,
) -> Result<[f64; 4], Error> {
    let px = bbox.to_pixels(image_width, image_height)?;
    Ok([
        whole_pixels(px.min_x()),
        whole_pixels(px.min_y()),
        whole_pixels(px.width()),
        whole_pixels(px.height()),
    ])
}

/// The largest polygon ring of a segmentation, normalized.
///
/// Rings with fewer than three points are ignored. RLE segmentations and
/// segmentations without a usable ring yield `None`.
pub fn coco_segmentation_to_polygon(
    segmentation: &CocoSegmentation,
    image_width: u32,
    image_height: u32,
) -> Result<Option<Polygon<Normalized>>, Error> {
    let CocoSegmentation::Polygon(rings) = segmentation else {
        return Ok(None);
    };

    let largest = largest_polygon(
        rings
            .iter()
            .filter(|ring| ring.len() >= 6)
            .map(|ring| Polygon::<Pixel>::from_flat(ring)),
    );

    largest
        .map(|polygon| polygon.to_normalized(image_width, image_height))
        .transpose()
}

/// Convert a normalized polygon to a single-ring COCO segmentation in whole
/// pixels, returning it together with its area.
pub fn polygon_to_coco_segmentation(
    polygon: &Polygon<Normalized>,
    image_width: u32,
    image_height: u32,
) -> Result<(CocoSegmentation, f64), Error> {
    let px = polygon.to_pixels(image_width, image_height)?;
    let flat: Vec<f64> = px.to_flat().into_iter().map(whole_pixels).collect();
    let area = polygon_area(&Polygon::<Pixel>::from_flat(&flat));
    Ok((CocoSegmentation::Polygon(vec![flat]), area))
}

/// Rectangle segmentation for a COCO bbox, used when boxes are written with
/// synthesized segmentations.
pub fn coco_bbox_to_segmentation(bbox: &[f64; 4]) -> CocoSegmentation {
    let [x, y, w, h] = *bbox;
    let rect = box_to_polygon(&Bbox::<Pixel>::new(x, y, w, h));
    CocoSegmentation::Polygon(vec![rect.to_flat()])
}

/// Area of a COCO bbox.
pub fn coco_bbox_area(bbox: &[f64; 4]) -> f64 {
    bbox[2] * bbox[3]
}
