// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Polygon extraction from color-coded segmentation masks.
//!
//! Every registered color is turned into a binary mask by exact RGB
//! equality. The outer border of each connected region is traced with
//! Suzuki-Abe border following (`imageproc::contours::find_contours`), holes
//! and anything nested inside them are ignored, and straight runs are
//! compressed down to their end points. Regions enclosing one pixel of area
//! or less are dropped as noise.

use crate::{
    geometry::{Pixel, Point, Polygon},
    shapes::polygon_area,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use std::collections::HashMap;

/// Regions with this enclosed area or less are discarded.
pub const MIN_CONTOUR_AREA: f64 = 1.0;

/// Immutable mapping from an exact RGB color to a canonical class id.
///
/// Colors keep their registration order, which is also the order polygons
/// are emitted in. Two colors may share a class id; their polygons are then
/// reported under that one class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorClassMap {
    entries: Vec<(Rgb<u8>, u32)>,
}

impl ColorClassMap {
    /// Build a map. A color listed twice keeps its first position and its
    /// last class id.
    pub fn new(entries: impl IntoIterator<Item = ([u8; 3], u32)>) -> Self {
        let mut map: Vec<(Rgb<u8>, u32)> = Vec::new();
        for (rgb, class_id) in entries {
            let color = Rgb(rgb);
            match map.iter_mut().find(|(c, _)| *c == color) {
                Some(entry) => entry.1 = class_id,
                None => map.push((color, class_id)),
            }
        }
        Self { entries: map }
    }

    pub fn class_of(&self, color: &Rgb<u8>) -> Option<u32> {
        self.entries
            .iter()
            .find(|(c, _)| c == color)
            .map(|(_, class_id)| *class_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rgb<u8>, u32)> {
        self.entries.iter().map(|(c, id)| (c, *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A traced region tagged with its class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassContour {
    pub class_id: u32,
    pub polygon: Polygon<Pixel>,
}

/// Extract one pixel-space polygon per connected region of every
/// registered color.
pub fn extract_contours(image: &RgbImage, colors: &ColorClassMap) -> Vec<ClassContour> {
    let mut result = Vec::new();

    for (color, class_id) in colors.iter() {
        let Some(mask) = color_mask(image, color) else {
            continue;
        };

        result.extend(
            external_contours(&mask)
                .into_iter()
                .filter(|polygon| polygon_area(polygon) > MIN_CONTOUR_AREA)
                .map(|polygon| ClassContour { class_id, polygon }),
        );
    }

    result
}

/// Binary mask of the pixels exactly equal to `color`, or `None` when no
/// pixel matches.
pub fn color_mask(image: &RgbImage, color: &Rgb<u8>) -> Option<GrayImage> {
    let mut any = false;
    let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y) == color {
            any = true;
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    any.then_some(mask)
}

/// Outer borders of the foreground regions in a binary mask, compressed.
pub fn external_contours(mask: &GrayImage) -> Vec<Polygon<Pixel>> {
    let contours: Vec<Contour<i32>> = find_contours(mask);

    contours
        .iter()
        .filter(|c| is_external(c, &contours))
        .map(|c| {
            let points: Vec<(i32, i32)> = c.points.iter().map(|p| (p.x, p.y)).collect();
            let points = compress_chain(&points)
                .into_iter()
                .map(|(x, y)| Point::new(f64::from(x), f64::from(y)))
                .collect();
            Polygon::new(points)
        })
        .collect()
}

fn is_external(contour: &Contour<i32>, all: &[Contour<i32>]) -> bool {
    contour.border_type == BorderType::Outer
        && contour
            .parent
            .is_none_or(|parent| all[parent].border_type != BorderType::Hole)
}

/// Drop points lying in the middle of a straight horizontal, vertical or
/// diagonal run, keeping only the points where the direction changes.
///
/// The chain is treated as closed.
pub fn compress_chain(points: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut chain: Vec<(i32, i32)> = points.to_vec();
    chain.dedup();
    if chain.len() > 1 && chain.first() == chain.last() {
        chain.pop();
    }

    let n = chain.len();
    if n < 3 {
        return chain;
    }

    let step = |a: (i32, i32), b: (i32, i32)| ((b.0 - a.0).signum(), (b.1 - a.1).signum());

    (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let next = chain[(i + 1) % n];
            step(prev, chain[i]) != step(chain[i], next)
        })
        .map(|i| chain[i])
        .collect()
}

/// Distinct colors in an image with their pixel counts, most frequent
/// first, ties broken by color value.
pub fn color_histogram(image: &RgbImage) -> Vec<(Rgb<u8>, u64)> {
    let mut counts: HashMap<[u8; 3], u64> = HashMap::new();
    for pixel in image.pixels() {
        *counts.entry(pixel.0).or_default() += 1;
    }

    let mut histogram: Vec<(Rgb<u8>, u64)> = counts.into_iter().map(|(c, n)| (Rgb(c), n)).collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.0.cmp(&b.0.0)));
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::polygon_to_box;

    const YELLOW: [u8; 3] = [254, 233, 3];
    const PURPLE: [u8; 3] = [201, 19, 223];
    const BACKGROUND: [u8; 3] = [0, 0, 0];

    fn fill(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: [u8; 3]) {
        for y in y0..y1 {
            for x in x0..x1 {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }

    #[test]
    fn test_solid_block_single_polygon() {
        let mut image = RgbImage::from_pixel(30, 30, Rgb(BACKGROUND));
        fill(&mut image, 5, 5, 15, 15, YELLOW);

        let colors = ColorClassMap::new([(YELLOW, 0), (PURPLE, 1)]);
        let contours = extract_contours(&image, &colors);

        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].class_id, 0);

        let area = polygon_area(&contours[0].polygon);
        assert!((81.0..=100.0).contains(&area), "area {}", area);

        // Straight edges compress to the four corners.
        assert_eq!(contours[0].polygon.len(), 4);
        let bbox = polygon_to_box(&contours[0].polygon).unwrap();
        assert_eq!(bbox.min_x(), 5.0);
        assert_eq!(bbox.max_x(), 14.0);
    }

    #[test]
    fn test_absent_color_yields_nothing() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb(BACKGROUND));
        fill(&mut image, 2, 2, 8, 8, YELLOW);

        let colors = ColorClassMap::new([(PURPLE, 1)]);
        assert!(extract_contours(&image, &colors).is_empty());
        assert!(color_mask(&image, &Rgb(PURPLE)).is_none());
    }

    #[test]
    fn test_exact_match_only() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb(BACKGROUND));
        fill(&mut image, 2, 2, 8, 8, [254, 233, 4]);

        let colors = ColorClassMap::new([(YELLOW, 0)]);
        assert!(extract_contours(&image, &colors).is_empty());
    }

    #[test]
    fn test_noise_pixels_dropped() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb(BACKGROUND));
        image.put_pixel(3, 3, Rgb(YELLOW));
        fill(&mut image, 10, 10, 12, 11, YELLOW);

        let colors = ColorClassMap::new([(YELLOW, 0)]);
        assert!(extract_contours(&image, &colors).is_empty());
    }

    #[test]
    fn test_hole_not_emitted() {
        let mut image = RgbImage::from_pixel(30, 30, Rgb(BACKGROUND));
        fill(&mut image, 2, 2, 20, 20, YELLOW);
        fill(&mut image, 6, 6, 14, 14, BACKGROUND);
        // Island inside the hole is nested, not external.
        fill(&mut image, 8, 8, 12, 12, YELLOW);

        let colors = ColorClassMap::new([(YELLOW, 3)]);
        let contours = extract_contours(&image, &colors);

        assert_eq!(contours.len(), 1);
        let bbox = polygon_to_box(&contours[0].polygon).unwrap();
        assert_eq!(bbox.min_x(), 2.0);
        assert_eq!(bbox.max_y(), 19.0);
    }

    #[test]
    fn test_two_regions_two_classes() {
        let mut image = RgbImage::from_pixel(40, 20, Rgb(BACKGROUND));
        fill(&mut image, 1, 1, 9, 9, YELLOW);
        fill(&mut image, 20, 5, 30, 15, YELLOW);
        fill(&mut image, 12, 12, 18, 18, PURPLE);

        let colors = ColorClassMap::new([(YELLOW, 0), (PURPLE, 1)]);
        let contours = extract_contours(&image, &colors);

        assert_eq!(contours.iter().filter(|c| c.class_id == 0).count(), 2);
        assert_eq!(contours.iter().filter(|c| c.class_id == 1).count(), 1);
        // Emitted in color registration order.
        assert_eq!(contours.last().unwrap().class_id, 1);
    }

    #[test]
    fn test_shared_class_merges() {
        let mut image = RgbImage::from_pixel(30, 10, Rgb(BACKGROUND));
        fill(&mut image, 1, 1, 8, 8, YELLOW);
        fill(&mut image, 15, 1, 22, 8, PURPLE);

        let colors = ColorClassMap::new([(YELLOW, 2), (PURPLE, 2)]);
        let contours = extract_contours(&image, &colors);

        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| c.class_id == 2));
    }

    #[test]
    fn test_color_map_duplicate_color() {
        let colors = ColorClassMap::new([(YELLOW, 0), (PURPLE, 1), (YELLOW, 5)]);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors.class_of(&Rgb(YELLOW)), Some(5));
        assert_eq!(colors.iter().next().map(|(c, _)| *c), Some(Rgb(YELLOW)));
    }

    #[test]
    fn test_compress_chain() {
        let square = [
            (0, 0),
            (1, 0),
            (2, 0),
            (2, 1),
            (2, 2),
            (1, 2),
            (0, 2),
            (0, 1),
        ];
        assert_eq!(compress_chain(&square), vec![(0, 0), (2, 0), (2, 2), (0, 2)]);

        let diagonal = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];
        assert_eq!(compress_chain(&diagonal), vec![(0, 0), (2, 2), (0, 2)]);

        assert_eq!(compress_chain(&[(1, 1), (1, 1)]), vec![(1, 1)]);
    }

    #[test]
    fn test_color_histogram() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb(BACKGROUND));
        fill(&mut image, 0, 0, 2, 1, YELLOW);

        let histogram = color_histogram(&image);
        assert_eq!(histogram, vec![(Rgb(BACKGROUND), 14), (Rgb(YELLOW), 2)]);
    }
}
