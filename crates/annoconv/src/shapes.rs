// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Box ↔ polygon derivations and the minimum-size policy.

use crate::{
    Error,
    geometry::{Bbox, Normalized, Point, Polygon, Unit},
};

/// Axis-aligned bounding box of a polygon (min/max reduction).
///
/// # Errors
/// [`Error::EmptyGeometry`] when the polygon has no points.
pub fn polygon_to_box<U: Unit>(polygon: &Polygon<U>) -> Result<Bbox<U>, Error> {
    let mut points = polygon.points().iter();
    let first = points.next().ok_or(Error::EmptyGeometry)?;

    let (min_x, min_y, max_x, max_y) = points.fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );

    Ok(Bbox::from_corners(min_x, min_y, max_x, max_y))
}

/// Rectangle polygon for a box, wound
/// `(min_x, min_y) → (max_x, min_y) → (max_x, max_y) → (min_x, max_y)`.
pub fn box_to_polygon<U: Unit>(bbox: &Bbox<U>) -> Polygon<U> {
    let (x0, y0, x1, y1) = (bbox.min_x(), bbox.min_y(), bbox.max_x(), bbox.max_y());
    Polygon::new(vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ])
}

/// Minimum-size check on a normalized box measured in pixels.
///
/// The box passes when **either** its short edge or its long edge is at
/// least `min_edge_px`; only boxes whose edges are both below the threshold
/// are rejected.
pub fn passes_minimum_size(
    bbox: &Bbox<Normalized>,
    image_width_px: u32,
    image_height_px: u32,
    min_edge_px: f64,
) -> bool {
    let width_px = bbox.width() * image_width_px as f64;
    let height_px = bbox.height() * image_height_px as f64;

    let short_edge = width_px.min(height_px);
    let long_edge = width_px.max(height_px);

    short_edge >= min_edge_px || long_edge >= min_edge_px
}

/// Optional minimum-size filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MinimumSize {
    /// Threshold in pixels, `None` keeps every box.
    pub min_edge_px: Option<f64>,
}

impl MinimumSize {
    pub fn new(min_edge_px: Option<f64>) -> Self {
        Self { min_edge_px }
    }

    /// True when the box should be kept.
    pub fn keep(&self, bbox: &Bbox<Normalized>, image_width_px: u32, image_height_px: u32) -> bool {
        match self.min_edge_px {
            Some(min) => passes_minimum_size(bbox, image_width_px, image_height_px, min),
            None => true,
        }
    }
}

/// Polygon area using the shoelace formula, in squared units of the
/// polygon's coordinates.
pub fn polygon_area<U: Unit>(polygon: &Polygon<U>) -> f64 {
    let points = polygon.points();
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let mut area = 0.0;

    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y - points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

/// The polygon with the largest area, first one wins ties.
pub fn largest_polygon<U: Unit>(polygons: impl IntoIterator<Item = Polygon<U>>) -> Option<Polygon<U>> {
    polygons
        .into_iter()
        .fold(None, |best: Option<(f64, Polygon<U>)>, polygon| {
            let area = polygon_area(&polygon);
            match best {
                Some((best_area, _)) if best_area >= area => best,
                _ => Some((area, polygon)),
            }
        })
        .map(|(_, polygon)| polygon)
}
