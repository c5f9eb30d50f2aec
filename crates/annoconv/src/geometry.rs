// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Coordinate types and the pixel ↔ normalized transforms.
//!
//! ## Coordinate Systems
//!
//! - **Pixel**: absolute image coordinates, top-left origin
//! - **Normalized**: image-relative `[0, 1]`, top-left origin
//!
//! The unit system is part of every value's type ([`Pixel`] or
//! [`Normalized`]), so a pixel box cannot be normalized twice and a
//! normalized box cannot be handed to code expecting pixels.
//!
//! Normalized outputs are clamped to `[0, 1]`. Points are rounded to 6
//! decimal digits on conversion. Boxes keep their clamped corners unrounded
//! so the center and extent written by an adapter are each rounded exactly
//! once (`w / W`, not the difference of two rounded corners). Pixel outputs
//! are left as floats; truncation to integers happens in the format
//! adapters.

use crate::Error;
use std::{fmt::Debug, marker::PhantomData};

/// Number of decimal digits kept for normalized coordinates.
pub const NORMALIZED_DECIMALS: i32 = 6;

/// Runtime view of a unit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Pixel,
    Normalized,
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Pixel {}
    impl Sealed for super::Normalized {}
}

/// Unit marker implemented by [`Pixel`] and [`Normalized`] only.
pub trait Unit: private::Sealed + Copy + Debug + Default + PartialEq + Send + Sync {
    const UNITS: Units;
}

/// Absolute pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel;

/// Image-relative coordinates in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalized;

impl Unit for Pixel {
    const UNITS: Units = Units::Pixel;
}

impl Unit for Normalized {
    const UNITS: Units = Units::Normalized;
}

/// Round to [`NORMALIZED_DECIMALS`] decimal digits.
pub fn round6(value: f64) -> f64 {
    let scale = 10f64.powi(NORMALIZED_DECIMALS);
    (value * scale).round() / scale
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Validate image dimensions and return them as floats.
pub fn check_dimensions(width: u32, height: u32) -> Result<(f64, f64), Error> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimension {
            width: width as i64,
            height: height as i64,
        });
    }
    Ok((width as f64, height as f64))
}

/// A single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<U> {
    pub x: f64,
    pub y: f64,
    unit: PhantomData<U>,
}

impl<U: Unit> Point<U> {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            unit: PhantomData,
        }
    }
}

/// Axis-aligned box, built from `{min_x, min_y, width, height}` or from its
/// corners.
///
/// The corners are stored as given, so rebuilding a box from its own
/// corners yields the identical value. Width and height are derived.
/// Negative extents collapse to zero on construction; a zero-sized box is
/// allowed and left for the minimum-size policy to remove.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox<U> {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    unit: PhantomData<U>,
}

impl<U: Unit> Bbox<U> {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(
            min_x,
            min_y,
            min_x + width.max(0.0),
            min_y + height.max(0.0),
        )
    }

    /// Build from the top-left and bottom-right corners.
    pub fn from_corners(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
            unit: PhantomData,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when either dimension is zero.
    pub fn is_degenerate(&self) -> bool {
        self.max_x == self.min_x || self.max_y == self.min_y
    }

    pub fn units(&self) -> Units {
        U::UNITS
    }
}

/// Axis-aligned box in center form `{x_center, y_center, width, height}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterBox<U> {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    unit: PhantomData<U>,
}

impl<U: Unit> CenterBox<U> {
    pub fn new(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
            unit: PhantomData,
        }
    }
}

/// Ordered polygon vertices.
///
/// Vertex order is kept exactly as produced (contour tracing order or file
/// order); nothing here reorders or closes the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon<U> {
    points: Vec<Point<U>>,
}

impl<U: Unit> Polygon<U> {
    pub fn new(points: Vec<Point<U>>) -> Self {
        Self { points }
    }

    /// Build from a flat `[x1, y1, x2, y2, ...]` list. A trailing unpaired
    /// value is ignored.
    pub fn from_flat(coords: &[f64]) -> Self {
        Self {
            points: coords
                .chunks_exact(2)
                .map(|pair| Point::new(pair[0], pair[1]))
                .collect(),
        }
    }

    /// Flatten to `[x1, y1, x2, y2, ...]`.
    pub fn to_flat(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    pub fn points(&self) -> &[Point<U>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn units(&self) -> Units {
        U::UNITS
    }
}

/// Pixel → normalized conversion.
pub trait Normalize {
    type Output;

    /// Divide x-components by `width` and y-components by `height` and
    /// clamp to `[0, 1]`. Points and center boxes are also rounded to 6
    /// decimals.
    fn to_normalized(&self, width: u32, height: u32) -> Result<Self::Output, Error>;
}

/// Normalized → pixel conversion.
pub trait Denormalize {
    type Output;

    /// Multiply x-components by `width` and y-components by `height`.
    fn to_pixels(&self, width: u32, height: u32) -> Result<Self::Output, Error>;
}

/// Convert any pixel-space value to normalized space.
pub fn to_normalized<T: Normalize>(value: &T, width: u32, height: u32) -> Result<T::Output, Error> {
    value.to_normalized(width, height)
}

/// Convert any normalized value to pixel space.
pub fn to_pixels<T: Denormalize>(value: &T, width: u32, height: u32) -> Result<T::Output, Error> {
    value.to_pixels(width, height)
}

impl Normalize for Point<Pixel> {
    type Output = Point<Normalized>;

    fn to_normalized(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        let (w, h) = check_dimensions(width, height)?;
        Ok(Point::new(
            round6(clamp_unit(self.x / w)),
            round6(clamp_unit(self.y / h)),
        ))
    }
}

impl Denormalize for Point<Normalized> {
    type Output = Point<Pixel>;

    fn to_pixels(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        let (w, h) = check_dimensions(width, height)?;
        Ok(Point::new(self.x * w, self.y * h))
    }
}

impl Normalize for Bbox<Pixel> {
    type Output = Bbox<Normalized>;

    fn to_normalized(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        let (w, h) = check_dimensions(width, height)?;
        // Clamp the corners so a box hanging over the border shrinks instead
        // of shifting. Rounding is left to the writer.
        Ok(Bbox::from_corners(
            clamp_unit(self.min_x / w),
            clamp_unit(self.min_y / h),
            clamp_unit(self.max_x / w),
            clamp_unit(self.max_y / h),
        ))
    }
}

impl Denormalize for Bbox<Normalized> {
    type Output = Bbox<Pixel>;

    fn to_pixels(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        let (w, h) = check_dimensions(width, height)?;
        Ok(Bbox::from_corners(
            self.min_x * w,
            self.min_y * h,
            self.max_x * w,
            self.max_y * h,
        ))
    }
}

impl Normalize for CenterBox<Pixel> {
    type Output = CenterBox<Normalized>;

    fn to_normalized(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        let corner = center_to_corner(self).to_normalized(width, height)?;
        let center = corner_to_center(&corner);
        Ok(CenterBox::new(
            round6(center.x_center),
            round6(center.y_center),
            round6(center.width),
            round6(center.height),
        ))
    }
}

impl Denormalize for CenterBox<Normalized> {
    type Output = CenterBox<Pixel>;

    fn to_pixels(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        let (w, h) = check_dimensions(width, height)?;
        Ok(CenterBox::new(
            self.x_center * w,
            self.y_center * h,
            self.width * w,
            self.height * h,
        ))
    }
}

impl Normalize for Polygon<Pixel> {
    type Output = Polygon<Normalized>;

    fn to_normalized(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        check_dimensions(width, height)?;
        let points = self
            .points
            .iter()
            .map(|p| p.to_normalized(width, height))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(points))
    }
}

impl Denormalize for Polygon<Normalized> {
    type Output = Polygon<Pixel>;

    fn to_pixels(&self, width: u32, height: u32) -> Result<Self::Output, Error> {
        check_dimensions(width, height)?;
        let points = self
            .points
            .iter()
            .map(|p| p.to_pixels(width, height))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(points))
    }
}

/// `{xc, yc, w, h}` → `{xc - w/2, yc - h/2, w, h}`.
pub fn center_to_corner<U: Unit>(b: &CenterBox<U>) -> Bbox<U> {
    Bbox::new(
        b.x_center - b.width / 2.0,
        b.y_center - b.height / 2.0,
        b.width,
        b.height,
    )
}

/// `{min_x, min_y, w, h}` → `{min_x + w/2, min_y + h/2, w, h}`.
pub fn corner_to_center<U: Unit>(b: &Bbox<U>) -> CenterBox<U> {
    let (width, height) = (b.width(), b.height());
    CenterBox::new(b.min_x + width / 2.0, b.min_y + height / 2.0, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round6() {
        assert_eq!(round6(0.1234564), 0.123456);
        assert_eq!(round6(0.1234565001), 0.123457);
        assert_eq!(round6(0.19999999999999998), 0.2);
    }

    #[test]
    fn test_bbox_to_normalized() {
        let bbox = Bbox::<Pixel>::new(10.0, 10.0, 20.0, 10.0);
        let norm = bbox.to_normalized(100, 50).unwrap();

        assert_eq!(norm.min_x(), 0.1);
        assert_eq!(norm.min_y(), 0.2);
        assert_eq!(norm.max_x(), 0.3);
        assert_eq!(round6(norm.width()), 0.2);
        assert_eq!(round6(norm.height()), 0.2);
        assert_eq!(norm.units(), Units::Normalized);
    }

    #[test]
    fn test_normalized_extent_rounded_once() {
        // 1/3 rounds to 0.333333, but 2/3 - 1/3 with both corners rounded
        // first would give 0.333334.
        let norm = Bbox::<Pixel>::new(1.0, 1.0, 1.0, 1.0).to_normalized(3, 3).unwrap();
        let center = corner_to_center(&norm);

        assert_eq!(round6(norm.width()), 0.333333);
        assert_eq!(round6(norm.height()), 0.333333);
        assert_eq!(round6(center.x_center), 0.5);
        assert_eq!(round6(center.y_center), 0.5);

        let center = CenterBox::<Pixel>::new(1.5, 1.5, 1.0, 1.0).to_normalized(3, 3).unwrap();
        assert_eq!(center, CenterBox::new(0.5, 0.5, 0.333333, 0.333333));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let bbox = Bbox::<Pixel>::new(10.0, 10.0, 20.0, 10.0);
        assert!(matches!(
            bbox.to_normalized(0, 50),
            Err(Error::InvalidDimension {
                width: 0,
                height: 50
            })
        ));

        let point = Point::<Normalized>::new(0.5, 0.5);
        assert!(point.to_pixels(640, 0).is_err());
    }

    #[test]
    fn test_out_of_bounds_is_clamped() {
        // Box hangs 10px past the right and bottom edge.
        let bbox = Bbox::<Pixel>::new(90.0, 40.0, 20.0, 20.0);
        let norm = bbox.to_normalized(100, 50).unwrap();

        assert_eq!(norm.min_x(), 0.9);
        assert!((norm.max_x() - 1.0).abs() < 1e-9);
        assert_eq!(norm.min_y(), 0.8);
        assert!((norm.height() - 0.2).abs() < 1e-9);

        let point = Point::<Pixel>::new(-3.0, 120.0).to_normalized(100, 100).unwrap();
        assert_eq!(point.x, 0.0);
        assert_eq!(point.y, 1.0);
    }

    #[test]
    fn test_normalize_pixel_roundtrip() {
        let cases = [
            (Bbox::<Normalized>::new(0.1, 0.2, 0.3, 0.4), 640, 480),
            (Bbox::<Normalized>::new(0.123456, 0.654321, 0.2, 0.1), 1920, 1080),
            (Bbox::<Normalized>::new(0.0, 0.0, 1.0, 1.0), 7, 3),
            (Bbox::<Normalized>::new(0.333333, 0.5, 0.25, 0.0), 1, 1),
        ];

        for (b, w, h) in cases {
            let pixels = b.to_pixels(w, h).unwrap();
            let back = pixels.to_normalized(w, h).unwrap();
            let again = back.to_pixels(w, h).unwrap();

            assert_eq!(round6(back.min_x()), round6(b.min_x()));
            assert_eq!(round6(back.min_y()), round6(b.min_y()));
            assert_eq!(round6(back.width()), round6(b.width()));
            assert_eq!(round6(back.height()), round6(b.height()));
            assert!((again.min_x() - pixels.min_x()).abs() <= 1e-9 * w as f64);
            assert!((again.width() - pixels.width()).abs() <= 1e-9 * w as f64);
            assert!((again.height() - pixels.height()).abs() <= 1e-9 * h as f64);
        }
    }

    #[test]
    fn test_center_corner_conversion() {
        let center = CenterBox::<Normalized>::new(0.5, 0.5, 0.25, 0.5);
        let corner = center_to_corner(&center);

        assert_eq!(corner.min_x(), 0.375);
        assert_eq!(corner.min_y(), 0.25);
        assert_eq!(corner.width(), 0.25);
        assert_eq!(corner_to_center(&corner), center);
    }

    #[test]
    fn test_center_box_normalize() {
        let center = CenterBox::<Pixel>::new(50.0, 25.0, 20.0, 10.0);
        let norm = center.to_normalized(100, 50).unwrap();

        assert!((norm.x_center - 0.5).abs() < 1e-9);
        assert!((norm.y_center - 0.5).abs() < 1e-9);
        assert!((norm.width - 0.2).abs() < 1e-9);
        assert!((norm.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_flat_roundtrip() {
        let flat = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let polygon = Polygon::<Pixel>::from_flat(&flat);

        assert_eq!(polygon.len(), 3);
        assert_eq!(polygon.to_flat(), flat);

        let norm = to_normalized(&polygon, 10, 10).unwrap();
        assert_eq!(norm.points()[2], Point::new(0.5, 0.6));
        let pixels = to_pixels(&norm, 10, 10).unwrap();
        assert!((pixels.points()[1].y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_extent_collapses() {
        let bbox = Bbox::<Pixel>::new(5.0, 5.0, -2.0, 3.0);
        assert_eq!(bbox.width(), 0.0);
        assert!(bbox.is_degenerate());

        let flipped = Bbox::<Pixel>::from_corners(5.0, 5.0, 3.0, 8.0);
        assert_eq!(flipped.max_x(), 5.0);
        assert_eq!(flipped.height(), 3.0);
    }
}
