// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Format-independent image and annotation records.
//!
//! Category ids are always canonical 0-based class ids here; the COCO
//! adapter shifts them by one at its boundary. Geometry is held in
//! normalized units, pixel values are derived from the owning
//! [`ImageRecord`].

use crate::{
    Error,
    geometry::{Bbox, Normalized, Polygon},
    shapes::{box_to_polygon, polygon_to_box},
};

/// One image: identifier, file name and pixel dimensions.
///
/// Dimensions are validated on construction and the record cannot be
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    id: u64,
    file_name: String,
    width: u32,
    height: u32,
}

impl ImageRecord {
    /// Create a record, rejecting non-positive or oversized dimensions with
    /// [`Error::InvalidDimension`].
    pub fn new(id: u64, file_name: impl Into<String>, width: i64, height: i64) -> Result<Self, Error> {
        let valid = |v: i64| v > 0 && v <= u32::MAX as i64;
        if !valid(width) || !valid(height) {
            return Err(Error::InvalidDimension { width, height });
        }

        Ok(Self {
            id,
            file_name: file_name.into(),
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// File name without its extension, used to name per-image label files.
    pub fn stem(&self) -> &str {
        std::path::Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }
}

/// Annotation geometry in normalized units.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Box(Bbox<Normalized>),
    Polygon(Polygon<Normalized>),
}

impl Geometry {
    /// Bounding box of the geometry; polygons are reduced with
    /// [`polygon_to_box`].
    pub fn bbox(&self) -> Result<Bbox<Normalized>, Error> {
        match self {
            Geometry::Box(bbox) => Ok(*bbox),
            Geometry::Polygon(polygon) => polygon_to_box(polygon),
        }
    }

    /// Polygon form of the geometry; boxes become their 4-corner rectangle.
    pub fn polygon(&self) -> Polygon<Normalized> {
        match self {
            Geometry::Box(bbox) => box_to_polygon(bbox),
            Geometry::Polygon(polygon) => polygon.clone(),
        }
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, Geometry::Polygon(_))
    }
}

/// A single object instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// COCO annotation id, or the 1-based line number for YOLO input.
    pub id: u64,
    /// Id of the [`ImageRecord`] this object belongs to.
    pub image_id: u64,
    /// Canonical 0-based class id.
    pub category_id: u32,
    pub geometry: Geometry,
    /// Detection score in `[0, 1]`, present for YOLO result files.
    pub confidence: Option<f64>,
}

impl Annotation {
    pub fn new(id: u64, image_id: u64, category_id: u32, geometry: Geometry) -> Self {
        Self {
            id,
            image_id,
            category_id,
            geometry,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// An image together with the annotations that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub image: ImageRecord,
    pub annotations: Vec<Annotation>,
}

impl LabeledImage {
    pub fn new(image: ImageRecord, annotations: Vec<Annotation>) -> Self {
        Self { image, annotations }
    }
}
