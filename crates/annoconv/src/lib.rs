// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Annotation Conversion Library
//!
//! Converts object annotations between COCO JSON, YOLO box text and YOLO
//! polygon text, and extracts YOLO polygons from color-coded segmentation
//! masks.
//!
//! Every format is read into the same canonical model: an [`ImageRecord`]
//! with validated pixel dimensions and [`Annotation`]s holding normalized
//! (0-1) [`Geometry`] and 0-based class ids. A [`FormatAdapter`] parses its
//! source into [`LabeledImage`]s and serializes one image's annotations
//! back, so any two formats convert through this model.
//!
//! ## Features
//!
//! - **Geometry**: unit-tagged points, boxes and polygons with explicit
//!   normalization, center/corner box conversion and box ↔ polygon
//!   derivation
//! - **Adapters**: COCO, YOLO box and YOLO polygon
//! - **Contours**: per-color external contours from RGB masks
//! - **Batch conversion**: parallel directory conversion with progress,
//!   cancellation and atomic output files
//! - **Reporting**: per-line and per-image problems are collected in a
//!   [`ConversionReport`] instead of aborting the batch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use annoconv::{BatchControl, ConversionConfig, Error, YoloToCocoOptions, yolo_to_coco};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Error> {
//!     let config = ConversionConfig::load(None)?;
//!     let report = yolo_to_coco(
//!         Path::new("dataset/images"),
//!         Path::new("dataset/instances.json"),
//!         YoloToCocoOptions::default(),
//!         &config,
//!         &BatchControl::new(),
//!     )?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans around each converted file

mod annotation;
mod batch;
pub mod coco;
mod config;
pub mod contour;
mod error;
mod format;
pub mod geometry;
mod io;
mod report;
pub mod shapes;
mod source;
pub mod yolo;

pub use crate::{
    annotation::{Annotation, Geometry, ImageRecord, LabeledImage},
    batch::{
        BatchControl, ImageSizing, Progress, YoloToCocoOptions, coco_to_yolo, mask_colors,
        masks_to_polygons, polygons_to_boxes, yolo_to_coco,
    },
    config::{
        CONFIG_FILE_NAME, ColorEntry, ConversionConfig, DEFAULT_IMAGE_SIZE, DEFAULT_MIN_EDGE_PX,
        ENV_PREFIX, default_config_path,
    },
    error::Error,
    format::{FormatAdapter, IdSequence, YoloFormat},
    io::{write_atomic, write_text},
    report::{ConversionReport, Warning},
    source::{
        FileIndex, IMAGE_EXTENSIONS, YOLO_SUBDIR, discover_files, discover_images, label_path,
        probe_dimensions, read_label,
    },
};
