// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Format Support
//!
//! Reading and writing COCO JSON documents and converting them to and from
//! the canonical normalized annotations shared with the YOLO adapters.
//!
//! ## Scope
//!
//! - Bounding boxes
//! - Polygon segmentation (largest ring when reading)
//! - Detection results lists
//!
//! RLE segmentations are accepted on input and fall back to the bbox.
//! Keypoints, captions and panoptic segmentation are not supported.
//!
//! ## Example
//!
//! ```rust,no_run
//! use annoconv::{
//!     ConversionReport, FormatAdapter,
//!     coco::{CategoryConfig, CocoAdapter, CocoReader, CocoSource},
//! };
//!
//! let dataset = CocoReader::new().read_json("annotations/instances_val.json")?;
//! let adapter = CocoAdapter::new(CategoryConfig::new(["crack", "dent"]));
//! let mut report = ConversionReport::new();
//! let images = adapter.parse(CocoSource::new(&dataset, "instances_val.json"), &mut report)?;
//! println!("{} images, {}", images.len(), report);
//! # Ok::<(), annoconv::Error>(())
//! ```

mod adapter;
mod convert;
mod reader;
mod types;
mod writer;

pub use types::{
    CocoAnnotation, CocoCategory, CocoCompressedRle, CocoDataset, CocoImage, CocoIndex, CocoInfo,
    CocoLicense, CocoResult, CocoRle, CocoSegmentation,
};

pub use adapter::{CategoryConfig, CocoAdapter, CocoGeometry, CocoImageEntry, CocoSource};
pub use reader::CocoReader;
pub use writer::{CocoWriteOptions, CocoWriter};

pub use convert::{
    box_to_coco_bbox, coco_bbox_area, coco_bbox_to_box, coco_bbox_to_segmentation,
    coco_segmentation_to_polygon, polygon_to_coco_segmentation, whole_pixels,
};

#[cfg(test)]
mod tests;
