// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Covers the object detection and instance segmentation parts of the
//! format plus the detection results list. Keypoints, captions and panoptic
//! segmentation are not modelled.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level COCO dataset structure.
///
/// `images` is required; a document without it is rejected when parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub info: CocoInfo,
    #[serde(default)]
    pub licenses: Vec<CocoLicense>,
    pub images: Vec<CocoImage>,
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

/// License information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoLicense {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Image metadata.
///
/// Width and height are signed so that documents carrying zero or negative
/// sizes still parse and the offending image can be reported on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    /// Image width in pixels.
    pub width: i64,
    /// Image height in pixels.
    pub height: i64,
    /// Filename (relative path within the images folder).
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_captured: Option<String>,
}

/// Category definition. Ids are 1-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub supercategory: Option<String>,
}

/// Annotation for object detection and instance segmentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// Bounding box: `[x, y, width, height]` in pixels (top-left corner).
    pub bbox: [f64; 4],
    /// Area in pixels².
    #[serde(default)]
    pub area: f64,
    /// Whether this is a crowd annotation (0 = single instance, 1 = crowd).
    #[serde(default)]
    pub iscrowd: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<CocoSegmentation>,
}

/// Segmentation format: polygon array or RLE.
///
/// RLE masks are accepted on input so that crowd annotations do not reject
/// the whole document, but only polygon segmentations are converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CocoSegmentation {
    /// Polygon format: `[[x1,y1,x2,y2,...], [x3,y3,...]]`
    ///
    /// Multiple polygons represent disjoint regions of the same object.
    Polygon(Vec<Vec<f64>>),
    /// Uncompressed RLE format with counts array.
    Rle(CocoRle),
    /// Compressed RLE format with LEB128-encoded counts string.
    CompressedRle(CocoCompressedRle),
}

/// Uncompressed RLE (Run-Length Encoding) segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoRle {
    pub counts: Vec<u32>,
    /// Image size as `[height, width]` (NOT `[width, height]`!)
    pub size: [u32; 2],
}

/// Compressed RLE segmentation (LEB128 encoded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCompressedRle {
    pub counts: String,
    /// Image size as `[height, width]`.
    pub size: [u32; 2],
}

/// One entry of a COCO detection results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoResult {
    pub image_id: u64,
    pub category_id: u32,
    pub bbox: [f64; 4],
    pub score: f64,
}

/// Lookup tables over a borrowed `CocoDataset`, built once per document.
#[derive(Debug, Clone)]
pub struct CocoIndex<'a> {
    /// `image_id` → `CocoImage`
    pub images: HashMap<u64, &'a CocoImage>,
    /// `image_id` → annotations with their 1-based position in the document
    pub annotations_by_image: HashMap<u64, Vec<(usize, &'a CocoAnnotation)>>,
}

impl<'a> CocoIndex<'a> {
    pub fn from_dataset(dataset: &'a CocoDataset) -> Self {
        let images: HashMap<_, _> = dataset.images.iter().map(|img| (img.id, img)).collect();

        let mut annotations_by_image: HashMap<u64, Vec<(usize, &CocoAnnotation)>> =
            HashMap::new();
        for (idx, ann) in dataset.annotations.iter().enumerate() {
            annotations_by_image
                .entry(ann.image_id)
                .or_default()
                .push((idx + 1, ann));
        }

        Self {
            images,
            annotations_by_image,
        }
    }

    /// Get annotations for an image.
    pub fn annotations_for_image(&self, image_id: u64) -> &[(usize, &'a CocoAnnotation)] {
        self.annotations_by_image
            .get(&image_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Annotations whose `image_id` matches no image, in document order.
    pub fn orphans(&self) -> Vec<(usize, &'a CocoAnnotation)> {
        let mut orphans: Vec<_> = self
            .annotations_by_image
            .iter()
            .filter(|(image_id, _)| !self.images.contains_key(image_id))
            .flat_map(|(_, anns)| anns.iter().copied())
            .collect();
        orphans.sort_by_key(|(pos, _)| *pos);
        orphans
    }
}
