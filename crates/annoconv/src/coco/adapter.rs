// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO document adapter.
//!
//! COCO category ids are 1-based while canonical class ids are 0-based; the
//! offset is applied here and nowhere else.

use super::{
    convert::{
        box_to_coco_bbox, coco_bbox_area, coco_bbox_to_box, coco_bbox_to_segmentation,
        coco_segmentation_to_polygon, polygon_to_coco_segmentation,
    },
    types::{
        CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoIndex, CocoInfo, CocoResult,
        CocoSegmentation,
    },
};
use crate::{
    Annotation, ConversionReport, Error, Geometry, ImageRecord, LabeledImage,
    format::{FormatAdapter, IdSequence},
};
use chrono::{Datelike as _, Local};
use serde::{Deserialize, Serialize};

/// Ordered category names; the name at position `i` is canonical class `i`
/// and COCO category `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub categories: Vec<String>,
    pub supercategory: Option<String>,
}

impl CategoryConfig {
    pub fn new<S: Into<String>>(categories: impl IntoIterator<Item = S>) -> Self {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            supercategory: None,
        }
    }

    pub fn with_supercategory(mut self, supercategory: impl Into<String>) -> Self {
        self.supercategory = Some(supercategory.into());
        self
    }

    /// COCO category list with 1-based ids in configuration order.
    pub fn to_coco(&self) -> Vec<CocoCategory> {
        self.categories
            .iter()
            .enumerate()
            .map(|(idx, name)| CocoCategory {
                id: idx as u32 + 1,
                name: name.clone(),
                supercategory: self.supercategory.clone(),
            })
            .collect()
    }
}

/// Which COCO field provides the geometry when reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CocoGeometry {
    /// Always use `bbox`.
    #[default]
    Bbox,
    /// Use the largest polygon of `segmentation`, falling back to `bbox`.
    Segmentation,
}

/// One COCO document and the name used when reporting problems in it.
#[derive(Debug, Clone, Copy)]
pub struct CocoSource<'a> {
    pub dataset: &'a CocoDataset,
    pub context: &'a str,
}

impl<'a> CocoSource<'a> {
    pub fn new(dataset: &'a CocoDataset, context: &'a str) -> Self {
        Self { dataset, context }
    }
}

/// The COCO fragment produced for one image.
#[derive(Debug, Clone)]
pub struct CocoImageEntry {
    pub image: CocoImage,
    pub annotations: Vec<CocoAnnotation>,
}

/// Adapter between COCO documents and labeled images.
///
/// Annotation ids handed out by [`FormatAdapter::serialize`] come from a
/// counter starting at 1, so one adapter should serialize one output
/// document.
#[derive(Debug)]
pub struct CocoAdapter {
    categories: CategoryConfig,
    geometry: CocoGeometry,
    box_to_segmentation: bool,
    annotation_ids: IdSequence,
}

impl CocoAdapter {
    pub fn new(categories: CategoryConfig) -> Self {
        Self {
            categories,
            geometry: CocoGeometry::default(),
            box_to_segmentation: false,
            annotation_ids: IdSequence::starting_at(1),
        }
    }

    pub fn with_geometry(mut self, geometry: CocoGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Emit a rectangle segmentation for box annotations instead of `[]`.
    pub fn with_box_to_segmentation(mut self, enabled: bool) -> Self {
        self.box_to_segmentation = enabled;
        self
    }

    pub fn categories(&self) -> &CategoryConfig {
        &self.categories
    }

    /// Assemble serialized image entries into a complete document.
    pub fn finish(&self, entries: Vec<CocoImageEntry>) -> CocoDataset {
        let now = Local::now();
        let mut dataset = CocoDataset {
            info: CocoInfo {
                year: Some(now.year() as u32),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
                description: Some("Converted with annoconv".to_string()),
                date_created: Some(now.format("%Y/%m/%d").to_string()),
                ..Default::default()
            },
            categories: self.categories.to_coco(),
            ..Default::default()
        };

        for entry in entries {
            dataset.images.push(entry.image);
            dataset.annotations.extend(entry.annotations);
        }

        dataset
    }

    /// Detection results for one image. Every annotation must carry a
    /// confidence; those without one are reported and skipped.
    pub fn results(
        &self,
        image: &ImageRecord,
        annotations: &[Annotation],
        report: &mut ConversionReport,
    ) -> Result<Vec<CocoResult>, Error> {
        let mut results = Vec::with_capacity(annotations.len());

        for annotation in annotations {
            let Some(score) = annotation.confidence else {
                report.warn(
                    image.file_name(),
                    Error::MalformedAnnotationLine {
                        line: annotation.id as usize,
                        reason: "missing confidence score".to_string(),
                    },
                );
                continue;
            };

            let bbox = match annotation.geometry.bbox() {
                Ok(bbox) => bbox,
                Err(err) => {
                    report.warn(image.file_name(), err);
                    continue;
                }
            };

            results.push(CocoResult {
                image_id: image.id(),
                category_id: annotation.category_id + 1,
                bbox: box_to_coco_bbox(&bbox, image.width(), image.height())?,
                score,
            });
            report.annotations += 1;
        }

        Ok(results)
    }

    fn read_annotation(
        &self,
        position: usize,
        ann: &CocoAnnotation,
        image: &ImageRecord,
    ) -> Result<Annotation, Error> {
        let category_id = ann
            .category_id
            .checked_sub(1)
            .ok_or_else(|| Error::MalformedAnnotationLine {
                line: position,
                reason: format!("annotation {} has category_id 0", ann.id),
            })?;

        let polygon = match (self.geometry, &ann.segmentation) {
            (CocoGeometry::Segmentation, Some(seg)) => {
                coco_segmentation_to_polygon(seg, image.width(), image.height())?
            }
            _ => None,
        };

        let geometry = match polygon {
            Some(polygon) => Geometry::Polygon(polygon),
            None => Geometry::Box(coco_bbox_to_box(&ann.bbox, image.width(), image.height())?),
        };

        Ok(Annotation::new(ann.id, image.id(), category_id, geometry))
    }
}

impl FormatAdapter for CocoAdapter {
    type Source<'a> = CocoSource<'a>;
    type Encoded = CocoImageEntry;

    fn parse(
        &self,
        source: CocoSource<'_>,
        report: &mut ConversionReport,
    ) -> Result<Vec<LabeledImage>, Error> {
        let index = CocoIndex::from_dataset(source.dataset);

        for (_, orphan) in index.orphans() {
            report.warn(
                source.context,
                Error::OrphanedAnnotation {
                    annotation_id: orphan.id,
                    image_id: orphan.image_id,
                },
            );
        }

        let mut labeled = Vec::with_capacity(source.dataset.images.len());

        for coco_image in &source.dataset.images {
            let context = format!("{} ({})", source.context, coco_image.file_name);
            let image = match ImageRecord::new(
                coco_image.id,
                coco_image.file_name.as_str(),
                coco_image.width,
                coco_image.height,
            ) {
                Ok(image) => image,
                Err(err) => {
                    report.warn(context, err);
                    continue;
                }
            };

            let mut annotations = Vec::new();
            for (position, ann) in index.annotations_for_image(image.id()) {
                match self.read_annotation(*position, ann, &image) {
                    Ok(annotation) => annotations.push(annotation),
                    Err(err) => report.warn(context.as_str(), err),
                }
            }

            labeled.push(LabeledImage::new(image, annotations));
        }

        Ok(labeled)
    }

    fn serialize(
        &self,
        image: &ImageRecord,
        annotations: &[Annotation],
        report: &mut ConversionReport,
    ) -> Result<CocoImageEntry, Error> {
        let (width, height) = (image.width(), image.height());
        let mut entries = Vec::with_capacity(annotations.len());

        for annotation in annotations {
            let bbox = match annotation.geometry.bbox() {
                Ok(bbox) => bbox,
                Err(err) => {
                    report.warn(image.file_name(), err);
                    continue;
                }
            };
            let bbox = box_to_coco_bbox(&bbox, width, height)?;

            let (segmentation, area) = match &annotation.geometry {
                Geometry::Polygon(polygon) => polygon_to_coco_segmentation(polygon, width, height)?,
                Geometry::Box(_) if self.box_to_segmentation => {
                    (coco_bbox_to_segmentation(&bbox), coco_bbox_area(&bbox))
                }
                Geometry::Box(_) => (CocoSegmentation::Polygon(vec![]), coco_bbox_area(&bbox)),
            };

            entries.push(CocoAnnotation {
                id: self.annotation_ids.next_id(),
                image_id: image.id(),
                category_id: annotation.category_id + 1,
                bbox,
                area,
                iscrowd: 0,
                segmentation: Some(segmentation),
            });
            report.annotations += 1;
        }

        Ok(CocoImageEntry {
            image: CocoImage {
                id: image.id(),
                width: width as i64,
                height: height as i64,
                file_name: image.file_name().to_string(),
                ..Default::default()
            },
            annotations: entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        format::FormatAdapter as _,
        geometry::{Bbox, Normalized, Polygon},
        yolo::{YoloBoxAdapter, YoloSource},
    };

    fn categories() -> CategoryConfig {
        CategoryConfig::new(["crack", "dent", "scratch", "stain"]).with_supercategory("Defect")
    }

    fn document(annotations: Vec<CocoAnnotation>) -> CocoDataset {
        CocoDataset {
            images: vec![CocoImage {
                id: 4,
                width: 100,
                height: 50,
                file_name: "part_004.jpg".to_string(),
                ..Default::default()
            }],
            annotations,
            categories: categories().to_coco(),
            ..Default::default()
        }
    }

    fn coco_box(id: u64, image_id: u64, category_id: u32, bbox: [f64; 4]) -> CocoAnnotation {
        CocoAnnotation {
            id,
            image_id,
            category_id,
            bbox,
            ..Default::default()
        }
    }

    #[test]
    fn test_coco_to_yolo_line() {
        let dataset = document(vec![coco_box(1, 4, 1, [10.0, 10.0, 20.0, 10.0])]);
        let mut report = ConversionReport::new();

        let labeled = CocoAdapter::new(categories())
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].annotations[0].category_id, 0);

        let text = YoloBoxAdapter::new()
            .serialize(&labeled[0].image, &labeled[0].annotations, &mut report)
            .unwrap();
        assert_eq!(text, "0 0.200000 0.300000 0.200000 0.200000\n");
        assert!(report.is_clean());
    }

    #[test]
    fn test_category_offset_round_trip() {
        let image = ImageRecord::new(0, "a.jpg", 200, 100).unwrap();
        let mut report = ConversionReport::new();

        let yolo = YoloBoxAdapter::new()
            .parse(
                YoloSource::new(&image, "2 0.5 0.5 0.2 0.2\n"),
                &mut report,
            )
            .unwrap();

        let adapter = CocoAdapter::new(categories());
        let entry = adapter
            .serialize(&image, &yolo[0].annotations, &mut report)
            .unwrap();
        assert_eq!(entry.annotations[0].category_id, 3);

        let dataset = adapter.finish(vec![entry]);
        let back = CocoAdapter::new(categories())
            .parse(CocoSource::new(&dataset, "out.json"), &mut report)
            .unwrap();
        assert_eq!(back[0].annotations[0].category_id, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_orphans_counted() {
        let dataset = document(vec![
            coco_box(1, 4, 1, [10.0, 10.0, 20.0, 10.0]),
            coco_box(2, 99, 1, [10.0, 10.0, 20.0, 10.0]),
        ]);
        let mut report = ConversionReport::new();

        let labeled = CocoAdapter::new(categories())
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();

        assert_eq!(labeled[0].annotations.len(), 1);
        assert_eq!(report.orphaned, 1);
        assert!(matches!(
            report.warnings[0].error,
            Error::OrphanedAnnotation {
                annotation_id: 2,
                image_id: 99
            }
        ));
    }

    #[test]
    fn test_invalid_dimensions_skip_image() {
        let mut dataset = document(vec![coco_box(1, 4, 1, [1.0, 1.0, 2.0, 2.0])]);
        dataset.images.push(CocoImage {
            id: 5,
            width: 0,
            height: 480,
            file_name: "broken.jpg".to_string(),
            ..Default::default()
        });
        dataset.annotations.push(coco_box(2, 5, 1, [1.0, 1.0, 2.0, 2.0]));
        let mut report = ConversionReport::new();

        let labeled = CocoAdapter::new(categories())
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();

        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].image.file_name(), "part_004.jpg");
        assert_eq!(report.skipped_images, 1);
        assert_eq!(report.orphaned, 0);
        assert!(matches!(
            report.warnings[0].error,
            Error::InvalidDimension {
                width: 0,
                height: 480
            }
        ));
    }

    #[test]
    fn test_category_zero_reported() {
        let dataset = document(vec![
            coco_box(1, 4, 0, [10.0, 10.0, 20.0, 10.0]),
            coco_box(2, 4, 2, [10.0, 10.0, 20.0, 10.0]),
        ]);
        let mut report = ConversionReport::new();

        let labeled = CocoAdapter::new(categories())
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();

        assert_eq!(labeled[0].annotations.len(), 1);
        assert_eq!(labeled[0].annotations[0].category_id, 1);
        assert_eq!(report.malformed, 1);
        assert!(matches!(
            report.warnings[0].error,
            Error::MalformedAnnotationLine { line: 1, .. }
        ));
    }

    #[test]
    fn test_segmentation_geometry() {
        let mut ann = coco_box(1, 4, 1, [0.0, 0.0, 50.0, 25.0]);
        ann.segmentation = Some(CocoSegmentation::Polygon(vec![vec![
            0.0, 0.0, 50.0, 0.0, 25.0, 25.0,
        ]]));
        let dataset = document(vec![ann, coco_box(2, 4, 1, [0.0, 0.0, 10.0, 10.0])]);
        let mut report = ConversionReport::new();

        let labeled = CocoAdapter::new(categories())
            .with_geometry(CocoGeometry::Segmentation)
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();

        let anns = &labeled[0].annotations;
        assert!(anns[0].geometry.is_polygon());
        assert_eq!(anns[0].geometry.polygon().len(), 3);
        // No segmentation falls back to the box.
        assert!(!anns[1].geometry.is_polygon());
    }

    #[test]
    fn test_box_to_segmentation() {
        let image = ImageRecord::new(0, "a.jpg", 100, 100).unwrap();
        let annotations = vec![Annotation::new(
            1,
            0,
            0,
            Geometry::Box(Bbox::<Normalized>::new(0.1, 0.2, 0.3, 0.4)),
        )];
        let mut report = ConversionReport::new();

        let plain = CocoAdapter::new(categories())
            .serialize(&image, &annotations, &mut report)
            .unwrap();
        assert_eq!(
            plain.annotations[0].segmentation,
            Some(CocoSegmentation::Polygon(vec![]))
        );
        assert_eq!(plain.annotations[0].bbox, [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(plain.annotations[0].area, 1200.0);

        let synthesized = CocoAdapter::new(categories())
            .with_box_to_segmentation(true)
            .serialize(&image, &annotations, &mut report)
            .unwrap();
        assert_eq!(
            synthesized.annotations[0].segmentation,
            Some(CocoSegmentation::Polygon(vec![vec![
                10.0, 20.0, 40.0, 20.0, 40.0, 60.0, 10.0, 60.0
            ]]))
        );
    }

    #[test]
    fn test_polygon_serialized_with_area() {
        let image = ImageRecord::new(3, "a.jpg", 100, 100).unwrap();
        let polygon = Polygon::<Normalized>::from_flat(&[0.0, 0.0, 0.5, 0.0, 0.5, 0.5]);
        let annotations = vec![Annotation::new(1, 3, 1, Geometry::Polygon(polygon))];
        let mut report = ConversionReport::new();

        let entry = CocoAdapter::new(categories())
            .serialize(&image, &annotations, &mut report)
            .unwrap();
        let ann = &entry.annotations[0];

        assert_eq!(ann.image_id, 3);
        assert_eq!(ann.category_id, 2);
        assert_eq!(ann.bbox, [0.0, 0.0, 50.0, 50.0]);
        assert_eq!(ann.area, 1250.0);
    }

    #[test]
    fn test_annotation_ids_sequential() {
        let image = ImageRecord::new(0, "a.jpg", 10, 10).unwrap();
        let geometry = Geometry::Box(Bbox::<Normalized>::new(0.0, 0.0, 0.5, 0.5));
        let annotations = vec![
            Annotation::new(7, 0, 0, geometry.clone()),
            Annotation::new(9, 0, 1, geometry),
        ];
        let mut report = ConversionReport::new();
        let adapter = CocoAdapter::new(categories());

        let first = adapter.serialize(&image, &annotations, &mut report).unwrap();
        let second = adapter.serialize(&image, &annotations, &mut report).unwrap();

        let ids: Vec<u64> = first
            .annotations
            .iter()
            .chain(&second.annotations)
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_finish_document() {
        let adapter = CocoAdapter::new(categories());
        let dataset = adapter.finish(vec![]);

        assert_eq!(dataset.categories.len(), 4);
        assert_eq!(dataset.categories[0].id, 1);
        assert_eq!(dataset.categories[3].name, "stain");
        assert_eq!(dataset.categories[3].supercategory.as_deref(), Some("Defect"));
        assert!(dataset.info.date_created.is_some());
    }

    #[test]
    fn test_results_need_confidence() {
        let image = ImageRecord::new(2, "a.jpg", 100, 100).unwrap();
        let geometry = Geometry::Box(Bbox::<Normalized>::new(0.1, 0.1, 0.2, 0.2));
        let annotations = vec![
            Annotation::new(1, 2, 0, geometry.clone()).with_confidence(0.75),
            Annotation::new(2, 2, 1, geometry),
        ];
        let mut report = ConversionReport::new();

        let results = CocoAdapter::new(categories())
            .results(&image, &annotations, &mut report)
            .unwrap();

        assert_eq!(
            results,
            vec![CocoResult {
                image_id: 2,
                category_id: 1,
                bbox: [10.0, 10.0, 20.0, 20.0],
                score: 0.75,
            }]
        );
        assert_eq!(report.malformed, 1);
    }
}
