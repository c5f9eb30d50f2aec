// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Round-trip tests across the COCO reader, adapter and writer.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::{
        ConversionReport, FormatAdapter,
        yolo::{YoloBoxAdapter, YoloPolygonAdapter, YoloSource},
    };
    use tempfile::TempDir;

    fn categories() -> CategoryConfig {
        CategoryConfig::new(["crack", "dent"]).with_supercategory("Defect")
    }

    /// COCO JSON → YOLO box text → COCO JSON keeps images, categories and
    /// whole-pixel boxes.
    #[test]
    fn test_coco_yolo_coco_roundtrip() {
        let temp_dir = TempDir::new().unwrap();

        let original = CocoDataset {
            images: vec![
                CocoImage {
                    id: 0,
                    width: 640,
                    height: 480,
                    file_name: "image_000.jpg".to_string(),
                    ..Default::default()
                },
                CocoImage {
                    id: 1,
                    width: 800,
                    height: 600,
                    file_name: "image_001.jpg".to_string(),
                    ..Default::default()
                },
            ],
            annotations: vec![
                CocoAnnotation {
                    id: 1,
                    image_id: 0,
                    category_id: 1,
                    bbox: [100.0, 50.0, 200.0, 300.0],
                    ..Default::default()
                },
                CocoAnnotation {
                    id: 2,
                    image_id: 0,
                    category_id: 2,
                    bbox: [320.0, 240.0, 64.0, 48.0],
                    ..Default::default()
                },
                CocoAnnotation {
                    id: 3,
                    image_id: 1,
                    category_id: 2,
                    bbox: [0.0, 0.0, 400.0, 300.0],
                    ..Default::default()
                },
            ],
            categories: categories().to_coco(),
            ..Default::default()
        };

        let input = temp_dir.path().join("instances.json");
        CocoWriter::new().write_json(&original, &input).unwrap();

        let dataset = CocoReader::new().read_json(&input).unwrap();
        let mut report = ConversionReport::new();
        let labeled = CocoAdapter::new(categories())
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();

        let yolo = YoloBoxAdapter::new();
        let writer = CocoAdapter::new(categories());
        let mut entries = Vec::new();

        for image in &labeled {
            let text = yolo
                .serialize(&image.image, &image.annotations, &mut report)
                .unwrap();
            let parsed = yolo
                .parse(YoloSource::new(&image.image, &text), &mut report)
                .unwrap();
            entries.push(
                writer
                    .serialize(&image.image, &parsed[0].annotations, &mut report)
                    .unwrap(),
            );
        }

        let output = temp_dir.path().join("restored.json");
        CocoWriter::new()
            .write_json(&writer.finish(entries), &output)
            .unwrap();
        let restored = CocoReader::new().read_json(&output).unwrap();

        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(restored.images.len(), 2);
        assert_eq!(restored.annotations.len(), 3);
        assert_eq!(restored.categories.len(), 2);

        for (before, after) in original.annotations.iter().zip(&restored.annotations) {
            assert_eq!(before.category_id, after.category_id);
            assert_eq!(before.image_id, after.image_id);
            for (a, b) in before.bbox.iter().zip(after.bbox.iter()) {
                assert!((a - b).abs() <= 1.0, "{:?} vs {:?}", before.bbox, after.bbox);
            }
        }
    }

    /// Polygon segmentations survive COCO → YOLO polygon text → COCO.
    #[test]
    fn test_segmentation_to_yolo_polygon() {
        let dataset = CocoDataset {
            images: vec![CocoImage {
                id: 0,
                width: 200,
                height: 100,
                file_name: "mask.png".to_string(),
                ..Default::default()
            }],
            annotations: vec![CocoAnnotation {
                id: 1,
                image_id: 0,
                category_id: 1,
                bbox: [20.0, 10.0, 100.0, 50.0],
                segmentation: Some(CocoSegmentation::Polygon(vec![vec![
                    20.0, 10.0, 120.0, 10.0, 120.0, 60.0, 20.0, 60.0,
                ]])),
                ..Default::default()
            }],
            categories: categories().to_coco(),
            ..Default::default()
        };

        let mut report = ConversionReport::new();
        let labeled = CocoAdapter::new(categories())
            .with_geometry(CocoGeometry::Segmentation)
            .parse(CocoSource::new(&dataset, "instances.json"), &mut report)
            .unwrap();

        let text = YoloPolygonAdapter::new()
            .serialize(&labeled[0].image, &labeled[0].annotations, &mut report)
            .unwrap();
        assert_eq!(
            text,
            "0 0.100000 0.100000 0.600000 0.100000 0.600000 0.600000 0.100000 0.600000\n"
        );
    }
}
