// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Directory-level conversions.
//!
//! Each driver discovers its inputs, converts them in parallel with
//! `rayon` and writes every output file atomically. Problems confined to a
//! line, annotation or image are collected in the returned
//! [`ConversionReport`]; a file whose conversion fails is recorded and the
//! batch moves on to the next one. Only problems with the batch as a whole,
//! such as a missing input directory, are returned as errors.

use crate::{
    Annotation, ConversionReport, Error, Geometry, ImageRecord, LabeledImage,
    coco::{CocoAdapter, CocoReader, CocoSource, CocoWriteOptions, CocoWriter},
    config::ConversionConfig,
    contour::{ColorClassMap, color_histogram, extract_contours},
    format::{FormatAdapter, YoloFormat},
    geometry::Normalize,
    io::write_text,
    shapes::MinimumSize,
    source::{FileIndex, discover_files, discover_images, label_path, probe_dimensions, read_label},
    yolo::{ParsePolicy, YoloAdapter, YoloBoxAdapter, YoloPolygonAdapter, YoloSource},
};
use image::Rgb;
use log::{debug, warn};
use rayon::prelude::*;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::Sender,
    },
};

/// Progress information for long-running conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}

/// Progress reporting and cancellation for a batch.
///
/// The cancel flag is checked before each file is started; files already
/// being converted finish normally.
#[derive(Debug, Clone, Default)]
pub struct BatchControl<'a> {
    progress: Option<Sender<Progress>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> BatchControl<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: Sender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn send(&self, current: usize, total: usize) {
        if let Some(p) = &self.progress {
            let _ = p.send(Progress { current, total });
        }
    }
}

/// Run `convert` over `items` in parallel. Outputs and per-item reports
/// come back in input order.
fn run_parallel<T, R, F>(
    items: &[T],
    control: &BatchControl<'_>,
    convert: F,
) -> (Vec<Option<R>>, ConversionReport)
where
    T: Sync,
    R: Send,
    F: Fn(&T, &mut ConversionReport) -> Option<R> + Sync,
{
    let total = items.len();
    let done = AtomicUsize::new(0);
    control.send(0, total);

    let outcomes: Vec<(Option<R>, ConversionReport)> = items
        .par_iter()
        .map(|item| {
            let mut report = ConversionReport::new();
            if control.is_cancelled() {
                report.cancelled = true;
                return (None, report);
            }

            let output = convert(item, &mut report);
            let current = done.fetch_add(1, Ordering::SeqCst) + 1;
            control.send(current, total);
            (output, report)
        })
        .collect();

    let mut merged = ConversionReport::new();
    let outputs = outcomes
        .into_iter()
        .map(|(output, report)| {
            merged.merge(report);
            output
        })
        .collect();

    (outputs, merged)
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_name(path))
}

/// Write one label file per COCO image.
///
/// `input` is a COCO JSON file or a directory searched for `.json` files.
/// Each image must exist below `images_dir` under its `file_name`; labels
/// are written as `<output_dir>/<stem>.txt`.
pub fn coco_to_yolo(
    input: &Path,
    images_dir: &Path,
    output_dir: &Path,
    format: YoloFormat,
    config: &ConversionConfig,
    control: &BatchControl<'_>,
) -> Result<ConversionReport, Error> {
    let documents = discover_files(input, "json")?;
    let coco = CocoAdapter::new(config.category_config()).with_geometry(config.coco_geometry);
    let yolo = YoloAdapter::new(format, config.parse_policy(), config.minimum_size());
    let reader = CocoReader::new();
    let mut report = ConversionReport::new();

    for document in &documents {
        if control.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let context = display_name(document);
        let labeled = match reader
            .read_json(document)
            .and_then(|dataset| coco.parse(CocoSource::new(&dataset, &context), &mut report))
        {
            Ok(labeled) => labeled,
            Err(err) => {
                report.fail(context, err);
                continue;
            }
        };
        debug!("{}: {} images", context, labeled.len());

        let (_, written) = run_parallel(&labeled, control, |image, report| {
            write_yolo_labels(image, images_dir, output_dir, &yolo, report);
            None::<()>
        });
        report.merge(written);
    }

    Ok(report)
}

#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(image = %labeled.image.file_name())))]
fn write_yolo_labels(
    labeled: &LabeledImage,
    images_dir: &Path,
    output_dir: &Path,
    yolo: &YoloAdapter,
    report: &mut ConversionReport,
) {
    let image = &labeled.image;
    let image_path = images_dir.join(image.file_name());
    if !image_path.is_file() {
        report.warn(image.file_name(), Error::MissingSourceFile(image_path));
        return;
    }

    let target = output_dir.join(format!("{}.txt", image.stem()));
    match yolo
        .serialize(image, &labeled.annotations, report)
        .and_then(|text| write_text(&target, &text))
    {
        Ok(()) => report.images += 1,
        Err(err) => report.fail(display_name(&target), err),
    }
}

/// Options for [`yolo_to_coco`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YoloToCocoOptions {
    /// Flavour of the label files.
    pub format: YoloFormat,
    /// Write a detection results list instead of a dataset document.
    pub results: bool,
}

/// Build one COCO document from images and their YOLO labels.
///
/// `input` is an image directory or a list file (see
/// [`discover_images`]). Image ids follow the sorted input order starting
/// at 0 and annotation ids start at 1. Images without a label file are
/// included without annotations. The document is not written when the
/// batch is cancelled.
pub fn yolo_to_coco(
    input: &Path,
    output: &Path,
    options: YoloToCocoOptions,
    config: &ConversionConfig,
    control: &BatchControl<'_>,
) -> Result<ConversionReport, Error> {
    let numbered: Vec<(u64, PathBuf)> = discover_images(input)?
        .into_iter()
        .enumerate()
        .map(|(id, path)| (id as u64, path))
        .collect();

    let yolo = YoloAdapter::new(options.format, config.parse_policy(), MinimumSize::default());
    let (labeled, mut report) = run_parallel(&numbered, control, |(id, path), report| {
        read_yolo_image(*id, path, &yolo, config.yolo_subdir, report)
    });

    if report.cancelled {
        warn!("conversion cancelled, {} not written", output.display());
        return Ok(report);
    }

    let coco = CocoAdapter::new(config.category_config())
        .with_box_to_segmentation(config.box_to_segmentation);
    let writer = CocoWriter::with_options(CocoWriteOptions {
        pretty: config.pretty,
    });

    if options.results {
        let mut results = Vec::new();
        for image in labeled.iter().flatten() {
            results.extend(coco.results(&image.image, &image.annotations, &mut report)?);
            report.images += 1;
        }
        writer.write_results(&results, output)?;
    } else {
        let mut entries = Vec::with_capacity(labeled.len());
        for image in labeled.iter().flatten() {
            entries.push(coco.serialize(&image.image, &image.annotations, &mut report)?);
            report.images += 1;
        }
        writer.write_json(&coco.finish(entries), output)?;
    }

    Ok(report)
}

#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(image = %path.display())))]
fn read_yolo_image(
    id: u64,
    path: &Path,
    yolo: &YoloAdapter,
    yolo_subdir: bool,
    report: &mut ConversionReport,
) -> Option<LabeledImage> {
    let image = match probe_dimensions(path)
        .and_then(|(w, h)| ImageRecord::new(id, file_name(path), w as i64, h as i64))
    {
        Ok(image) => image,
        Err(err) => {
            report.warn(display_name(path), err);
            return None;
        }
    };

    let label = label_path(path, yolo_subdir);
    let context = display_name(&label);
    let text = match read_label(&label) {
        Ok(text) => text,
        Err(Error::MissingLabelFile(_)) => {
            debug!("{}: no label file, image has no annotations", context);
            String::new()
        }
        Err(err) => {
            report.fail(context, err);
            return None;
        }
    };

    match yolo.parse(YoloSource::new(&image, &text).with_context(&context), report) {
        Ok(mut parsed) => parsed.pop(),
        Err(err) => {
            report.fail(context, err);
            None
        }
    }
}

/// How polygon files learn the size of the image they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSizing {
    /// Every file describes an image of this size.
    Fixed { width: u32, height: u32 },
    /// Probe the image with the same stem below this directory.
    Probe(PathBuf),
}

/// Convert YOLO polygon label files to YOLO box label files.
///
/// `input` is a label file or a directory searched for `.txt` files;
/// outputs keep their file name under `output_dir`. Boxes failing
/// `min_size` are dropped.
pub fn polygons_to_boxes(
    input: &Path,
    output_dir: &Path,
    sizing: &ImageSizing,
    min_size: MinimumSize,
    policy: ParsePolicy,
    control: &BatchControl<'_>,
) -> Result<ConversionReport, Error> {
    let labels = discover_files(input, "txt")?;
    let index = match sizing {
        ImageSizing::Probe(dir) => Some(FileIndex::build(dir)),
        ImageSizing::Fixed { .. } => None,
    };

    let polygons = YoloPolygonAdapter::new().with_policy(policy);
    let boxes = YoloBoxAdapter::new().with_minimum_size(min_size);

    let (_, report) = run_parallel(&labels, control, |label, report| {
        let dimensions = match (sizing, &index) {
            (ImageSizing::Fixed { width, height }, _) => Ok((*width, *height)),
            (ImageSizing::Probe(dir), Some(index)) => {
                let stem = label.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                match index.find(stem) {
                    Some(image) => probe_dimensions(image),
                    None => Err(Error::MissingSourceFile(dir.join(stem))),
                }
            }
            (ImageSizing::Probe(dir), None) => Err(Error::MissingSourceFile(dir.clone())),
        };

        convert_polygon_file(label, dimensions, output_dir, &polygons, &boxes, report);
        None::<()>
    });

    Ok(report)
}

#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(label = %label.display())))]
fn convert_polygon_file(
    label: &Path,
    dimensions: Result<(u32, u32), Error>,
    output_dir: &Path,
    polygons: &YoloPolygonAdapter,
    boxes: &YoloBoxAdapter,
    report: &mut ConversionReport,
) {
    let context = display_name(label);
    let image = match dimensions
        .and_then(|(w, h)| ImageRecord::new(0, file_name(label), w as i64, h as i64))
    {
        Ok(image) => image,
        Err(err) => {
            report.warn(context, err);
            return;
        }
    };

    let target = output_dir.join(file_name(label));
    let result = std::fs::read_to_string(label)
        .map_err(Error::from)
        .and_then(|text| {
            polygons.parse(YoloSource::new(&image, &text).with_context(&context), report)
        })
        .and_then(|parsed| {
            let annotations: Vec<Annotation> =
                parsed.into_iter().flat_map(|l| l.annotations).collect();
            boxes.serialize(&image, &annotations, report)
        })
        .and_then(|text| write_text(&target, &text));

    match result {
        Ok(()) => report.images += 1,
        Err(err) => report.fail(context, err),
    }
}

/// Extract YOLO polygon labels from color-coded segmentation masks.
///
/// `input` is a mask directory or a list file. Every mask produces
/// `<output_dir>/<stem>.txt`, empty when no registered color is present.
pub fn masks_to_polygons(
    input: &Path,
    output_dir: &Path,
    colors: &ColorClassMap,
    min_size: MinimumSize,
    control: &BatchControl<'_>,
) -> Result<ConversionReport, Error> {
    if colors.is_empty() {
        return Err(Error::InvalidParameters(
            "no mask colors configured".to_string(),
        ));
    }

    let masks = discover_images(input)?;
    let adapter = YoloPolygonAdapter::new().with_minimum_size(min_size);

    let (_, report) = run_parallel(&masks, control, |mask, report| {
        convert_mask(mask, output_dir, colors, &adapter, report);
        None::<()>
    });

    Ok(report)
}

#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(mask = %mask.display())))]
fn convert_mask(
    mask: &Path,
    output_dir: &Path,
    colors: &ColorClassMap,
    adapter: &YoloPolygonAdapter,
    report: &mut ConversionReport,
) {
    let context = display_name(mask);
    let pixels = match image::open(mask) {
        Ok(decoded) => decoded.to_rgb8(),
        Err(err) => {
            report.warn(context, err.into());
            return;
        }
    };

    let (width, height) = pixels.dimensions();
    let image = match ImageRecord::new(0, file_name(mask), width as i64, height as i64) {
        Ok(image) => image,
        Err(err) => {
            report.warn(context, err);
            return;
        }
    };

    let contours = extract_contours(&pixels, colors);
    debug!("{}: {} regions", context, contours.len());

    let target = output_dir.join(format!("{}.txt", image.stem()));
    let result = contours
        .into_iter()
        .enumerate()
        .map(|(idx, contour)| -> Result<Annotation, Error> {
            let polygon = contour.polygon.to_normalized(width, height)?;
            Ok(Annotation::new(
                idx as u64 + 1,
                image.id(),
                contour.class_id,
                Geometry::Polygon(polygon),
            ))
        })
        .collect::<Result<Vec<_>, _>>()
        .and_then(|annotations| adapter.serialize(&image, &annotations, report))
        .and_then(|text| write_text(&target, &text));

    match result {
        Ok(()) => report.images += 1,
        Err(err) => report.fail(context, err),
    }
}

/// Distinct colors of a mask image with their pixel counts, most frequent
/// first.
pub fn mask_colors(path: &Path) -> Result<Vec<(Rgb<u8>, u64)>, Error> {
    let pixels = image::open(path)?.to_rgb8();
    Ok(color_histogram(&pixels))
}
