// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! YOLO label text adapters.
//!
//! Both flavours use one line per object with a 0-based class id first and
//! normalized coordinates after it:
//!
//! ```text
//! 0 0.200000 0.300000 0.200000 0.200000        # box: xc yc w h [score]
//! 1 0.100000 0.100000 0.500000 0.100000 0.3 0.4  # polygon: x1 y1 ... xn yn
//! ```
//!
//! Lines that fail to parse become [`Error::MalformedAnnotationLine`]. By
//! default they are recorded in the report and skipped; with
//! [`ParsePolicy::abort_on_malformed`] the first one aborts the file.

use crate::{
    Annotation, ConversionReport, Error, Geometry, ImageRecord, LabeledImage,
    format::{FormatAdapter, YoloFormat},
    geometry::{CenterBox, Normalized, Polygon, center_to_corner, corner_to_center, round6},
    shapes::MinimumSize,
};
use itertools::Itertools as _;
use log::debug;

/// Minimum number of vertices in a YOLO polygon line.
pub const MIN_POLYGON_POINTS: usize = 3;

/// What to do with a line that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParsePolicy {
    /// Fail the whole file instead of skipping the line.
    pub abort_on_malformed: bool,
}

/// One label file and the image it describes.
#[derive(Debug, Clone, Copy)]
pub struct YoloSource<'a> {
    pub image: &'a ImageRecord,
    pub text: &'a str,
    /// Name used when reporting problems, usually the label file path.
    pub context: &'a str,
}

impl<'a> YoloSource<'a> {
    pub fn new(image: &'a ImageRecord, text: &'a str) -> Self {
        Self {
            image,
            text,
            context: image.file_name(),
        }
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = context;
        self
    }
}

/// Adapter for `class xc yc w h` lines.
#[derive(Debug, Clone, Default)]
pub struct YoloBoxAdapter {
    policy: ParsePolicy,
    min_size: MinimumSize,
}

impl YoloBoxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drop boxes failing the minimum-size policy when serializing.
    pub fn with_minimum_size(mut self, min_size: MinimumSize) -> Self {
        self.min_size = min_size;
        self
    }
}

/// Adapter for `class x1 y1 ... xn yn` lines.
#[derive(Debug, Clone, Default)]
pub struct YoloPolygonAdapter {
    policy: ParsePolicy,
    min_size: MinimumSize,
}

impl YoloPolygonAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_minimum_size(mut self, min_size: MinimumSize) -> Self {
        self.min_size = min_size;
        self
    }
}

impl FormatAdapter for YoloBoxAdapter {
    type Source<'a> = YoloSource<'a>;
    type Encoded = String;

    fn parse(
        &self,
        source: YoloSource<'_>,
        report: &mut ConversionReport,
    ) -> Result<Vec<LabeledImage>, Error> {
        let image = source.image;
        let annotations = parse_lines(source, self.policy, report, |line, line_no| {
            let (class_id, center, confidence) = parse_box_line(line, line_no)?;
            let annotation = Annotation::new(
                line_no as u64,
                image.id(),
                class_id,
                Geometry::Box(center_to_corner(&center)),
            );
            Ok(match confidence {
                Some(score) => annotation.with_confidence(score),
                None => annotation,
            })
        })?;

        Ok(vec![LabeledImage::new(image.clone(), annotations)])
    }

    fn serialize(
        &self,
        image: &ImageRecord,
        annotations: &[Annotation],
        report: &mut ConversionReport,
    ) -> Result<String, Error> {
        let mut out = String::new();

        for annotation in annotations {
            let bbox = match annotation.geometry.bbox() {
                Ok(bbox) => bbox,
                Err(err) => {
                    report.warn(image.file_name(), err);
                    continue;
                }
            };

            if !self.min_size.keep(&bbox, image.width(), image.height()) {
                debug!(
                    "{}: dropping annotation {} below minimum size",
                    image.file_name(),
                    annotation.id
                );
                report.filtered += 1;
                continue;
            }

            let center = corner_to_center(&bbox);
            out.push_str(&format!(
                "{} {:.6} {:.6} {:.6} {:.6}",
                annotation.category_id,
                fmt6(center.x_center),
                fmt6(center.y_center),
                fmt6(center.width),
                fmt6(center.height)
            ));
            if let Some(score) = annotation.confidence {
                out.push_str(&format!(" {:.6}", fmt6(score)));
            }
            out.push('\n');
            report.annotations += 1;
        }

        Ok(out)
    }
}

impl FormatAdapter for YoloPolygonAdapter {
    type Source<'a> = YoloSource<'a>;
    type Encoded = String;

    fn parse(
        &self,
        source: YoloSource<'_>,
        report: &mut ConversionReport,
    ) -> Result<Vec<LabeledImage>, Error> {
        let image = source.image;
        let annotations = parse_lines(source, self.policy, report, |line, line_no| {
            let (class_id, polygon) = parse_polygon_line(line, line_no)?;
            Ok(Annotation::new(
                line_no as u64,
                image.id(),
                class_id,
                Geometry::Polygon(polygon),
            ))
        })?;

        Ok(vec![LabeledImage::new(image.clone(), annotations)])
    }

    fn serialize(
        &self,
        image: &ImageRecord,
        annotations: &[Annotation],
        report: &mut ConversionReport,
    ) -> Result<String, Error> {
        let mut out = String::new();

        for annotation in annotations {
            let polygon = annotation.geometry.polygon();
            let bbox = match annotation.geometry.bbox() {
                Ok(bbox) => bbox,
                Err(err) => {
                    report.warn(image.file_name(), err);
                    continue;
                }
            };

            if !self.min_size.keep(&bbox, image.width(), image.height()) {
                report.filtered += 1;
                continue;
            }

            let coords = polygon
                .points()
                .iter()
                .map(|p| format!("{:.6} {:.6}", fmt6(p.x), fmt6(p.y)))
                .join(" ");
            out.push_str(&format!("{} {}\n", annotation.category_id, coords));
            report.annotations += 1;
        }

        Ok(out)
    }
}

/// Either YOLO flavour behind one adapter, selected at runtime.
#[derive(Debug, Clone)]
pub enum YoloAdapter {
    Box(YoloBoxAdapter),
    Polygon(YoloPolygonAdapter),
}

impl YoloAdapter {
    pub fn new(format: YoloFormat, policy: ParsePolicy, min_size: MinimumSize) -> Self {
        match format {
            YoloFormat::Box => YoloAdapter::Box(
                YoloBoxAdapter::new()
                    .with_policy(policy)
                    .with_minimum_size(min_size),
            ),
            YoloFormat::Polygon => YoloAdapter::Polygon(
                YoloPolygonAdapter::new()
                    .with_policy(policy)
                    .with_minimum_size(min_size),
            ),
        }
    }

    pub fn format(&self) -> YoloFormat {
        match self {
            YoloAdapter::Box(_) => YoloFormat::Box,
            YoloAdapter::Polygon(_) => YoloFormat::Polygon,
        }
    }
}

impl FormatAdapter for YoloAdapter {
    type Source<'a> = YoloSource<'a>;
    type Encoded = String;

    fn parse(
        &self,
        source: YoloSource<'_>,
        report: &mut ConversionReport,
    ) -> Result<Vec<LabeledImage>, Error> {
        match self {
            YoloAdapter::Box(adapter) => adapter.parse(source, report),
            YoloAdapter::Polygon(adapter) => adapter.parse(source, report),
        }
    }

    fn serialize(
        &self,
        image: &ImageRecord,
        annotations: &[Annotation],
        report: &mut ConversionReport,
    ) -> Result<String, Error> {
        match self {
            YoloAdapter::Box(adapter) => adapter.serialize(image, annotations, report),
            YoloAdapter::Polygon(adapter) => adapter.serialize(image, annotations, report),
        }
    }
}

/// Round for output and fold `-0.0` into `0.0`.
fn fmt6(value: f64) -> f64 {
    round6(value) + 0.0
}

fn parse_lines<T>(
    source: YoloSource<'_>,
    policy: ParsePolicy,
    report: &mut ConversionReport,
    parse: impl Fn(&str, usize) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let mut parsed = Vec::new();

    for (idx, line) in source.text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse(line, idx + 1) {
            Ok(item) => parsed.push(item),
            Err(err) if policy.abort_on_malformed => return Err(err),
            Err(err) => report.warn(source.context, err),
        }
    }

    Ok(parsed)
}

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedAnnotationLine {
        line,
        reason: reason.into(),
    }
}

fn parse_class(token: &str, line: usize) -> Result<u32, Error> {
    token
        .parse::<u32>()
        .map_err(|_| malformed(line, format!("invalid class id '{}'", token)))
}

fn parse_coord(token: &str, line: usize) -> Result<f64, Error> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(malformed(line, format!("invalid number '{}'", token))),
    }
}

/// Parse `class xc yc w h [score]`.
pub fn parse_box_line(
    line: &str,
    line_no: usize,
) -> Result<(u32, CenterBox<Normalized>, Option<f64>), Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 5 && tokens.len() != 6 {
        return Err(malformed(
            line_no,
            format!("expected 5 or 6 tokens, found {}", tokens.len()),
        ));
    }

    let class_id = parse_class(tokens[0], line_no)?;
    let values = tokens[1..5]
        .iter()
        .map(|t| parse_coord(t, line_no))
        .collect::<Result<Vec<_>, _>>()?;

    let confidence = match tokens.get(5) {
        Some(token) => {
            let score = parse_coord(token, line_no)?;
            if !(0.0..=1.0).contains(&score) {
                return Err(malformed(line_no, format!("confidence {} outside [0, 1]", score)));
            }
            Some(score)
        }
        None => None,
    };

    Ok((
        class_id,
        CenterBox::new(values[0], values[1], values[2], values[3]),
        confidence,
    ))
}

/// Parse `class x1 y1 ... xn yn`.
pub fn parse_polygon_line(line: &str, line_no: usize) -> Result<(u32, Polygon<Normalized>), Error> {
    let mut tokens = line.split_whitespace();
    let class_token = tokens
        .next()
        .ok_or_else(|| malformed(line_no, "empty line"))?;
    let class_id = parse_class(class_token, line_no)?;

    let coords = tokens
        .map(|t| parse_coord(t, line_no))
        .collect::<Result<Vec<_>, _>>()?;

    if coords.len() % 2 != 0 {
        return Err(malformed(
            line_no,
            format!("odd number of coordinates ({})", coords.len()),
        ));
    }
    if coords.len() < MIN_POLYGON_POINTS * 2 {
        return Err(malformed(
            line_no,
            format!(
                "polygon needs at least {} points, found {}",
                MIN_POLYGON_POINTS,
                coords.len() / 2
            ),
        ));
    }

    let points = coords
        .into_iter()
        .tuples()
        .map(|(x, y)| crate::geometry::Point::new(x, y))
        .collect();

    Ok((class_id, Polygon::new(points)))
}
