// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! The adapter interface shared by the COCO, YOLO box and YOLO polygon
//! formats, and the id counters they use.
//!
//! An adapter turns one source (a JSON document, a label file) into
//! [`LabeledImage`]s and turns one image's annotations back into its own
//! encoding. Adapters hold configuration and id counters only; they never
//! touch the filesystem.

use crate::{Annotation, ConversionReport, Error, ImageRecord, LabeledImage};
use std::sync::atomic::{AtomicU64, Ordering};

/// Parse/serialize capability pair implemented by every format.
pub trait FormatAdapter {
    /// What one call to [`FormatAdapter::parse`] consumes.
    type Source<'a>;
    /// What one call to [`FormatAdapter::serialize`] produces.
    type Encoded;

    /// Decode a source into labeled images. Per-line and per-annotation
    /// problems are recorded in `report`; only structural problems with the
    /// whole source are returned as errors.
    fn parse(
        &self,
        source: Self::Source<'_>,
        report: &mut ConversionReport,
    ) -> Result<Vec<LabeledImage>, Error>;

    /// Encode one image's annotations.
    fn serialize(
        &self,
        image: &ImageRecord,
        annotations: &[Annotation],
        report: &mut ConversionReport,
    ) -> Result<Self::Encoded, Error>;
}

/// Which YOLO text flavour to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YoloFormat {
    /// `class xc yc w h`
    #[default]
    Box,
    /// `class x1 y1 ... xn yn`
    Polygon,
}

/// Monotonically increasing id counter.
///
/// Increments are atomic so the counter may be shared across worker
/// threads; ids are unique but only ordered within one thread.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`IdSequence::next_id`] will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
