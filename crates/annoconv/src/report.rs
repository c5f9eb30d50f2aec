// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Accumulated warning log for a conversion run.

use crate::Error;
use log::{error, warn};

/// A contained error together with where it happened.
#[derive(Debug)]
pub struct Warning {
    /// File, image or document the error belongs to.
    pub context: String,
    pub error: Error,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

/// Counters and warnings collected while converting.
///
/// Errors that only affect one line, annotation or image are recorded here
/// instead of aborting the file.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Images written to the target format.
    pub images: usize,
    /// Annotations written to the target format.
    pub annotations: usize,
    /// Annotations removed by the minimum-size policy.
    pub filtered: usize,
    /// Annotations dropped because their image does not exist.
    pub orphaned: usize,
    /// Lines or entries that failed to parse.
    pub malformed: usize,
    /// Images skipped because of an image-level error.
    pub skipped_images: usize,
    /// Input files whose conversion was aborted.
    pub failed_files: usize,
    /// The run was cancelled before every file was processed.
    pub cancelled: bool,
    pub warnings: Vec<Warning>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contained error, bumping the matching counter.
    pub fn warn(&mut self, context: impl Into<String>, error: Error) {
        let context = context.into();
        warn!("{}: {}", context, error);

        match &error {
            Error::MalformedAnnotationLine { .. } => self.malformed += 1,
            Error::OrphanedAnnotation { .. } => self.orphaned += 1,
            err if err.is_annotation_level() => {}
            Error::InvalidDimension { .. }
            | Error::MissingSourceFile(_)
            | Error::ImageError(_)
            | Error::ProbeError(_) => self.skipped_images += 1,
            _ => self.failed_files += 1,
        }

        self.warnings.push(Warning { context, error });
    }

    /// Record a document-level error that aborted one input file.
    pub fn fail(&mut self, context: impl Into<String>, error: Error) {
        let context = context.into();
        error!("{}: {}", context, error);
        self.failed_files += 1;
        self.warnings.push(Warning { context, error });
    }

    /// Fold another report into this one, keeping warning order.
    pub fn merge(&mut self, other: ConversionReport) {
        self.images += other.images;
        self.annotations += other.annotations;
        self.filtered += other.filtered;
        self.orphaned += other.orphaned;
        self.malformed += other.malformed;
        self.skipped_images += other.skipped_images;
        self.failed_files += other.failed_files;
        self.cancelled |= other.cancelled;
        self.warnings.extend(other.warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl std::fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} images, {} annotations written; {} filtered by size, {} orphaned, {} malformed, {} images skipped, {} files failed",
            self.images,
            self.annotations,
            self.filtered,
            self.orphaned,
            self.malformed,
            self.skipped_images,
            self.failed_files
        )
    }
}
