// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::path::PathBuf;

/// Error type for annotation conversion.
///
/// Geometry and per-line variants are usually contained at their own
/// granularity and collected into a [`crate::ConversionReport`]; the I/O,
/// JSON and configuration variants abort the file being converted.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Image decoding error.
    ImageError(image::ImageError),
    /// Image header probe error.
    ProbeError(imagesize::ImageError),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// Image width or height is zero or negative.
    InvalidDimension { width: i64, height: i64 },
    /// A polygon without any points reached a geometry operation.
    EmptyGeometry,
    /// A text annotation line could not be parsed.
    MalformedAnnotationLine { line: usize, reason: String },
    /// A referenced image file does not exist.
    MissingSourceFile(PathBuf),
    /// A referenced label file does not exist.
    MissingLabelFile(PathBuf),
    /// An annotation references an image id that is not in the document.
    OrphanedAnnotation { annotation_id: u64, image_id: u64 },
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl Error {
    /// Errors that only invalidate one annotation or one line, as opposed to
    /// a whole image or file.
    pub fn is_annotation_level(&self) -> bool {
        matches!(
            self,
            Error::EmptyGeometry
                | Error::MalformedAnnotationLine { .. }
                | Error::OrphanedAnnotation { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl From<imagesize::ImageError> for Error {
    fn from(err: imagesize::ImageError) -> Self {
        Error::ProbeError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::IoError(err.error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::ProbeError(e) => write!(f, "Image size probe error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::InvalidDimension { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            Error::EmptyGeometry => write!(f, "Geometry has no points"),
            Error::MalformedAnnotationLine { line, reason } => {
                write!(f, "Malformed annotation on line {}: {}", line, reason)
            }
            Error::MissingSourceFile(path) => write!(f, "Missing source file: {}", path.display()),
            Error::MissingLabelFile(path) => write!(f, "Missing label file: {}", path.display()),
            Error::OrphanedAnnotation {
                annotation_id,
                image_id,
            } => write!(
                f,
                "Annotation {} references non-existent image_id {}",
                annotation_id, image_id
            ),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            Error::ProbeError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            _ => None,
        }
    }
}
