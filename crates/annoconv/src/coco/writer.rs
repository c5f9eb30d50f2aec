// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON writers.
//!
//! Documents are written atomically through [`crate::io::write_atomic`].

use super::types::{CocoDataset, CocoResult};
use crate::{Error, io::write_atomic};
use serde::Serialize;
use std::path::Path;

/// Options for COCO writing.
#[derive(Debug, Clone, Default)]
pub struct CocoWriteOptions {
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
}

/// COCO writer for annotation documents and detection results.
///
/// # Example
///
/// ```rust,no_run
/// use annoconv::coco::{CocoDataset, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let dataset = CocoDataset::default();
/// writer.write_json(&dataset, "annotations.json")?;
/// # Ok::<(), annoconv::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoWriter {
    options: CocoWriteOptions,
}

impl CocoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CocoWriteOptions) -> Self {
        Self { options }
    }

    /// Write a COCO dataset to a JSON file.
    pub fn write_json<P: AsRef<Path>>(&self, dataset: &CocoDataset, path: P) -> Result<(), Error> {
        self.write_value(dataset, path)
    }

    /// Write a detection results list (`[{image_id, category_id, bbox,
    /// score}]`) to a JSON file.
    pub fn write_results<P: AsRef<Path>>(&self, results: &[CocoResult], path: P) -> Result<(), Error> {
        self.write_value(results, path)
    }

    fn write_value<T: Serialize + ?Sized, P: AsRef<Path>>(
        &self,
        value: &T,
        path: P,
    ) -> Result<(), Error> {
        let pretty = self.options.pretty;
        write_atomic(path, |writer| {
            if pretty {
                serde_json::to_writer_pretty(writer, value)?;
            } else {
                serde_json::to_writer(writer, value)?;
            }
            Ok(())
        })
    }
}
