// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON reader.

use super::types::CocoDataset;
use crate::Error;
use std::{fs::File, io::BufReader, path::Path};

/// COCO annotation file reader.
///
/// # Example
///
/// ```rust,no_run
/// use annoconv::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read_json("annotations/instances_val.json")?;
/// println!("Loaded {} images", dataset.images.len());
/// # Ok::<(), annoconv::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoReader {}

impl CocoReader {
    pub fn new() -> Self {
        Self {}
    }

    /// Read a COCO dataset from a JSON file.
    ///
    /// Invalid JSON and a missing `images` key are document-level errors.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let dataset: CocoDataset = serde_json::from_reader(reader)?;
        Ok(dataset)
    }
}
