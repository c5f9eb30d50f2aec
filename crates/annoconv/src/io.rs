// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Atomic output files.
//!
//! Output is written to a temporary file in the destination directory and
//! renamed over the target once complete, so readers never observe a
//! partially written label file or JSON document.

use crate::Error;
use std::{
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Write a file through `write`, replacing `path` only once `write` and the
/// final flush succeed. Missing parent directories are created.
pub fn write_atomic<P, F>(path: P, write: F) -> Result<(), Error>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> Result<(), Error>,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::with_capacity(64 * 1024, tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path)?;

    Ok(())
}

/// Atomically write a string.
pub fn write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<(), Error> {
    write_atomic(path, |w| {
        w.write_all(text.as_bytes())?;
        Ok(())
    })
}
