// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Filesystem side of a conversion: finding inputs, locating label files
//! and probing image dimensions.

use crate::Error;
use log::debug;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Supported image file extensions (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Directory holding YOLO labels beside the images in the darknet layout.
pub const YOLO_SUBDIR: &str = "YOLO_darknet";

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Every file below `root` whose extension matches, sorted by path.
fn walk_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, extensions))
        .collect();
    files.sort();
    files
}

/// Images to convert.
///
/// A directory is searched recursively for `jpg`, `jpeg` and `png` files
/// (any case). A regular file is read as a list with one image path per
/// line; relative entries are resolved against the list's directory.
pub fn discover_images(input: &Path) -> Result<Vec<PathBuf>, Error> {
    if input.is_dir() {
        let images = walk_files(input, IMAGE_EXTENSIONS);
        debug!("found {} images below {:?}", images.len(), input);
        return Ok(images);
    }

    if !input.exists() {
        return Err(Error::MissingSourceFile(input.to_path_buf()));
    }

    let base = input.parent().unwrap_or_else(|| Path::new(""));
    let list = std::fs::read_to_string(input)?;
    let images: Vec<PathBuf> = list
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let path = PathBuf::from(line);
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        })
        .collect();

    debug!("read {} image paths from {:?}", images.len(), input);
    Ok(images)
}

/// A single file, or every file with `extension` below a directory.
pub fn discover_files(input: &Path, extension: &str) -> Result<Vec<PathBuf>, Error> {
    if input.is_dir() {
        Ok(walk_files(input, &[extension]))
    } else if input.is_file() {
        Ok(vec![input.to_path_buf()])
    } else {
        Err(Error::MissingSourceFile(input.to_path_buf()))
    }
}

/// Where the YOLO label for `image` lives: `<dir>/<stem>.txt`, or
/// `<dir>/YOLO_darknet/<stem>.txt` in the darknet layout.
pub fn label_path(image: &Path, yolo_subdir: bool) -> PathBuf {
    let dir = image.parent().unwrap_or_else(|| Path::new(""));
    let mut name = image.file_stem().unwrap_or_default().to_os_string();
    name.push(".txt");
    if yolo_subdir {
        dir.join(YOLO_SUBDIR).join(name)
    } else {
        dir.join(name)
    }
}

/// Read a label file, reporting a missing one as [`Error::MissingLabelFile`].
pub fn read_label(path: &Path) -> Result<String, Error> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::MissingLabelFile(path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Image width and height from the file header, without decoding pixels.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), Error> {
    if !path.is_file() {
        return Err(Error::MissingSourceFile(path.to_path_buf()));
    }

    let size = imagesize::size(path)?;
    let (width, height) = (size.width as i64, size.height as i64);
    if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
        return Err(Error::InvalidDimension { width, height });
    }

    Ok((width as u32, height as u32))
}

/// Lookup of image files by lowercase file stem.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    by_stem: HashMap<String, PathBuf>,
}

impl FileIndex {
    /// Index the images below `root`. When two images share a stem, the
    /// first in path order wins.
    pub fn build(root: &Path) -> Self {
        let mut by_stem = HashMap::new();

        if !root.exists() {
            return Self { by_stem };
        }

        for path in walk_files(root, IMAGE_EXTENSIONS) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                by_stem.entry(stem.to_lowercase()).or_insert_with(|| path.clone());
            }
        }

        Self { by_stem }
    }

    pub fn find(&self, stem: &str) -> Option<&Path> {
        self.by_stem.get(&stem.to_lowercase()).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_images_directory() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.PNG"));
        touch(&dir.path().join("a.jpg"));
        touch(&dir.path().join("nested").join("c.jpeg"));
        touch(&dir.path().join("a.txt"));
        touch(&dir.path().join("d.bmp"));

        let images = discover_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.PNG"),
                PathBuf::from("nested").join("c.jpeg"),
            ]
        );
    }

    #[test]
    fn test_discover_images_list_file() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("train.txt");
        std::fs::write(&list, "images/a.jpg\n\n  /data/b.png  \n").unwrap();

        let images = discover_images(&list).unwrap();
        assert_eq!(
            images,
            vec![
                dir.path().join("images").join("a.jpg"),
                PathBuf::from("/data/b.png"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_input() {
        let err = discover_images(Path::new("/nonexistent/images")).unwrap_err();
        assert!(matches!(err, Error::MissingSourceFile(_)));
    }

    #[test]
    fn test_discover_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("val.json"));
        touch(&dir.path().join("train.json"));
        touch(&dir.path().join("notes.txt"));

        let files = discover_files(dir.path(), "json").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("train.json"));

        let single = discover_files(&dir.path().join("notes.txt"), "json").unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_label_path() {
        let image = Path::new("/data/images/part.01.jpg");
        assert_eq!(label_path(image, false), PathBuf::from("/data/images/part.01.txt"));
        assert_eq!(
            label_path(image, true),
            PathBuf::from("/data/images/YOLO_darknet/part.01.txt")
        );
    }

    #[test]
    fn test_read_missing_label() {
        let err = read_label(Path::new("/nonexistent/a.txt")).unwrap_err();
        assert!(matches!(err, Error::MissingLabelFile(_)));
    }

    #[test]
    fn test_probe_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(64, 48, Rgb([1, 2, 3])).save(&path).unwrap();

        assert_eq!(probe_dimensions(&path).unwrap(), (64, 48));
        assert!(matches!(
            probe_dimensions(&dir.path().join("missing.png")),
            Err(Error::MissingSourceFile(_))
        ));
    }

    #[test]
    fn test_file_index() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("Frame_01.JPG"));
        touch(&dir.path().join("sub").join("frame_02.png"));
        touch(&dir.path().join("frame_03.txt"));

        let index = FileIndex::build(dir.path());
        assert_eq!(index.len(), 2);
        assert!(index.find("frame_01").is_some());
        assert!(index.find("FRAME_02").is_some());
        assert!(index.find("frame_03").is_none());
    }
}
