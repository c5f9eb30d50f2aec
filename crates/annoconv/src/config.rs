// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Conversion settings.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a configuration file: the explicit path if given, otherwise
//!    `annoconv.toml` in the platform config directory when it exists
//! 3. `ANNOCONV_*` environment variables, with `__` separating nested keys
//!    and `,` separating list items (`ANNOCONV_CATEGORIES=crack,dent`)
//!
//! Command line flags are applied on top by the CLI.

use crate::{
    Error,
    coco::{CategoryConfig, CocoGeometry},
    contour::ColorClassMap,
    shapes::MinimumSize,
    yolo::ParsePolicy,
};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`ConversionConfig::load`].
pub const ENV_PREFIX: &str = "ANNOCONV";

/// Default configuration file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "annoconv.toml";

/// Image size assumed for polygon files when neither a size nor an image
/// directory is given.
pub const DEFAULT_IMAGE_SIZE: [u32; 2] = [1920, 1080];

/// Minimum edge applied by the polygon-to-box conversion when unset.
pub const DEFAULT_MIN_EDGE_PX: f64 = 15.0;

/// A mask color and the class it is labeled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub rgb: [u8; 3],
    pub class_id: u32,
}

/// All settings shared by the conversion commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Category names in canonical class order.
    pub categories: Vec<String>,
    pub supercategory: Option<String>,
    /// Minimum box edge in pixels; `None` disables size filtering.
    pub min_edge_px: Option<f64>,
    /// Write a rectangle segmentation for COCO box annotations.
    pub box_to_segmentation: bool,
    /// Geometry source when reading COCO.
    pub coco_geometry: CocoGeometry,
    /// Look for YOLO labels in a `YOLO_darknet` directory beside the images.
    pub yolo_subdir: bool,
    pub abort_on_malformed: bool,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// `[width, height]` used for polygon files without an image.
    pub image_size: Option<[u32; 2]>,
    /// Mask colors for polygon extraction, in extraction order.
    pub colors: Vec<ColorEntry>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            categories: (0..4).map(|i| i.to_string()).collect(),
            supercategory: Some("Defect".to_string()),
            min_edge_px: None,
            box_to_segmentation: false,
            coco_geometry: CocoGeometry::Bbox,
            yolo_subdir: false,
            abort_on_malformed: false,
            pretty: false,
            image_size: None,
            colors: vec![
                ColorEntry {
                    rgb: [254, 233, 3],
                    class_id: 0,
                },
                ColorEntry {
                    rgb: [201, 19, 223],
                    class_id: 1,
                },
                ColorEntry {
                    rgb: [238, 171, 171],
                    class_id: 2,
                },
                ColorEntry {
                    rgb: [255, 160, 1],
                    class_id: 3,
                },
            ],
        }
    }
}

impl ConversionConfig {
    /// Load settings from defaults, the configuration file and the process
    /// environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, Error> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                debug!("loading configuration from {:?}", path);
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    debug!("loading optional configuration from {:?}", path);
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let config: ConversionConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no conversion could run with.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(min) = self.min_edge_px
            && (!min.is_finite() || min < 0.0)
        {
            return Err(Error::InvalidParameters(format!(
                "min_edge_px must be a non-negative number, got {}",
                min
            )));
        }

        if let Some([width, height]) = self.image_size
            && (width == 0 || height == 0)
        {
            return Err(Error::InvalidDimension {
                width: width as i64,
                height: height as i64,
            });
        }

        Ok(())
    }

    pub fn category_config(&self) -> CategoryConfig {
        CategoryConfig {
            categories: self.categories.clone(),
            supercategory: self.supercategory.clone(),
        }
    }

    pub fn color_map(&self) -> ColorClassMap {
        ColorClassMap::new(self.colors.iter().map(|c| (c.rgb, c.class_id)))
    }

    pub fn minimum_size(&self) -> MinimumSize {
        MinimumSize::new(self.min_edge_px)
    }

    pub fn parse_policy(&self) -> ParsePolicy {
        ParsePolicy {
            abort_on_malformed: self.abort_on_malformed,
        }
    }
}

/// `annoconv.toml` in the platform config directory, e.g.
/// `~/.config/annoconv/annoconv.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("ai", "EdgeFirst", "annoconv")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("categories")
        .try_parsing(true)
}
