// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use annoconv::{
    BatchControl, ConversionConfig, ConversionReport, DEFAULT_IMAGE_SIZE, DEFAULT_MIN_EDGE_PX,
    Error, ImageSizing, Progress, YoloFormat, YoloToCocoOptions,
    coco::CocoGeometry,
    coco_to_yolo, mask_colors, masks_to_polygons, polygons_to_boxes,
    shapes::MinimumSize,
    yolo_to_coco,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::{path::PathBuf, sync::mpsc, thread::JoinHandle};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file, defaults to annoconv.toml in the user config
    /// directory when present
    #[clap(long, global = true, env = "ANNOCONV_CONFIG")]
    config: Option<PathBuf>,

    /// Fail a label file on its first malformed line instead of skipping
    /// the line
    #[clap(long, global = true)]
    abort_on_malformed: bool,

    /// Conversion Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Convert COCO JSON annotations into one YOLO label file per image.
    Coco2yolo {
        /// COCO JSON file, or a directory searched for .json files
        input: PathBuf,

        /// Directory holding the images named by the COCO documents
        #[clap(long)]
        images: PathBuf,

        /// Output directory for the label files
        #[clap(long, short)]
        output: PathBuf,

        /// Write polygon labels from the COCO segmentations instead of
        /// boxes
        #[clap(long)]
        polygon: bool,
    },
    /// Convert images and their YOLO labels into a COCO JSON document.
    Yolo2coco {
        /// Image directory, or a list file with one image path per line
        input: PathBuf,

        /// Output COCO JSON file
        #[clap(long, short)]
        output: PathBuf,

        /// Labels are in a YOLO_darknet directory beside the images
        #[clap(long)]
        yolo_subdir: bool,

        /// Write a rectangle segmentation for every box
        #[clap(long)]
        box2seg: bool,

        /// Write a COCO detection results list; every label line must
        /// carry a confidence score
        #[clap(long)]
        results: bool,

        /// Labels are YOLO polygons instead of boxes
        #[clap(long)]
        polygon: bool,

        /// Pretty-print the JSON output
        #[clap(long)]
        pretty: bool,
    },
    /// Convert YOLO polygon labels into YOLO box labels.
    Poly2box {
        /// Polygon label file, or a directory searched for .txt files
        input: PathBuf,

        /// Output directory for the box labels
        #[clap(long, short)]
        output: PathBuf,

        /// Size of every image as WIDTHxHEIGHT
        #[clap(long, value_parser = parse_image_size, conflicts_with = "images")]
        image_size: Option<(u32, u32)>,

        /// Directory with the images, probed for their size by file stem
        #[clap(long)]
        images: Option<PathBuf>,

        /// Drop boxes whose edges are both shorter than this many pixels
        #[clap(long)]
        min_edge: Option<f64>,
    },
    /// Extract YOLO polygon labels from color-coded segmentation masks.
    Mask2poly {
        /// Mask directory, or a list file with one mask path per line
        input: PathBuf,

        /// Output directory for the polygon labels
        #[clap(long, short)]
        output: PathBuf,

        /// Drop polygons whose bounding box edges are both shorter than
        /// this many pixels
        #[clap(long)]
        min_edge: Option<f64>,
    },
    /// List the distinct colors of a mask image with their pixel counts.
    Colors {
        /// Mask image
        mask: PathBuf,
    },
}

fn parse_image_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height))?;
    if width == 0 || height == 0 {
        return Err(format!("image size must be positive, got {}x{}", width, height));
    }
    Ok((width, height))
}

fn progress_bar(message: &'static str) -> (mpsc::Sender<Progress>, JoinHandle<()>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(message);

    let (tx, rx) = mpsc::channel::<Progress>();

    let handle = std::thread::spawn(move || {
        for progress in rx {
            if progress.total > 0 {
                bar.set_length(progress.total as u64);
                bar.set_position(progress.current as u64);
            }
        }
        bar.finish();
    });

    (tx, handle)
}

/// Run one batch conversion with a progress bar attached.
fn with_progress<F>(message: &'static str, convert: F) -> Result<ConversionReport, Error>
where
    F: FnOnce(&BatchControl<'_>) -> Result<ConversionReport, Error>,
{
    let (tx, handle) = progress_bar(message);
    let control = BatchControl::new().with_progress(tx);
    let result = convert(&control);

    // Dropping the sender ends the progress thread.
    drop(control);
    if handle.join().is_err() {
        warn!("progress display thread panicked");
    }

    result
}

fn print_report(report: &ConversionReport) {
    println!("{}", report);
    if report.cancelled {
        println!("Conversion was cancelled before all files were processed");
    }
    if !report.is_clean() {
        info!("{} warnings, see log output above", report.warnings.len());
    }
}

fn handle_coco2yolo(
    config: ConversionConfig,
    input: PathBuf,
    images: PathBuf,
    output: PathBuf,
    polygon: bool,
) -> Result<(), Error> {
    let (format, config) = match polygon {
        true => (
            YoloFormat::Polygon,
            ConversionConfig {
                coco_geometry: CocoGeometry::Segmentation,
                ..config
            },
        ),
        false => (YoloFormat::Box, config),
    };

    let report = with_progress("Writing labels", |control| {
        coco_to_yolo(&input, &images, &output, format, &config, control)
    })?;
    print_report(&report);
    Ok(())
}

fn handle_yolo2coco(
    config: ConversionConfig,
    input: PathBuf,
    output: PathBuf,
    options: YoloToCocoOptions,
) -> Result<(), Error> {
    let report = with_progress("Reading labels", |control| {
        yolo_to_coco(&input, &output, options, &config, control)
    })?;
    print_report(&report);

    if !report.cancelled {
        println!("Wrote {}", output.display());
    }
    Ok(())
}

fn handle_poly2box(
    config: ConversionConfig,
    input: PathBuf,
    output: PathBuf,
    image_size: Option<(u32, u32)>,
    images: Option<PathBuf>,
    min_edge: Option<f64>,
) -> Result<(), Error> {
    let sizing = match (image_size, images, config.image_size) {
        (Some((width, height)), _, _) => ImageSizing::Fixed { width, height },
        (None, Some(images), _) => ImageSizing::Probe(images),
        (None, None, Some([width, height])) => ImageSizing::Fixed { width, height },
        (None, None, None) => {
            let [width, height] = DEFAULT_IMAGE_SIZE;
            info!("no image size given, assuming {}x{}", width, height);
            ImageSizing::Fixed { width, height }
        }
    };

    let min_size = MinimumSize::new(Some(
        min_edge
            .or(config.min_edge_px)
            .unwrap_or(DEFAULT_MIN_EDGE_PX),
    ));
    let policy = config.parse_policy();

    let report = with_progress("Converting polygons", |control| {
        polygons_to_boxes(&input, &output, &sizing, min_size, policy, control)
    })?;
    print_report(&report);
    Ok(())
}

fn handle_mask2poly(
    config: ConversionConfig,
    input: PathBuf,
    output: PathBuf,
    min_edge: Option<f64>,
) -> Result<(), Error> {
    let colors = config.color_map();
    let min_size = MinimumSize::new(min_edge.or(config.min_edge_px));

    let report = with_progress("Extracting contours", |control| {
        masks_to_polygons(&input, &output, &colors, min_size, control)
    })?;
    print_report(&report);
    Ok(())
}

fn handle_colors(config: ConversionConfig, mask: PathBuf) -> Result<(), Error> {
    let colors = config.color_map();

    for (color, count) in mask_colors(&mask)? {
        let [r, g, b] = color.0;
        match colors.class_of(&color) {
            Some(class_id) => println!("[{}, {}, {}]: {} px (class {})", r, g, b, count, class_id),
            None => println!("[{}, {}, {}]: {} px", r, g, b, count),
        }
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "profiling")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ConversionConfig::load(args.config.as_deref())?;
    config.abort_on_malformed |= args.abort_on_malformed;

    match args.cmd {
        Command::Coco2yolo {
            input,
            images,
            output,
            polygon,
        } => handle_coco2yolo(config, input, images, output, polygon),
        Command::Yolo2coco {
            input,
            output,
            yolo_subdir,
            box2seg,
            results,
            polygon,
            pretty,
        } => {
            config.yolo_subdir |= yolo_subdir;
            config.box_to_segmentation |= box2seg;
            config.pretty |= pretty;
            let options = YoloToCocoOptions {
                format: match polygon {
                    true => YoloFormat::Polygon,
                    false => YoloFormat::Box,
                },
                results,
            };
            handle_yolo2coco(config, input, output, options)
        }
        Command::Poly2box {
            input,
            output,
            image_size,
            images,
            min_edge,
        } => handle_poly2box(config, input, output, image_size, images, min_edge),
        Command::Mask2poly {
            input,
            output,
            min_edge,
        } => handle_mask2poly(config, input, output, min_edge),
        Command::Colors { mask } => handle_colors(config, mask),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_size() {
        assert_eq!(parse_image_size("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_image_size("640X480"), Ok((640, 480)));
        assert!(parse_image_size("1920").is_err());
        assert!(parse_image_size("0x10").is_err());
        assert!(parse_image_size("wx10").is_err());
    }

    #[test]
    fn test_args() {
        use clap::CommandFactory;
        Args::command().debug_assert();

        let args = Args::try_parse_from([
            "annoconv",
            "poly2box",
            "labels",
            "--output",
            "boxes",
            "--image-size",
            "640x480",
        ])
        .unwrap();
        assert!(matches!(
            args.cmd,
            Command::Poly2box {
                image_size: Some((640, 480)),
                min_edge: None,
                ..
            }
        ));

        assert!(
            Args::try_parse_from([
                "annoconv",
                "poly2box",
                "labels",
                "-o",
                "boxes",
                "--image-size",
                "640x480",
                "--images",
                "imgs",
            ])
            .is_err()
        );
    }
}
