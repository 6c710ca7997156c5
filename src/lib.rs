pub mod area;
pub mod category;
pub mod classifier;
pub mod config;
pub mod decode;
pub mod device;
pub mod errors;
pub mod input;
pub mod model;
pub mod normalize;
pub mod overlay;
pub mod pipeline;
pub mod traits;

pub mod mocks;

use image::ImageFormat;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use category::SizeCategory;
pub use classifier::Presence;
pub use config::Config;
pub use device::Device;
pub use errors::{Result, SiloError};
pub use input::Tile;
pub use model::{OnnxClassificationModel, OnnxSegmentationModel};
pub use pipeline::{final_pred, final_pred_at, Prediction};
pub use traits::*;

/// Outcome of analysing one tile.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// `None` when no classifier is configured.
    pub presence: Option<Presence>,
    pub prediction: Prediction,
}

/// What was found in one input image, and where its overlay went.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub input: PathBuf,
    pub overlay: PathBuf,
    pub presence: Option<Presence>,
    pub area: f64,
    pub category: SizeCategory,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.input.display())?;
        match self.presence {
            Some(presence) if !presence.is_silo() => write!(
                f,
                "It's not a silo (probability {:.2})",
                presence.probability
            ),
            Some(presence) => write!(
                f,
                "It's a silo (probability {:.2}), {} storage covering {:.1} square meters",
                presence.probability, self.category, self.area
            ),
            None => write!(
                f,
                "{} storage covering {:.1} square meters",
                self.category, self.area
            ),
        }
    }
}

/// Runs classification and segmentation over files on disk.
pub struct SiloDetector<S: SegmentationModel, C: ClassificationModel> {
    segmenter: S,
    classifier: Option<C>,
    config: Config,
}

impl<S: SegmentationModel, C: ClassificationModel> SiloDetector<S, C> {
    pub const fn new(segmenter: S, classifier: Option<C>, config: Config) -> Self {
        Self {
            segmenter,
            classifier,
            config,
        }
    }

    /// Classify `tile` when a classifier is configured, then always segment it.
    pub fn analyze_tile(&self, tile: &Tile) -> Result<Analysis> {
        let presence = self
            .classifier
            .as_ref()
            .map(|model| classifier::classify(model, tile))
            .transpose()?;

        let prediction = final_pred_at(
            tile.scaled().view(),
            &self.segmenter,
            self.config.device,
            self.config.resolution,
        )?;

        Ok(Analysis {
            presence,
            prediction,
        })
    }

    /// Process the configured input file or directory, in parallel.
    pub fn process_input(&self) -> Result<Vec<Report>> {
        let input_path = &self.config.input;
        let output_path = &self.config.output_dir;

        if !input_path.exists() {
            return Err(SiloError::FileSystem {
                path: input_path.clone(),
                operation: "input lookup".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input path does not exist",
                ),
            });
        }

        fs::create_dir_all(output_path).map_err(|e| SiloError::FileSystem {
            path: output_path.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        let image_files = self.collect_image_files(input_path);
        if image_files.is_empty() {
            warn!("no images found under {}", input_path.display());
            return Ok(Vec::new());
        }
        info!("processing {} image(s)", image_files.len());

        let pb = ProgressBar::new(image_files.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map_err(|e| SiloError::Configuration {
                message: e.to_string(),
            })?
            .progress_chars("#>-"),
        );

        let reports = image_files
            .par_iter()
            .progress_with(pb.clone())
            .map(|input_file| self.process_single_image(input_file))
            .collect::<Result<Vec<_>>>()?;

        pb.finish_and_clear();
        Ok(reports)
    }

    fn collect_image_files(&self, input_path: &Path) -> Vec<PathBuf> {
        if input_path.is_file() {
            return vec![input_path.to_path_buf()];
        }

        let mut image_files: Vec<_> = WalkDir::new(input_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| ImageFormat::from_path(e.path()).is_ok())
            .map(|e| e.into_path())
            .collect();
        image_files.sort();
        image_files
    }

    pub fn process_single_image(&self, input_file: &Path) -> Result<Report> {
        let tile = Tile::open(input_file, self.config.resolution)?;
        let Analysis {
            presence,
            prediction,
        } = self.analyze_tile(&tile)?;

        let output_file = self.output_path_for(input_file)?;
        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent).map_err(|e| SiloError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create output directory".to_string(),
                source: e,
            })?;
        }

        overlay::to_rgb_image(prediction.overlay.view())?
            .save(&output_file)
            .map_err(|e| SiloError::ImageProcessing {
                path: output_file.display().to_string(),
                operation: "save overlay".to_string(),
                source: Box::new(e),
            })?;

        Ok(Report {
            input: input_file.to_path_buf(),
            overlay: output_file,
            presence,
            area: prediction.area,
            category: prediction.category,
        })
    }

    /// Mirror `input_file`'s location under the output directory.
    pub fn output_path_for(&self, input_file: &Path) -> Result<PathBuf> {
        let input = &self.config.input;
        let relative = if input.is_dir() {
            input_file.strip_prefix(input).map(Path::to_path_buf).map_err(|_| {
                SiloError::FileSystem {
                    path: input_file.to_path_buf(),
                    operation: "relative path lookup".to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "file is not inside the input directory",
                    ),
                }
            })?
        } else {
            input_file
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| SiloError::Validation {
                    field: "input".to_string(),
                    reason: format!("{} has no file name", input_file.display()),
                })?
        };

        Ok(self
            .config
            .output_dir
            .join(relative)
            .with_extension(&self.config.format))
    }
}

impl SiloDetector<OnnxSegmentationModel, OnnxClassificationModel> {
    pub fn with_onnx_models(config: Config) -> Result<Self> {
        let segmenter = OnnxSegmentationModel::new(&config.segmentation_model, config.device)?;
        let classifier = config
            .classification_model
            .as_deref()
            .map(|path| OnnxClassificationModel::new(path, config.device))
            .transpose()?;
        Ok(Self::new(segmenter, classifier, config))
    }
}
