use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

use crate::area::DEFAULT_RESOLUTION;
use crate::device::Device;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Image file or directory of aerial tiles
    pub input: PathBuf,

    /// Where overlay images are written
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// ONNX segmentation model
    #[arg(short = 'm', long)]
    pub segmentation_model: PathBuf,

    /// ONNX silo classifier; every tile is segmented when omitted
    #[arg(short, long)]
    pub classification_model: Option<PathBuf>,

    /// `cpu`, `gpu` or `gpu:N`
    #[arg(short, long, default_value = "cpu")]
    pub device: Device,

    /// Edge length in pixels tiles are resized to
    #[arg(short, long, default_value_t = DEFAULT_RESOLUTION, value_parser = check_resolution)]
    pub resolution: u32,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    #[arg(short, long, default_value_t = default_threads())]
    pub num_threads: usize,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn log_filter(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn check_resolution(s: &str) -> Result<u32, String> {
    let resolution: u32 = s
        .parse()
        .map_err(|_| format!("{s} is not a positive integer"))?;
    if resolution == 0 {
        return Err("resolution must be greater than zero".to_string());
    }
    Ok(resolution)
}

fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
