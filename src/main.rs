use anyhow::{ensure, Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use rayon::ThreadPoolBuilder;

use silo_mapper::{Config, SiloDetector};

fn main() -> Result<()> {
    let config = Config::parse();

    // -v/-vv win over RUST_LOG; without them RUST_LOG is honoured, defaulting to warn.
    let mut logger = if config.verbose == 0 {
        Builder::from_env(Env::default().default_filter_or("warn"))
    } else {
        let mut builder = Builder::new();
        builder.filter_level(config.log_filter());
        builder
    };
    logger.init();

    ensure!(
        config.segmentation_model.exists(),
        "Segmentation model does not exist: {}",
        config.segmentation_model.display()
    );
    if let Some(path) = &config.classification_model {
        ensure!(path.exists(), "Classification model does not exist: {}", path.display());
    }
    ensure!(
        config.input.exists(),
        "Input does not exist: {}",
        config.input.display()
    );

    ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()?;

    let detector = SiloDetector::with_onnx_models(config).context("Failed to load models")?;
    let reports = detector
        .process_input()
        .context("Failed to process input")?;

    for report in &reports {
        println!("{report}");
    }

    Ok(())
}
