mod config;

use crate::config::Config;
use anyhow::{bail, format_err, Context, Result};
use augment::{
    preview_sample_count, AnnotationStore, DirSink, FsImageSource, LogProgress, ManifestStore,
    VariantSink,
};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use structopt::StructOpt;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, StructOpt)]
/// Augment bounding-box annotated images
enum Args {
    /// Produce variants of one image
    Sample {
        #[structopt(long, default_value = "augment.json5")]
        /// configuration file
        config_file: PathBuf,
        #[structopt(long)]
        /// JSON manifest of images and labels
        manifest: PathBuf,
        #[structopt(long)]
        /// directory that relative image paths are resolved against
        image_root: Option<PathBuf>,
        #[structopt(long)]
        /// output directory
        output_dir: PathBuf,
        /// the source image id
        image_id: String,
    },
    /// Augment a whole dataset
    Bulk {
        #[structopt(long, default_value = "augment.json5")]
        /// configuration file
        config_file: PathBuf,
        #[structopt(long)]
        /// JSON manifest of images and labels
        manifest: PathBuf,
        #[structopt(long)]
        /// directory that relative image paths are resolved against
        image_root: Option<PathBuf>,
        #[structopt(long)]
        /// output directory
        output_dir: PathBuf,
        /// the dataset id
        dataset_id: String,
    },
}

#[tokio::main]
pub async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match Args::from_args() {
        Args::Sample {
            config_file,
            manifest,
            image_root,
            output_dir,
            image_id,
        } => {
            let config = load_config(&config_file)?;
            sample(config, manifest, image_root, output_dir, image_id)?;
        }
        Args::Bulk {
            config_file,
            manifest,
            image_root,
            output_dir,
            dataset_id,
        } => {
            let config = load_config(&config_file)?;
            bulk(config, manifest, image_root, output_dir, &dataset_id)
                .instrument(info_span!("bulk"))
                .await?;
        }
    }

    Ok(())
}

fn load_config(config_file: &Path) -> Result<Config> {
    Config::open(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))
}

fn image_source(image_root: Option<PathBuf>) -> FsImageSource {
    match image_root {
        Some(root) => FsImageSource::with_root(root),
        None => FsImageSource::new(),
    }
}

fn sample(
    config: Config,
    manifest: PathBuf,
    image_root: Option<PathBuf>,
    output_dir: PathBuf,
    image_id: String,
) -> Result<()> {
    let store = ManifestStore::open(&manifest)?;
    let image = store
        .find_image(&image_id)
        .ok_or_else(|| format_err!("image '{}' is not in the manifest", image_id))?;
    let labels = store.find_labels(&image_id);
    let n = config
        .samples
        .unwrap_or_else(|| preview_sample_count(&image));

    let engine = config.engine_init().build(image_source(image_root));
    let sink = DirSink::create(&output_dir, config.jpeg_quality)?;
    let samples = engine.run(&image, &labels, &config.operations, n)?;

    for sample in &samples {
        let created = sink.persist(None, &image, sample)?;
        info!(
            "wrote '{}' with {} of {} labels",
            created.path,
            sample.labels.len(),
            labels.len()
        );
    }

    Ok(())
}

async fn bulk(
    config: Config,
    manifest: PathBuf,
    image_root: Option<PathBuf>,
    output_dir: PathBuf,
    dataset_id: &str,
) -> Result<()> {
    let bulk = match config.bulk_init() {
        Some(init) => init.build()?,
        None => bail!("the 'bulk' section is missing in the config file"),
    };
    let store = Arc::new(ManifestStore::open(&manifest)?);
    let engine = Arc::new(config.engine_init().build(image_source(image_root)));
    let sink = Arc::new(DirSink::create(&output_dir, config.jpeg_quality)?);

    let report = bulk
        .run(
            store,
            engine,
            sink,
            Arc::new(LogProgress),
            dataset_id,
            &config.operations,
        )
        .await?;

    let report_file = output_dir.join(format!("pipeline-{}.json", report.pipeline.id));
    fs::write(&report_file, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("failed to write '{}'", report_file.display()))?;
    info!(
        "created {} images, {} failed, report saved to '{}'",
        report.created.len(),
        report.failures.len(),
        report_file.display()
    );

    Ok(())
}
