//! Persistence of produced variants and progress reporting.

use crate::{common::*, sampler::Sample};

/// Stores an augmented variant as a new image with its labels.
pub trait VariantSink: Debug + Send + Sync {
    /// Persist `sample` derived from `source` and return the new descriptor.
    fn persist(
        &self,
        pipeline_id: Option<&str>,
        source: &ImageInfo,
        sample: &Sample,
    ) -> Result<ImageInfo>;
}

/// Receives the progress of a long running workflow.
pub trait ProgressReporter: Debug + Send + Sync {
    fn report(&self, done: usize, total: usize);
}

/// Reports progress to the log.
#[derive(Debug, Clone, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, done: usize, total: usize) {
        info!("{} of {} images processed", done, total);
    }
}

/// The record written next to every variant image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    pub image: ImageInfo,
    pub labels: Vec<Label>,
}

/// Writes variants into a directory as `<id>.jpg` plus `<id>.json`.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct DirSink {
    #[getset(get = "pub")]
    dir: PathBuf,
    #[getset(get_copy = "pub")]
    jpeg_quality: u8,
}

impl DirSink {
    pub fn create(dir: impl AsRef<Path>, jpeg_quality: u8) -> Result<Self> {
        let dir = dir.as_ref();
        ensure!(
            (1..=100).contains(&jpeg_quality),
            "jpeg_quality must be in range 1..=100, but get {}",
            jpeg_quality
        );
        fs::create_dir_all(dir)
            .with_context(|| format!("unable to create directory '{}'", dir.display()))?;
        Ok(Self {
            dir: dir.to_owned(),
            jpeg_quality,
        })
    }
}

impl VariantSink for DirSink {
    fn persist(
        &self,
        pipeline_id: Option<&str>,
        source: &ImageInfo,
        sample: &Sample,
    ) -> Result<ImageInfo> {
        let bytes = sample.encode(ImageOutputFormat::Jpeg(self.jpeg_quality))?;
        let image_path = self.dir.join(format!("{}.jpg", sample.id));
        let record_path = self.dir.join(format!("{}.json", sample.id));
        let (width, height) = sample.image.dimensions();

        let image = ImageInfo {
            id: sample.id.clone(),
            dataset_id: source.dataset_id.clone(),
            name: format!("augmented-{}", source.name),
            path: image_path.display().to_string(),
            size: bytes.len() as u64,
            width,
            height,
            pipeline_id: pipeline_id.map(ToOwned::to_owned),
        };
        let record = VariantRecord {
            image: image.clone(),
            labels: sample.labels.clone(),
        };

        fs::write(&image_path, &bytes)
            .with_context(|| format!("unable to write '{}'", image_path.display()))?;
        fs::write(&record_path, serde_json::to_string_pretty(&record)?)
            .with_context(|| format!("unable to write '{}'", record_path.display()))?;
        debug!(image_id = %image.id, path = %image_path.display(), "variant persisted");

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_sink_writes_image_and_record() {
        let dir = std::env::temp_dir().join(format!("augment-sink-{}", Uuid::new_v4()));
        let sink = DirSink::create(&dir, 90).unwrap();
        let source = ImageInfo {
            id: "src".into(),
            dataset_id: Some("d1".into()),
            name: "cat.jpg".into(),
            path: "cat.jpg".into(),
            size: 0,
            width: 8,
            height: 6,
            pipeline_id: None,
        };
        let rect = XYWH::from_xywh([r64(0.1), r64(0.1), r64(0.5), r64(0.5)]);
        let sample = Sample {
            id: "out".into(),
            image: RgbImage::new(8, 6),
            labels: vec![Label::new("l1", rect).with_image("out")],
            decisions: vec![],
        };

        let image = sink.persist(Some("p1"), &source, &sample).unwrap();
        assert_eq!(image.name, "augmented-cat.jpg");
        assert_eq!(image.pipeline_id.as_deref(), Some("p1"));
        assert_eq!(image.dataset_id.as_deref(), Some("d1"));
        assert_eq!((image.width, image.height), (8, 6));
        assert!(dir.join("out.jpg").is_file());

        let text = fs::read_to_string(dir.join("out.json")).unwrap();
        let record: VariantRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(record.labels, sample.labels);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let dir = std::env::temp_dir().join(format!("augment-sink-{}", Uuid::new_v4()));
        assert!(DirSink::create(&dir, 0).is_err());
    }
}
