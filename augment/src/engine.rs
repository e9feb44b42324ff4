//! The public entry point of the augmentation engine.

use crate::{
    codec::{LabelCodec, MarkerCodec, DEFAULT_MARKER_THRESHOLD},
    common::*,
    operation::Operation,
    pipeline::BatchPipeline,
    sampler::{Sample, Sampler},
    source::ImageSource,
    store::AnnotationStore,
};

/// The number of preview samples for `image`: four for landscape images, three otherwise.
pub fn preview_sample_count(image: &ImageInfo) -> usize {
    if image.is_landscape() {
        4
    } else {
        3
    }
}

/// Augmentation engine initializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AugmentationEngineInit {
    /// Makes every call reproducible if set.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub marker_threshold: Option<u8>,
}

impl AugmentationEngineInit {
    pub fn build<S>(self, source: S) -> AugmentationEngine<S>
    where
        S: ImageSource,
    {
        let Self {
            seed,
            marker_threshold,
        } = self;
        let threshold = marker_threshold.unwrap_or(DEFAULT_MARKER_THRESHOLD);

        AugmentationEngine {
            source,
            codec: Box::new(MarkerCodec::new(threshold)),
            seed,
        }
    }
}

/// Produces augmented variants of annotated images.
///
/// The engine holds no mutable state. Every call owns its buffers, so an
/// engine can be shared between threads.
#[derive(Debug)]
pub struct AugmentationEngine<S>
where
    S: ImageSource,
{
    source: S,
    codec: Box<dyn LabelCodec>,
    seed: Option<u64>,
}

impl<S> AugmentationEngine<S>
where
    S: ImageSource,
{
    /// Replace the label codec.
    pub fn with_codec<C>(mut self, codec: C) -> Self
    where
        C: LabelCodec + 'static,
    {
        self.codec = Box::new(codec);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn new_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Produce `n` variants of `image` and its `labels`.
    pub fn run(
        &self,
        image: &ImageInfo,
        labels: &[Label],
        operations: &[Operation],
        n: usize,
    ) -> AugmentResult<Vec<Sample>> {
        let mut rng = self.new_rng();
        self.run_with_rng(image, labels, operations, n, &mut rng)
    }

    /// Produce the preview variants of `image`.
    pub fn preview(
        &self,
        image: &ImageInfo,
        labels: &[Label],
        operations: &[Operation],
    ) -> AugmentResult<Vec<Sample>> {
        self.run(image, labels, operations, preview_sample_count(image))
    }

    /// Look up the image and its labels in `store` and produce `n` variants.
    pub fn run_by_id(
        &self,
        store: &dyn AnnotationStore,
        image_id: &str,
        operations: &[Operation],
        n: usize,
    ) -> AugmentResult<Vec<Sample>> {
        let image = store
            .find_image(image_id)
            .ok_or_else(|| AugmentError::ImageNotFound {
                image_id: image_id.to_owned(),
            })?;
        let labels = store.find_labels(image_id);
        self.run(&image, &labels, operations, n)
    }

    /// Produce `n` variants drawing randomness from `rng`.
    ///
    /// The sample count, the chain and the labels are validated before any
    /// pixel data is fetched.
    #[instrument(skip_all, fields(image_id = %image.id, labels = labels.len(), n = n))]
    pub fn run_with_rng(
        &self,
        image: &ImageInfo,
        labels: &[Label],
        operations: &[Operation],
        n: usize,
        rng: &mut StdRng,
    ) -> AugmentResult<Vec<Sample>> {
        if n == 0 {
            return Err(AugmentError::InvalidSampleCount);
        }
        let pipeline = BatchPipeline::new(operations)?;
        labels.iter().try_for_each(|label| {
            label.validate().map_err(|err| AugmentError::InvalidLabel {
                reason: format!("{:#}", err),
            })
        })?;

        let raster = self.fetch(image)?;
        let samples = Sampler::new(&pipeline, self.codec.as_ref()).sample(&raster, labels, n, rng)?;
        debug!(samples = samples.len(), "augmentation finished");

        Ok(samples)
    }

    /// Fetch and decode the pixel data of `image`.
    pub fn fetch(&self, image: &ImageInfo) -> AugmentResult<RgbImage> {
        let bytes = self
            .source
            .fetch(image)
            .map_err(|error| AugmentError::SourceUnavailable {
                image_id: image.id.clone(),
                error,
            })?;
        let raster = image::load_from_memory(&bytes)
            .map_err(|error| AugmentError::DecodeFailure {
                image_id: image.id.clone(),
                error,
            })?
            .to_rgb8();

        let (width, height) = raster.dimensions();
        if (width, height) != (image.width, image.height) {
            warn!(
                image_id = %image.id,
                "image is recorded as {}x{} but decodes to {}x{}",
                image.width,
                image.height,
                width,
                height
            );
        }

        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_count_follows_orientation() {
        let mut image = ImageInfo {
            id: "i".into(),
            dataset_id: None,
            name: String::new(),
            path: String::new(),
            size: 0,
            width: 200,
            height: 100,
            pipeline_id: None,
        };
        assert_eq!(preview_sample_count(&image), 4);
        image.width = 100;
        assert_eq!(preview_sample_count(&image), 3);
        image.width = 50;
        assert_eq!(preview_sample_count(&image), 3);
    }
}
