//! Independent samples of a batch pipeline with label decoding.

use crate::{
    codec::LabelCodec,
    common::*,
    pipeline::{Batch, BatchPipeline, Decision},
};

/// One augmented variant of a source image.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The identifier of the output image.
    pub id: String,
    pub image: RgbImage,
    /// Labels whose markers survived, attached to the output image.
    pub labels: Vec<Label>,
    /// The outcome of every operation in chain order.
    pub decisions: Vec<Decision>,
}

impl Sample {
    pub fn size(&self) -> HW<u32> {
        HW::from(self.image.dimensions())
    }

    /// Decisions of the operations that fired for this sample.
    pub fn fired(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|decision| decision.fired())
    }

    /// Encode the output image, e.g. as JPEG or PNG.
    pub fn encode(&self, format: ImageOutputFormat) -> AugmentResult<Vec<u8>> {
        let mut bytes = vec![];
        DynamicImage::ImageRgb8(self.image.clone())
            .write_to(&mut bytes, format)
            .map_err(AugmentError::Encode)?;
        Ok(bytes)
    }
}

/// Drives a pipeline several times over the same input batch.
#[derive(Debug)]
pub struct Sampler<'a> {
    pipeline: &'a BatchPipeline,
    codec: &'a dyn LabelCodec,
}

impl<'a> Sampler<'a> {
    pub fn new(pipeline: &'a BatchPipeline, codec: &'a dyn LabelCodec) -> Self {
        Self { pipeline, codec }
    }

    /// Produce `n` samples from `image` and its `labels`.
    ///
    /// Every sample runs on its own generator seeded from `rng`, so samples
    /// are independent of each other and reproducible given `rng`.
    pub fn sample(
        &self,
        image: &RgbImage,
        labels: &[Label],
        n: usize,
        rng: &mut StdRng,
    ) -> AugmentResult<Vec<Sample>> {
        if n == 0 {
            return Err(AugmentError::InvalidSampleCount);
        }

        let size = HW::from(image.dimensions());
        let markers: Vec<_> = labels
            .iter()
            .map(|label| self.codec.encode(&size, label))
            .try_collect()?;
        let batch = Batch::new(image.clone(), markers)?;

        (0..n)
            .map(|index| {
                let mut rng = StdRng::seed_from_u64(rng.gen());
                let sample = self.sample_once(batch.clone(), labels, &mut rng)?;
                debug!(
                    index,
                    id = %sample.id,
                    labels = sample.labels.len(),
                    vanished = labels.len() - sample.labels.len(),
                    "sample produced"
                );
                Ok(sample)
            })
            .collect()
    }

    fn sample_once(
        &self,
        batch: Batch,
        labels: &[Label],
        rng: &mut StdRng,
    ) -> AugmentResult<Sample> {
        let id = random_id(rng);
        let (output, decisions) = self.pipeline.apply(batch, rng)?;
        let Batch { image, markers } = output;

        let labels: Vec<_> = markers
            .iter()
            .zip_eq(labels)
            .filter_map(|(marker, source)| {
                let label_id = random_id(rng);
                let label = self.codec.decode(marker, source, label_id)?;
                Some(label.with_image(id.clone()))
            })
            .collect();

        Ok(Sample {
            id,
            image,
            labels,
            decisions,
        })
    }
}
