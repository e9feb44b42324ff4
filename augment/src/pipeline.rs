//! Congruent application of an operation chain to a batch of rasters.

use crate::{
    common::*,
    operation::{DrawnParameters, Operation, RasterOp, RasterRole},
};

/// An image together with the markers of its labels.
///
/// All rasters in a batch share the same dimensions at every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub image: RgbImage,
    pub markers: Vec<RgbImage>,
}

impl Batch {
    pub fn new(image: RgbImage, markers: Vec<RgbImage>) -> AugmentResult<Self> {
        let dims = image.dimensions();
        if let Some(marker) = markers.iter().find(|marker| marker.dimensions() != dims) {
            let (w, h) = marker.dimensions();
            return Err(AugmentError::InvalidLabel {
                reason: format!(
                    "marker of size {}x{} does not match the {}x{} image",
                    w, h, dims.0, dims.1
                ),
            });
        }
        Ok(Self { image, markers })
    }

    pub fn size(&self) -> HW<u32> {
        HW::from(self.image.dimensions())
    }
}

/// The outcome of one operation for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub operation_id: String,
    pub operation: &'static str,
    pub roll: f64,
    /// The parameters shared by every raster if the operation fired.
    pub params: Option<DrawnParameters>,
}

impl Decision {
    pub fn fired(&self) -> bool {
        self.params.is_some()
    }
}

#[derive(Debug)]
struct Stage {
    id: String,
    probability: f64,
    op: Box<dyn RasterOp>,
}

/// A validated operation chain.
#[derive(Debug)]
pub struct BatchPipeline {
    stages: Vec<Stage>,
}

impl BatchPipeline {
    /// Validate and build every operation of the chain.
    pub fn new(operations: &[Operation]) -> AugmentResult<Self> {
        if operations.is_empty() {
            return Err(AugmentError::invalid_chain("the operation chain is empty"));
        }

        let stages: Vec<_> = operations
            .iter()
            .enumerate()
            .map(|(index, operation)| -> AugmentResult<_> {
                let op = operation.build().map_err(|err| {
                    AugmentError::invalid_chain(format!(
                        "operation {} ('{}'): {:#}",
                        index, operation.id, err
                    ))
                })?;
                Ok(Stage {
                    id: operation.id.clone(),
                    probability: operation.probability,
                    op,
                })
            })
            .try_collect()?;

        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the chain once over `batch`.
    ///
    /// Each operation rolls once. If it fires, its parameters are drawn once
    /// and handed to the transform of every raster in the batch.
    pub fn apply(&self, batch: Batch, rng: &mut StdRng) -> AugmentResult<(Batch, Vec<Decision>)> {
        let mut batch = batch;
        let mut decisions = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let Stage { id, probability, op } = stage;
            let roll: f64 = rng.gen();
            let fired = *probability > 0.0 && roll <= *probability;

            let params = if fired {
                let params = op.draw(rng, &batch.size());
                trace!(operation = op.name(), ?params, "operation fired");
                batch = Self::apply_stage(op.as_ref(), batch, &params)?;
                Some(params)
            } else {
                None
            };

            decisions.push(Decision {
                operation_id: id.clone(),
                operation: op.name(),
                roll,
                params,
            });
        }

        Ok((batch, decisions))
    }

    fn apply_stage(op: &dyn RasterOp, batch: Batch, params: &DrawnParameters) -> AugmentResult<Batch> {
        let to_error = |err: anyhow::Error| AugmentError::Transform {
            operation: op.name(),
            reason: format!("{:#}", err),
        };
        let Batch { image, markers } = batch;

        let image = op
            .apply_to(image, RasterRole::Image, params)
            .map_err(to_error)?;
        let markers: Vec<_> = markers
            .into_iter()
            .map(|marker| op.apply_to(marker, RasterRole::Marker, params))
            .try_collect()
            .map_err(to_error)?;

        Batch::new(image, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationType;

    #[test]
    fn empty_chain_is_rejected() {
        let result = BatchPipeline::new(&[]);
        assert!(matches!(
            result,
            Err(AugmentError::InvalidOperationChain { .. })
        ));
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let ops = [
            Operation::new(OperationType::FlipRandom, 0.5),
            Operation::new(OperationType::Rotate, 1.2),
        ];
        let err = BatchPipeline::new(&ops).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn image_and_marker_move_together() {
        let ops = [Operation::new(OperationType::Rotate, 1.0)
            .with("max_angle", 25)
            .with("zoom_to_fill", false)];
        let pipeline = BatchPipeline::new(&ops).unwrap();
        let white = RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]));
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..5 {
            let batch = Batch::new(white.clone(), vec![white.clone(), white.clone()]).unwrap();
            let (output, decisions) = pipeline.apply(batch, &mut rng).unwrap();
            assert!(decisions[0].fired());
            assert_eq!(output.markers.len(), 2);
            assert!(output.markers.iter().all(|marker| marker == &output.image));
            assert_ne!(output.image, white);
        }
    }

    #[test]
    fn zero_probability_never_fires() {
        let ops = [Operation::new(OperationType::Invert, 0.0)];
        let pipeline = BatchPipeline::new(&ops).unwrap();
        let image = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..50 {
            let batch = Batch::new(image.clone(), vec![]).unwrap();
            let (output, decisions) = pipeline.apply(batch, &mut rng).unwrap();
            assert!(!decisions[0].fired());
            assert_eq!(output.image, image);
        }
    }

    #[test]
    fn crop_resizes_every_member() {
        let ops = [Operation::new(OperationType::CropRandom, 1.0).with("percentage_area", 0.5)];
        let pipeline = BatchPipeline::new(&ops).unwrap();
        let batch = Batch::new(RgbImage::new(40, 20), vec![RgbImage::new(40, 20)]).unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        let (output, _) = pipeline.apply(batch, &mut rng).unwrap();
        assert_eq!(output.image.dimensions(), (20, 10));
        assert_eq!(output.markers[0].dimensions(), (20, 10));
    }

    #[test]
    fn mismatched_markers_are_rejected() {
        let result = Batch::new(RgbImage::new(10, 10), vec![RgbImage::new(10, 9)]);
        assert!(result.is_err());
    }
}
