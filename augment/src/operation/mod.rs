//! The catalogue of raster operations.
//!
//! An [Operation] is the value object supplied by the caller. It is built into
//! a [RasterOp], which draws one [DrawnParameters] per sample and applies it to
//! every raster of a batch.

mod distortion;
mod geometric;
mod photometric;

pub use distortion::*;
pub use geometric::*;
pub use photometric::*;

use crate::common::*;
use serde_json::{Map, Value};

/// The closed set of operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Rotate,
    FlipRandom,
    Skew,
    CropRandom,
    Shear,
    RandomDistortion,
    GaussianDistortion,
    RandomBrightness,
    RandomColor,
    RandomContrast,
    HistogramEqualisation,
    Invert,
    Greyscale,
    BlackAndWhite,
}

/// A parameterized, probabilistic operation as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default = "new_operation_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub probability: f64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn new_operation_id() -> String {
    Uuid::new_v4().to_string()
}

impl Operation {
    pub fn new(kind: OperationType, probability: f64) -> Self {
        Self {
            id: new_operation_id(),
            kind,
            probability,
            properties: Map::new(),
        }
    }

    /// Set a type-specific property.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }

    /// Validate the properties and build the raster operation.
    pub fn build(&self) -> Result<Box<dyn RasterOp>> {
        let Self {
            kind, probability, ..
        } = *self;
        ensure!(
            probability.is_finite() && (0.0..=1.0).contains(&probability),
            "probability must be in range 0.0..=1.0, but get {}",
            probability
        );

        let op: Box<dyn RasterOp> = match kind {
            OperationType::Rotate => Box::new(self.parse_properties::<RotateInit>()?.build()?),
            OperationType::FlipRandom => Box::new(self.parse_properties::<FlipRandomInit>()?.build()),
            OperationType::Skew => Box::new(self.parse_properties::<SkewInit>()?.build()?),
            OperationType::CropRandom => Box::new(self.parse_properties::<CropRandomInit>()?.build()?),
            OperationType::Shear => Box::new(self.parse_properties::<ShearInit>()?.build()?),
            OperationType::RandomDistortion => {
                Box::new(self.parse_properties::<RandomDistortionInit>()?.build()?)
            }
            OperationType::GaussianDistortion => {
                Box::new(self.parse_properties::<GaussianDistortionInit>()?.build()?)
            }
            OperationType::RandomBrightness => Box::new(
                self.parse_properties::<EnhanceInit>()?
                    .build(EnhanceKind::Brightness)?,
            ),
            OperationType::RandomColor => {
                Box::new(self.parse_properties::<EnhanceInit>()?.build(EnhanceKind::Color)?)
            }
            OperationType::RandomContrast => {
                Box::new(self.parse_properties::<EnhanceInit>()?.build(EnhanceKind::Contrast)?)
            }
            OperationType::HistogramEqualisation => {
                self.parse_properties::<NoProperties>()?;
                Box::new(HistogramEqualisation)
            }
            OperationType::Invert => {
                self.parse_properties::<NoProperties>()?;
                Box::new(Invert)
            }
            OperationType::Greyscale => {
                self.parse_properties::<NoProperties>()?;
                Box::new(Greyscale)
            }
            OperationType::BlackAndWhite => {
                Box::new(self.parse_properties::<BlackAndWhiteInit>()?.build())
            }
        };

        Ok(op)
    }

    fn parse_properties<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = Value::Object(self.properties.clone());
        let props = serde_json::from_value(value)
            .with_context(|| format!("invalid properties for '{:?}'", self.kind))?;
        Ok(props)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoProperties {}

/// Whether an operation moves geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformClass {
    /// Applied identically to the image and to every marker.
    Geometric,
    /// Changes pixel values only. Markers pass through unchanged.
    Photometric,
}

/// Which member of a batch a raster is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterRole {
    Image,
    Marker,
}

/// The randomized parameters drawn once per operation per sample.
///
/// The same value is handed to the transform of every raster in the batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawnParameters {
    Rotate {
        degrees: f32,
        zoom: f32,
    },
    Flip {
        axis: FlipAxis,
    },
    Skew {
        from: [(f32, f32); 4],
        to: [(f32, f32); 4],
    },
    Crop {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },
    Shear {
        degrees: f32,
        axis: ShearAxis,
    },
    Distortion(Arc<DisplacementGrid>),
    Enhance {
        factor: f32,
    },
    Unit,
}

/// A uniform raster transform.
pub trait RasterOp: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn class(&self) -> TransformClass;

    /// Draw the parameters for one sample of a batch whose rasters have `size`.
    fn draw(&self, rng: &mut StdRng, size: &HW<u32>) -> DrawnParameters;

    /// Transform one raster with previously drawn parameters.
    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage>;

    /// Transform one batch member according to its role.
    fn apply_to(
        &self,
        raster: RgbImage,
        role: RasterRole,
        params: &DrawnParameters,
    ) -> Result<RgbImage> {
        match (self.class(), role) {
            (TransformClass::Photometric, RasterRole::Marker) => Ok(raster),
            _ => self.apply(&raster, params),
        }
    }
}

/// Draw uniformly from `low..=high`, returning `low` for an empty range.
pub(crate) fn uniform<R>(rng: &mut R, low: f64, high: f64) -> f64
where
    R: Rng,
{
    if low < high {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

pub(crate) fn unexpected_parameters(op: &dyn RasterOp, params: &DrawnParameters) -> anyhow::Error {
    format_err!("'{}' cannot apply parameters {:?}", op.name(), params)
}
