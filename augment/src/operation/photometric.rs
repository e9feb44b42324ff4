//! Operations that change pixel values without moving geometry.

use super::{uniform, unexpected_parameters, DrawnParameters, RasterOp, TransformClass};
use crate::common::*;
use image::imageops;
use imageproc::contrast::{equalize_histogram, threshold};

fn luma(pixel: &Rgb<u8>) -> f32 {
    let [r, g, b] = pixel.0;
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

// enhance

fn default_factor() -> f64 {
    1.0
}

/// The quantity adjusted by an [Enhance] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhanceKind {
    Brightness,
    Color,
    Contrast,
}

/// Initializer shared by the brightness, color and contrast operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnhanceInit {
    #[serde(default = "default_factor")]
    pub min_factor: f64,
    #[serde(default = "default_factor")]
    pub max_factor: f64,
}

impl EnhanceInit {
    pub fn build(self, kind: EnhanceKind) -> Result<Enhance> {
        let Self {
            min_factor,
            max_factor,
        } = self;
        ensure!(
            min_factor.is_finite() && max_factor.is_finite(),
            "min_factor and max_factor must be finite"
        );
        ensure!(
            min_factor > 0.0 && min_factor <= max_factor,
            "0 < min_factor <= max_factor must hold, but get min_factor={} max_factor={}",
            min_factor,
            max_factor
        );
        Ok(Enhance {
            kind,
            min_factor,
            max_factor,
        })
    }
}

/// Blend the image with a degenerate version of itself by a random factor.
///
/// A factor of 1 keeps the image. Brightness blends with black, color with
/// the greyscale image and contrast with the mean grey level.
#[derive(Debug, Clone)]
pub struct Enhance {
    kind: EnhanceKind,
    min_factor: f64,
    max_factor: f64,
}

impl Enhance {
    fn enhance(&self, raster: &RgbImage, factor: f32) -> RgbImage {
        let mut output = raster.clone();

        match self.kind {
            EnhanceKind::Brightness => {
                output.pixels_mut().for_each(|pixel| {
                    pixel.0.iter_mut().for_each(|c| *c = clamp_u8(*c as f32 * factor));
                });
            }
            EnhanceKind::Color => {
                output.pixels_mut().for_each(|pixel| {
                    let grey = luma(pixel);
                    pixel
                        .0
                        .iter_mut()
                        .for_each(|c| *c = clamp_u8(grey + (*c as f32 - grey) * factor));
                });
            }
            EnhanceKind::Contrast => {
                let count = (raster.width() as u64 * raster.height() as u64).max(1);
                let mean = raster.pixels().map(|p| luma(p) as f64).sum::<f64>() / count as f64;
                let mean = mean.round() as f32;
                output.pixels_mut().for_each(|pixel| {
                    pixel
                        .0
                        .iter_mut()
                        .for_each(|c| *c = clamp_u8(mean + (*c as f32 - mean) * factor));
                });
            }
        }

        output
    }
}

impl RasterOp for Enhance {
    fn name(&self) -> &'static str {
        match self.kind {
            EnhanceKind::Brightness => "random_brightness",
            EnhanceKind::Color => "random_color",
            EnhanceKind::Contrast => "random_contrast",
        }
    }

    fn class(&self) -> TransformClass {
        TransformClass::Photometric
    }

    fn draw(&self, rng: &mut StdRng, _size: &HW<u32>) -> DrawnParameters {
        let factor = uniform(rng, self.min_factor, self.max_factor) as f32;
        DrawnParameters::Enhance { factor }
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        match *params {
            DrawnParameters::Enhance { factor } => Ok(self.enhance(raster, factor)),
            _ => Err(unexpected_parameters(self, params)),
        }
    }
}

// parameterless operations

macro_rules! unit_op {
    ($ty:ident, $name:literal, $doc:literal, $apply:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $ty;

        impl RasterOp for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn class(&self) -> TransformClass {
                TransformClass::Photometric
            }

            fn draw(&self, _rng: &mut StdRng, _size: &HW<u32>) -> DrawnParameters {
                DrawnParameters::Unit
            }

            fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
                match params {
                    DrawnParameters::Unit => {
                        let apply: fn(&RgbImage) -> RgbImage = $apply;
                        Ok(apply(raster))
                    }
                    _ => Err(unexpected_parameters(self, params)),
                }
            }
        }
    };
}

unit_op!(
    HistogramEqualisation,
    "histogram_equalisation",
    "Equalize the histogram of every channel independently.",
    equalize_channels
);

unit_op!(Invert, "invert", "Negate every channel.", |raster| {
    let mut output = raster.clone();
    imageops::invert(&mut output);
    output
});

unit_op!(
    Greyscale,
    "greyscale",
    "Replace colors by their luma, keeping three channels.",
    |raster| DynamicImage::ImageLuma8(imageops::grayscale(raster)).to_rgb8()
);

fn equalize_channels(raster: &RgbImage) -> RgbImage {
    let (w, h) = raster.dimensions();
    let channels: Vec<GrayImage> = (0..3)
        .map(|index| {
            let channel = GrayImage::from_fn(w, h, |x, y| Luma([raster.get_pixel(x, y)[index]]));
            equalize_histogram(&channel)
        })
        .collect();

    RgbImage::from_fn(w, h, |x, y| {
        Rgb([
            channels[0].get_pixel(x, y)[0],
            channels[1].get_pixel(x, y)[0],
            channels[2].get_pixel(x, y)[0],
        ])
    })
}

// black and white

fn default_threshold() -> u8 {
    128
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlackAndWhiteInit {
    /// Grey levels above this value turn white.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

impl BlackAndWhiteInit {
    pub fn build(self) -> BlackAndWhite {
        BlackAndWhite {
            threshold: self.threshold,
        }
    }
}

/// Binarize the greyscale image.
#[derive(Debug, Clone)]
pub struct BlackAndWhite {
    threshold: u8,
}

impl RasterOp for BlackAndWhite {
    fn name(&self) -> &'static str {
        "black_and_white"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Photometric
    }

    fn draw(&self, _rng: &mut StdRng, _size: &HW<u32>) -> DrawnParameters {
        DrawnParameters::Unit
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        match params {
            DrawnParameters::Unit => {
                let grey = imageops::grayscale(raster);
                let binary = threshold(&grey, self.threshold);
                Ok(DynamicImage::ImageLuma8(binary).to_rgb8())
            }
            _ => Err(unexpected_parameters(self, params)),
        }
    }
}
