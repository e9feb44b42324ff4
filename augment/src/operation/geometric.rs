//! Operations that move geometry: rotate, flip, skew, crop and shear.

use super::{uniform, unexpected_parameters, DrawnParameters, RasterOp, TransformClass};
use crate::common::*;
use image::imageops;

const FILL: Rgb<u8> = Rgb([0, 0, 0]);

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_half() -> f64 {
    0.5
}

// rotate

/// Rotation initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotateInit {
    /// The maximum counter-clockwise rotation in degrees.
    #[serde(default)]
    pub max_left_rotation: Option<f64>,
    /// The maximum clockwise rotation in degrees.
    #[serde(default)]
    pub max_right_rotation: Option<f64>,
    /// Shorthand for equal left and right limits.
    #[serde(default)]
    pub max_angle: Option<f64>,
    /// Zoom about the center so that the rotated frame leaves no empty corners.
    #[serde(default = "default_true")]
    pub zoom_to_fill: bool,
}

impl RotateInit {
    pub fn build(self) -> Result<Rotate> {
        let Self {
            max_left_rotation,
            max_right_rotation,
            max_angle,
            zoom_to_fill,
        } = self;

        let max_left = max_left_rotation.or(max_angle).unwrap_or(0.0);
        let max_right = max_right_rotation.or(max_angle).unwrap_or(0.0);
        ensure!(
            (0.0..=180.0).contains(&max_left),
            "max_left_rotation must be in range 0..=180"
        );
        ensure!(
            (0.0..=180.0).contains(&max_right),
            "max_right_rotation must be in range 0..=180"
        );

        Ok(Rotate {
            max_left,
            max_right,
            zoom_to_fill,
        })
    }
}

/// Random rotation about the image center.
#[derive(Debug, Clone)]
pub struct Rotate {
    max_left: f64,
    max_right: f64,
    zoom_to_fill: bool,
}

/// The smallest zoom that covers the whole frame after rotating by `degrees`.
fn fill_zoom(degrees: f32, size: &HW<u32>) -> f32 {
    let radians = degrees.to_radians();
    let cos = radians.cos().abs();
    let sin = radians.sin().abs();
    let w = size.w() as f32;
    let h = size.h() as f32;

    ((w * cos + h * sin) / w).max((w * sin + h * cos) / h)
}

impl RasterOp for Rotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, size: &HW<u32>) -> DrawnParameters {
        let degrees = uniform(rng, -self.max_left, self.max_right) as f32;
        let zoom = if self.zoom_to_fill && degrees != 0.0 {
            fill_zoom(degrees, size)
        } else {
            1.0
        };
        DrawnParameters::Rotate { degrees, zoom }
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        let (degrees, zoom) = match *params {
            DrawnParameters::Rotate { degrees, zoom } => (degrees, zoom),
            _ => return Err(unexpected_parameters(self, params)),
        };
        if degrees == 0.0 && zoom == 1.0 {
            return Ok(raster.clone());
        }

        let (w, h) = raster.dimensions();
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let projection = Projection::translate(cx, cy)
            * Projection::scale(zoom, zoom)
            * Projection::rotate(degrees.to_radians())
            * Projection::translate(-cx, -cy);

        Ok(warp(raster, &projection, Interpolation::Bilinear, FILL))
    }
}

// flip

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipAxis {
    LeftRight,
    TopBottom,
}

/// Flip initializer. The operation has no properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlipRandomInit {}

impl FlipRandomInit {
    pub fn build(self) -> FlipRandom {
        FlipRandom
    }
}

/// Mirror along an axis drawn per sample.
#[derive(Debug, Clone)]
pub struct FlipRandom;

impl RasterOp for FlipRandom {
    fn name(&self) -> &'static str {
        "flip_random"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, _size: &HW<u32>) -> DrawnParameters {
        let axis = if rng.gen::<bool>() {
            FlipAxis::LeftRight
        } else {
            FlipAxis::TopBottom
        };
        DrawnParameters::Flip { axis }
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        let output = match *params {
            DrawnParameters::Flip {
                axis: FlipAxis::LeftRight,
            } => imageops::flip_horizontal(raster),
            DrawnParameters::Flip {
                axis: FlipAxis::TopBottom,
            } => imageops::flip_vertical(raster),
            _ => return Err(unexpected_parameters(self, params)),
        };
        Ok(output)
    }
}

// skew

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkewType {
    /// Tilt one of the four sides.
    Tilt,
    TiltLeftRight,
    TiltTopBottom,
    /// Pull one corner towards the center.
    Corner,
    /// Either a tilt or a corner skew.
    Random,
}

impl Default for SkewType {
    fn default() -> Self {
        Self::Random
    }
}

/// Perspective skew initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkewInit {
    #[serde(default)]
    pub skew_type: SkewType,
    /// The skew strength in range (0, 1].
    #[serde(default = "default_one")]
    pub magnitude: f64,
}

impl SkewInit {
    pub fn build(self) -> Result<Skew> {
        let Self {
            skew_type,
            magnitude,
        } = self;
        ensure!(
            magnitude > 0.0 && magnitude <= 1.0,
            "magnitude must be in range (0, 1], but get {}",
            magnitude
        );
        Ok(Skew {
            skew_type,
            magnitude,
        })
    }
}

/// Random perspective skew.
#[derive(Debug, Clone)]
pub struct Skew {
    skew_type: SkewType,
    magnitude: f64,
}

impl RasterOp for Skew {
    fn name(&self) -> &'static str {
        "skew"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, size: &HW<u32>) -> DrawnParameters {
        let w = size.w() as f32;
        let h = size.h() as f32;
        let from = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let mut to = from;

        // a side shrinks to at most half of its length
        let dx = uniform(rng, 0.0, self.magnitude * w as f64 / 4.0) as f32;
        let dy = uniform(rng, 0.0, self.magnitude * h as f64 / 4.0) as f32;

        let skew_type = match self.skew_type {
            SkewType::Random => {
                if rng.gen::<bool>() {
                    SkewType::Tilt
                } else {
                    SkewType::Corner
                }
            }
            skew_type => skew_type,
        };

        // sides are numbered left, right, top, bottom
        let side = match skew_type {
            SkewType::Tilt => Some(rng.gen_range(0..4)),
            SkewType::TiltLeftRight => Some(rng.gen_range(0..2)),
            SkewType::TiltTopBottom => Some(rng.gen_range(2..4)),
            SkewType::Corner | SkewType::Random => None,
        };

        match side {
            Some(0) => {
                to[0].1 += dy;
                to[3].1 -= dy;
            }
            Some(1) => {
                to[1].1 += dy;
                to[2].1 -= dy;
            }
            Some(2) => {
                to[0].0 += dx;
                to[1].0 -= dx;
            }
            Some(_) => {
                to[3].0 += dx;
                to[2].0 -= dx;
            }
            None => {
                let corner = rng.gen_range(0..4);
                let (sx, sy) = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)][corner];
                to[corner].0 += sx * dx;
                to[corner].1 += sy * dy;
            }
        }

        DrawnParameters::Skew { from, to }
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        let (from, to) = match *params {
            DrawnParameters::Skew { from, to } => (from, to),
            _ => return Err(unexpected_parameters(self, params)),
        };
        if from == to {
            return Ok(raster.clone());
        }

        let projection = perspective_matrix(from, to)
            .and_then(Projection::from_matrix)
            .ok_or_else(|| format_err!("degenerate skew from {:?} to {:?}", from, to))?;
        Ok(warp(raster, &projection, Interpolation::Bilinear, FILL))
    }
}

/// Solve the homography mapping each point of `from` onto the same index of `to`.
///
/// Returns the row-major 3x3 matrix, or `None` if three of the points are collinear.
fn perspective_matrix(from: [(f32, f32); 4], to: [(f32, f32); 4]) -> Option<[f32; 9]> {
    // augmented 8x9 system in the unknowns [a, b, c, d, e, f, g, h], with i = 1
    let mut system = [[0f64; 9]; 8];
    for (index, (&(x, y), &(u, v))) in from.iter().zip(to.iter()).enumerate() {
        let (x, y, u, v) = (x as f64, y as f64, u as f64, v as f64);
        system[index * 2] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
        system[index * 2 + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
    }

    // Gauss-Jordan elimination with partial pivoting
    for col in 0..8 {
        let pivot = (col..8).max_by(|&lhs, &rhs| {
            system[lhs][col]
                .abs()
                .partial_cmp(&system[rhs][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if system[pivot][col].abs() < 1e-9 {
            return None;
        }
        system.swap(col, pivot);

        let lead = system[col];
        for (row, equation) in system.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = equation[col] / lead[col];
            if factor != 0.0 {
                equation
                    .iter_mut()
                    .zip(lead.iter())
                    .for_each(|(value, lead)| *value -= factor * lead);
            }
        }
    }

    let mut matrix = [1f32; 9];
    for (index, equation) in system.iter().enumerate() {
        let value = equation[8] / equation[index];
        if !value.is_finite() {
            return None;
        }
        matrix[index] = value as f32;
    }
    Some(matrix)
}

// crop

/// Where the crop window is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropAnchor {
    Random,
    TopLeft,
    Centre,
}

impl Default for CropAnchor {
    fn default() -> Self {
        Self::Random
    }
}

/// Random crop initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropRandomInit {
    /// The fraction of the width and of the height kept by the crop.
    #[serde(default = "default_half")]
    pub percentage_area: f64,
    /// Draw the kept fraction from `0.1..=percentage_area` per sample.
    #[serde(default)]
    pub randomise_percentage_area: bool,
    #[serde(default)]
    pub anchor: CropAnchor,
}

impl CropRandomInit {
    pub fn build(self) -> Result<CropRandom> {
        let Self {
            percentage_area,
            randomise_percentage_area,
            anchor,
        } = self;
        ensure!(
            percentage_area > 0.0 && percentage_area <= 1.0,
            "percentage_area must be in range (0, 1], but get {}",
            percentage_area
        );
        Ok(CropRandom {
            percentage_area,
            randomise_percentage_area,
            anchor,
        })
    }
}

/// Crop a window of the image. The output is smaller than the input.
#[derive(Debug, Clone)]
pub struct CropRandom {
    percentage_area: f64,
    randomise_percentage_area: bool,
    anchor: CropAnchor,
}

impl RasterOp for CropRandom {
    fn name(&self) -> &'static str {
        "crop_random"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, size: &HW<u32>) -> DrawnParameters {
        let fraction = if self.randomise_percentage_area {
            uniform(rng, 0.1_f64.min(self.percentage_area), self.percentage_area)
        } else {
            self.percentage_area
        };
        let (w, h) = (size.w(), size.h());
        let width = ((w as f64 * fraction) as u32).clamp(1, w.max(1));
        let height = ((h as f64 * fraction) as u32).clamp(1, h.max(1));

        let (left, top) = match self.anchor {
            CropAnchor::TopLeft => (0, 0),
            CropAnchor::Centre => ((w - width) / 2, (h - height) / 2),
            CropAnchor::Random => (
                rng.gen_range(0..=(w - width)),
                rng.gen_range(0..=(h - height)),
            ),
        };

        DrawnParameters::Crop {
            left,
            top,
            width,
            height,
        }
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        let (left, top, width, height) = match *params {
            DrawnParameters::Crop {
                left,
                top,
                width,
                height,
            } => (left, top, width, height),
            _ => return Err(unexpected_parameters(self, params)),
        };
        let (w, h) = raster.dimensions();
        ensure!(
            left + width <= w && top + height <= h,
            "crop window {}x{}+{}+{} exceeds the {}x{} raster",
            width,
            height,
            left,
            top,
            w,
            h
        );

        Ok(imageops::crop_imm(raster, left, top, width, height).to_image())
    }
}

// shear

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShearAxis {
    Horizontal,
    Vertical,
}

/// Shear initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShearInit {
    /// The maximum shear to the left in degrees.
    #[serde(default)]
    pub max_shear_left: f64,
    /// The maximum shear to the right in degrees.
    #[serde(default)]
    pub max_shear_right: f64,
}

impl ShearInit {
    pub fn build(self) -> Result<Shear> {
        let Self {
            max_shear_left,
            max_shear_right,
        } = self;
        ensure!(
            (0.0..=45.0).contains(&max_shear_left),
            "max_shear_left must be in range 0..=45"
        );
        ensure!(
            (0.0..=45.0).contains(&max_shear_right),
            "max_shear_right must be in range 0..=45"
        );
        Ok(Shear {
            max_shear_left,
            max_shear_right,
        })
    }
}

/// Random shear about the image center along an axis drawn per sample.
#[derive(Debug, Clone)]
pub struct Shear {
    max_shear_left: f64,
    max_shear_right: f64,
}

impl RasterOp for Shear {
    fn name(&self) -> &'static str {
        "shear"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, _size: &HW<u32>) -> DrawnParameters {
        let degrees = uniform(rng, -self.max_shear_left, self.max_shear_right) as f32;
        let axis = if rng.gen::<bool>() {
            ShearAxis::Horizontal
        } else {
            ShearAxis::Vertical
        };
        DrawnParameters::Shear { degrees, axis }
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        let (degrees, axis) = match *params {
            DrawnParameters::Shear { degrees, axis } => (degrees, axis),
            _ => return Err(unexpected_parameters(self, params)),
        };
        if degrees == 0.0 {
            return Ok(raster.clone());
        }

        let (w, h) = raster.dimensions();
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let k = degrees.to_radians().tan();
        let matrix = match axis {
            ShearAxis::Horizontal => [1.0, k, -k * cy, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            ShearAxis::Vertical => [1.0, 0.0, 0.0, k, 1.0, -k * cx, 0.0, 0.0, 1.0],
        };
        let projection = Projection::from_matrix(matrix)
            .ok_or_else(|| format_err!("shear by {} degrees is not invertible", degrees))?;

        Ok(warp(raster, &projection, Interpolation::Bilinear, FILL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128]))
    }

    #[test]
    fn zero_rotation_is_identity() {
        let rotate = RotateInit {
            max_left_rotation: None,
            max_right_rotation: None,
            max_angle: Some(0.0),
            zoom_to_fill: true,
        }
        .build()
        .unwrap();
        let image = gradient(40, 30);
        let mut rng = StdRng::seed_from_u64(1);
        let params = rotate.draw(&mut rng, &HW::from_hw([30, 40]));
        assert_eq!(
            params,
            DrawnParameters::Rotate {
                degrees: 0.0,
                zoom: 1.0
            }
        );
        assert_eq!(rotate.apply(&image, &params).unwrap(), image);
    }

    #[test]
    fn fill_zoom_covers_frame() {
        let size = HW::from_hw([100, 100]);
        assert!((fill_zoom(0.0, &size) - 1.0).abs() < 1e-6);
        assert!((fill_zoom(45.0, &size) - 2.0_f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn flip_twice_is_identity() {
        let image = gradient(9, 7);
        let params = DrawnParameters::Flip {
            axis: FlipAxis::LeftRight,
        };
        let once = FlipRandom.apply(&image, &params).unwrap();
        assert_eq!(once.get_pixel(0, 0), image.get_pixel(8, 0));
        assert_eq!(FlipRandom.apply(&once, &params).unwrap(), image);
    }

    #[test]
    fn crop_window_stays_inside() {
        let crop = CropRandomInit {
            percentage_area: 0.3,
            randomise_percentage_area: true,
            anchor: CropAnchor::Random,
        }
        .build()
        .unwrap();
        let size = HW::from_hw([50, 80]);
        let image = gradient(80, 50);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let params = crop.draw(&mut rng, &size);
            let output = crop.apply(&image, &params).unwrap();
            let (w, h) = output.dimensions();
            assert!((1..=24).contains(&w));
            assert!((1..=15).contains(&h));
        }
    }

    #[test]
    fn top_left_crop() {
        let crop = CropRandomInit {
            percentage_area: 0.1,
            randomise_percentage_area: false,
            anchor: CropAnchor::TopLeft,
        }
        .build()
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let params = crop.draw(&mut rng, &HW::from_hw([100, 100]));
        assert_eq!(
            params,
            DrawnParameters::Crop {
                left: 0,
                top: 0,
                width: 10,
                height: 10
            }
        );
    }

    #[test]
    fn skew_keeps_dimensions() {
        let skew = SkewInit {
            skew_type: SkewType::Random,
            magnitude: 0.8,
        }
        .build()
        .unwrap();
        let image = gradient(64, 48);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..30 {
            let params = skew.draw(&mut rng, &HW::from_hw([48, 64]));
            let output = skew.apply(&image, &params).unwrap();
            assert_eq!(output.dimensions(), (64, 48));
        }
    }

    #[test]
    fn perspective_matrix_maps_control_points() {
        let skew = SkewInit {
            skew_type: SkewType::Random,
            magnitude: 1.0,
        }
        .build()
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        for size in [HW::from_hw([48, 64]), HW::from_hw([3000, 4000])] {
            for _ in 0..50 {
                let (from, to) = match skew.draw(&mut rng, &size) {
                    DrawnParameters::Skew { from, to } => (from, to),
                    params => panic!("unexpected parameters {:?}", params),
                };
                let m = perspective_matrix(from, to).unwrap();
                for (&(x, y), &(u, v)) in from.iter().zip(to.iter()) {
                    let z = m[6] * x + m[7] * y + m[8];
                    let px = (m[0] * x + m[1] * y + m[2]) / z;
                    let py = (m[3] * x + m[4] * y + m[5]) / z;
                    let tolerance = size.w() as f32 * 1e-4;
                    assert!((px - u).abs() < tolerance, "{} vs {}", px, u);
                    assert!((py - v).abs() < tolerance, "{} vs {}", py, v);
                }
            }
        }
    }

    #[test]
    fn perspective_matrix_of_fixed_points_is_identity() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let m = perspective_matrix(square, square).unwrap();
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        for (value, expect) in m.iter().zip(identity.iter()) {
            assert!((value - expect).abs() < 1e-6);
        }

        let collinear = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)];
        assert!(perspective_matrix(collinear, square).is_none());
    }

    #[test]
    fn shear_rejects_mismatched_parameters() {
        let shear = ShearInit {
            max_shear_left: 10.0,
            max_shear_right: 10.0,
        }
        .build()
        .unwrap();
        let image = gradient(8, 8);
        assert!(shear.apply(&image, &DrawnParameters::Unit).is_err());
    }
}
