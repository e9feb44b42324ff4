//! Elastic distortions driven by a coarse displacement grid.

use super::{uniform, unexpected_parameters, DrawnParameters, RasterOp, TransformClass};
use crate::common::*;

const FILL: Rgb<u8> = Rgb([0, 0, 0]);

fn default_grid() -> u32 {
    4
}

fn default_magnitude() -> f64 {
    8.0
}

/// Pixel displacements sampled on the vertices of a `cols x rows` grid.
///
/// Vertices on the border are pinned so the frame outline does not move.
/// Displacements between vertices are bilinearly interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementGrid {
    size: HW<u32>,
    cols: u32,
    rows: u32,
    /// `(dx, dy)` per vertex in row-major order, `(cols + 1) * (rows + 1)` entries.
    offsets: Vec<(f32, f32)>,
}

impl DisplacementGrid {
    /// Build a grid whose interior vertices get the offsets returned by `f`.
    ///
    /// `f` receives the vertex position normalized to `0..=1` on both axes.
    fn from_fn<F>(size: &HW<u32>, cols: u32, rows: u32, mut f: F) -> Self
    where
        F: FnMut(f32, f32) -> (f32, f32),
    {
        let offsets = (0..=rows)
            .cartesian_product(0..=cols)
            .map(|(row, col)| {
                if row == 0 || col == 0 || row == rows || col == cols {
                    (0.0, 0.0)
                } else {
                    f(col as f32 / cols as f32, row as f32 / rows as f32)
                }
            })
            .collect();

        Self {
            size: *size,
            cols,
            rows,
            offsets,
        }
    }

    pub fn size(&self) -> HW<u32> {
        self.size
    }

    fn vertex(&self, col: u32, row: u32) -> (f32, f32) {
        self.offsets[(row * (self.cols + 1) + col) as usize]
    }

    /// The displacement at pixel `(x, y)`.
    pub fn displacement(&self, x: f32, y: f32) -> (f32, f32) {
        let u = (x / self.size.w() as f32 * self.cols as f32).clamp(0.0, self.cols as f32);
        let v = (y / self.size.h() as f32 * self.rows as f32).clamp(0.0, self.rows as f32);
        let col = (u.floor() as u32).min(self.cols - 1);
        let row = (v.floor() as u32).min(self.rows - 1);
        let fu = u - col as f32;
        let fv = v - row as f32;

        let (x00, y00) = self.vertex(col, row);
        let (x10, y10) = self.vertex(col + 1, row);
        let (x01, y01) = self.vertex(col, row + 1);
        let (x11, y11) = self.vertex(col + 1, row + 1);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let dx = lerp(lerp(x00, x10, fu), lerp(x01, x11, fu), fv);
        let dy = lerp(lerp(y00, y10, fu), lerp(y01, y11, fu), fv);
        (dx, dy)
    }

    fn warp(&self, raster: &RgbImage) -> Result<RgbImage> {
        let (w, h) = raster.dimensions();
        ensure!(
            HW::from((w, h)) == self.size,
            "displacement grid drawn for {}x{} cannot warp a {}x{} raster",
            self.size.w(),
            self.size.h(),
            w,
            h
        );
        if self.offsets.iter().all(|&(dx, dy)| dx == 0.0 && dy == 0.0) {
            return Ok(raster.clone());
        }

        Ok(warp_with(
            raster,
            |x, y| {
                let (dx, dy) = self.displacement(x, y);
                (x + dx, y + dy)
            },
            Interpolation::Bilinear,
            FILL,
        ))
    }
}

fn apply_grid(op: &dyn RasterOp, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
    match params {
        DrawnParameters::Distortion(grid) => grid.warp(raster),
        _ => Err(unexpected_parameters(op, params)),
    }
}

fn check_grid(grid_width: u32, grid_height: u32, magnitude: f64) -> Result<()> {
    ensure!(
        grid_width >= 1 && grid_height >= 1,
        "grid_width and grid_height must be at least 1"
    );
    ensure!(
        magnitude.is_finite() && magnitude >= 0.0,
        "magnitude must be non-negative, but get {}",
        magnitude
    );
    Ok(())
}

// random distortion

/// Random elastic distortion initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomDistortionInit {
    #[serde(default = "default_grid")]
    pub grid_width: u32,
    #[serde(default = "default_grid")]
    pub grid_height: u32,
    /// The maximum vertex displacement in pixels.
    #[serde(default = "default_magnitude")]
    pub magnitude: f64,
}

impl RandomDistortionInit {
    pub fn build(self) -> Result<RandomDistortion> {
        let Self {
            grid_width,
            grid_height,
            magnitude,
        } = self;
        check_grid(grid_width, grid_height, magnitude)?;
        Ok(RandomDistortion {
            grid_width,
            grid_height,
            magnitude,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RandomDistortion {
    grid_width: u32,
    grid_height: u32,
    magnitude: f64,
}

impl RasterOp for RandomDistortion {
    fn name(&self) -> &'static str {
        "random_distortion"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, size: &HW<u32>) -> DrawnParameters {
        let magnitude = self.magnitude;
        let grid = DisplacementGrid::from_fn(size, self.grid_width, self.grid_height, |_, _| {
            (
                uniform(rng, -magnitude, magnitude) as f32,
                uniform(rng, -magnitude, magnitude) as f32,
            )
        });
        DrawnParameters::Distortion(Arc::new(grid))
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        apply_grid(self, raster, params)
    }
}

// gaussian distortion

/// Where the gaussian weight peaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionCorner {
    /// At `(mex, mey)`.
    Bell,
    Ul,
    Ur,
    Dl,
    Dr,
}

impl Default for DistortionCorner {
    fn default() -> Self {
        Self::Bell
    }
}

/// Whether displacement concentrates inside or outside the bell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionMethod {
    In,
    Out,
}

impl Default for DistortionMethod {
    fn default() -> Self {
        Self::In
    }
}

fn default_mean() -> f64 {
    0.5
}

fn default_sd() -> f64 {
    0.05
}

/// Gaussian-weighted elastic distortion initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussianDistortionInit {
    #[serde(default = "default_grid")]
    pub grid_width: u32,
    #[serde(default = "default_grid")]
    pub grid_height: u32,
    #[serde(default = "default_magnitude")]
    pub magnitude: f64,
    #[serde(default)]
    pub corner: DistortionCorner,
    #[serde(default)]
    pub method: DistortionMethod,
    #[serde(default = "default_mean")]
    pub mex: f64,
    #[serde(default = "default_mean")]
    pub mey: f64,
    #[serde(default = "default_sd")]
    pub sdx: f64,
    #[serde(default = "default_sd")]
    pub sdy: f64,
}

impl GaussianDistortionInit {
    pub fn build(self) -> Result<GaussianDistortion> {
        let Self {
            grid_width,
            grid_height,
            magnitude,
            corner,
            method,
            mex,
            mey,
            sdx,
            sdy,
        } = self;
        check_grid(grid_width, grid_height, magnitude)?;
        ensure!(
            sdx > 0.0 && sdy > 0.0,
            "sdx and sdy must be positive, but get {} and {}",
            sdx,
            sdy
        );

        let (mex, mey) = match corner {
            DistortionCorner::Bell => (mex, mey),
            DistortionCorner::Ul => (0.0, 0.0),
            DistortionCorner::Ur => (1.0, 0.0),
            DistortionCorner::Dl => (0.0, 1.0),
            DistortionCorner::Dr => (1.0, 1.0),
        };

        Ok(GaussianDistortion {
            grid_width,
            grid_height,
            magnitude,
            method,
            mex,
            mey,
            sdx,
            sdy,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GaussianDistortion {
    grid_width: u32,
    grid_height: u32,
    magnitude: f64,
    method: DistortionMethod,
    mex: f64,
    mey: f64,
    sdx: f64,
    sdy: f64,
}

impl GaussianDistortion {
    /// The displacement weight at normalized position `(u, v)`.
    fn weight(&self, u: f64, v: f64) -> f64 {
        let g = (-((u - self.mex).powi(2) / self.sdx + (v - self.mey).powi(2) / self.sdy)).exp();
        match self.method {
            DistortionMethod::In => g,
            DistortionMethod::Out => 1.0 - g,
        }
    }
}

impl RasterOp for GaussianDistortion {
    fn name(&self) -> &'static str {
        "gaussian_distortion"
    }

    fn class(&self) -> TransformClass {
        TransformClass::Geometric
    }

    fn draw(&self, rng: &mut StdRng, size: &HW<u32>) -> DrawnParameters {
        let magnitude = self.magnitude;
        let grid = DisplacementGrid::from_fn(size, self.grid_width, self.grid_height, |u, v| {
            let weight = self.weight(u as f64, v as f64);
            let dx = uniform(rng, -magnitude, magnitude) * weight;
            let dy = uniform(rng, -magnitude, magnitude) * weight;
            (dx as f32, dy as f32)
        });
        DrawnParameters::Distortion(Arc::new(grid))
    }

    fn apply(&self, raster: &RgbImage, params: &DrawnParameters) -> Result<RgbImage> {
        apply_grid(self, raster, params)
    }
}
