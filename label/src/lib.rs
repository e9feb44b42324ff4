//! Annotation records shared by the augmentation engine and its collaborators.

mod common;

pub use image::*;
mod image;

use crate::common::*;

/// Normalized box, each component a fraction of the image width or height.
pub type RatioRect = XYWH<R64>;

/// A bounding box label attached to an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(flatten)]
    pub rect: RatioRect,
}

impl Label {
    pub fn new(id: impl Into<String>, rect: RatioRect) -> Self {
        Self {
            id: id.into(),
            image_id: None,
            category_id: None,
            rect,
        }
    }

    pub fn with_image(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// Check that every component is a fraction in `[0, 1]`, the size is
    /// positive and the box overlaps the image frame.
    pub fn validate(&self) -> Result<()> {
        let [x, y, w, h] = self.rect.xywh();
        ensure!(
            [x, y, w, h].iter().all(|&value| (0.0..=1.0).contains(&value.raw())),
            "label '{}' components must be in range [0, 1], but get x={} y={} w={} h={}",
            self.id,
            x,
            y,
            w,
            h
        );
        ensure!(
            w > 0.0 && h > 0.0,
            "label '{}' must have positive width and height, but get w={} h={}",
            self.id,
            w,
            h
        );
        let frame = TLBR::from_tlbr([r64(0.0), r64(0.0), r64(1.0), r64(1.0)]);
        ensure!(
            self.rect.intersect_with(&frame).is_some(),
            "label '{}' at x={} y={} lies outside the image frame",
            self.id,
            x,
            y
        );
        Ok(())
    }

    /// The box in pixel units of an image of `size`.
    pub fn to_pixel_rect(&self, size: &HW<u32>) -> XYWH<R64> {
        let size = HW::from_hw([r64(size.h() as f64), r64(size.w() as f64)]);
        &Transform::ratio_to_pixel(&size) * &self.rect
    }
}
