//! Encoding labels as marker rasters and recovering boxes from transformed markers.

use crate::common::*;

/// The lowest channel value counted as marker foreground by default.
///
/// It is about 47% of the channel range, which keeps pixels that were
/// softened by interpolation or compression along the marker boundary.
pub const DEFAULT_MARKER_THRESHOLD: u8 = 120;

const MARKER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Axis-aligned ellipse in pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ellipse {
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
}

impl Ellipse {
    /// The inclusive column range covered on `row`, before clipping.
    ///
    /// A pixel is covered if its center satisfies `((x-cx)/rx)^2 + ((y-cy)/ry)^2 <= 1`.
    fn span(&self, row: u32) -> Option<(i64, i64)> {
        let dy = (row as f64 + 0.5 - self.cy) / self.ry;
        let rest = 1.0 - dy * dy;
        if rest < 0.0 {
            return None;
        }
        let half = self.rx * rest.sqrt();
        let first = (self.cx - half - 0.5).ceil() as i64;
        let last = (self.cx + half - 0.5).floor() as i64;
        (first <= last).then(|| (first, last))
    }

    /// Paint every covered pixel of `canvas` with `color`.
    fn fill(&self, canvas: &mut RgbImage, color: Rgb<u8>) {
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        let top = (self.cy - self.ry - 0.5).floor().max(0.0) as u32;
        let bottom = ((self.cy + self.ry).ceil().max(0.0) as u32).min(height - 1);

        for row in top..=bottom {
            let (first, last) = match self.span(row) {
                Some(span) => span,
                None => continue,
            };
            let first = first.max(0);
            let last = last.min(width as i64 - 1);
            for col in first..=last {
                canvas.put_pixel(col as u32, row, color);
            }
        }
    }
}

/// Strategy that carries a label through raster transforms.
pub trait LabelCodec: Debug + Send + Sync {
    /// Render `label` into a raster of `size`.
    fn encode(&self, size: &HW<u32>, label: &Label) -> AugmentResult<RgbImage>;

    /// Recover the normalized box from a transformed marker.
    ///
    /// Returns `None` if the label vanished.
    fn decode_rect(&self, marker: &RgbImage) -> Option<RatioRect>;

    /// Recover a label from a transformed marker.
    ///
    /// The decoded label takes the category of `source` and the identifier `id`.
    fn decode(&self, marker: &RgbImage, source: &Label, id: String) -> Option<Label> {
        let rect = self.decode_rect(marker)?;
        Some(Label {
            id,
            image_id: None,
            category_id: source.category_id.clone(),
            rect,
        })
    }
}

/// Codec drawing each label as a solid white ellipse on a black canvas.
#[derive(Debug, Clone, CopyGetters)]
pub struct MarkerCodec {
    #[getset(get_copy = "pub")]
    threshold: u8,
}

impl MarkerCodec {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    fn is_foreground(&self, pixel: &Rgb<u8>) -> bool {
        pixel.0.iter().all(|&channel| channel >= self.threshold)
    }
}

impl Default for MarkerCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_THRESHOLD)
    }
}

impl LabelCodec for MarkerCodec {
    fn encode(&self, size: &HW<u32>, label: &Label) -> AugmentResult<RgbImage> {
        label
            .validate()
            .map_err(|err| AugmentError::InvalidLabel {
                reason: format!("{:#}", err),
            })?;
        if !size.is_non_empty() {
            return Err(AugmentError::InvalidLabel {
                reason: format!(
                    "cannot draw label '{}' on an empty {}x{} image",
                    label.id,
                    size.w(),
                    size.h()
                ),
            });
        }

        let rect = label.to_pixel_rect(size);
        // the extra pixel keeps tiny boxes from collapsing into nothing
        let ellipse = Ellipse {
            cx: rect.cx().raw(),
            cy: rect.cy().raw(),
            rx: rect.w().raw() / 2.0 + 1.0,
            ry: rect.h().raw() / 2.0 + 1.0,
        };

        let mut marker = RgbImage::new(size.w(), size.h());
        ellipse.fill(&mut marker, MARKER_COLOR);

        Ok(marker)
    }

    fn decode_rect(&self, marker: &RgbImage) -> Option<RatioRect> {
        // bounding rectangle over all foreground pixels, so a marker split
        // into pieces still yields one box covering every piece
        let [t, l, b, r] = marker
            .enumerate_pixels()
            .filter(|(_, _, pixel)| self.is_foreground(pixel))
            .fold(None, |bounds, (x, y, _)| {
                let [t, l, b, r] = bounds.unwrap_or([y, x, y, x]);
                Some([t.min(y), l.min(x), b.max(y), r.max(x)])
            })?;

        let (width, height) = marker.dimensions();
        let size = HW::from_hw([r64(height as f64), r64(width as f64)]);
        let pixel_rect = TLBR::from_tlbr([
            r64(t as f64),
            r64(l as f64),
            r64(b as f64 + 1.0),
            r64(r as f64 + 1.0),
        ]);
        let ratio_rect: XYWH<R64> = (&Transform::pixel_to_ratio(&size) * &pixel_rect).into();

        Some(ratio_rect.map(|value| r64((value.raw() * 1e6).round() / 1e6)))
    }
}
