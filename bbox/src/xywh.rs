use super::{Rect, TLBR};
use crate::common::*;

/// Bounding box given by its top-left corner and its size.
///
/// This is the layout annotation records are stored in, so it serializes
/// to the flat `{x, y, w, h}` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XYWH<T> {
    pub(crate) x: T,
    pub(crate) y: T,
    pub(crate) w: T,
    pub(crate) h: T,
}

impl<T> XYWH<T> {
    /// Apply `f` to every component.
    pub fn map<V, F>(self, mut f: F) -> XYWH<V>
    where
        F: FnMut(T) -> V,
    {
        XYWH {
            x: f(self.x),
            y: f(self.y),
            w: f(self.w),
            h: f(self.h),
        }
    }
}

impl<T> Rect for XYWH<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.y
    }

    fn l(&self) -> Self::Type {
        self.x
    }

    fn b(&self) -> Self::Type {
        self.y + self.h
    }

    fn r(&self) -> Self::Type {
        self.x + self.w
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.y + self.h / two
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.x + self.w / two
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn w(&self) -> Self::Type {
        self.w
    }

    fn try_from_tlbr(tlbr: [T; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self {
            x: l,
            y: t,
            w: r - l,
            h: b - t,
        })
    }

    fn try_from_xywh(xywh: [T; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "box height and width must be non-negative"
        );

        Ok(Self { x, y, w, h })
    }
}

impl<T> From<TLBR<T>> for XYWH<T>
where
    T: Copy + Num,
{
    fn from(from: TLBR<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&TLBR<T>> for XYWH<T>
where
    T: Copy + Num,
{
    fn from(from: &TLBR<T>) -> Self {
        let TLBR { t, l, b, r } = *from;
        Self {
            x: l,
            y: t,
            w: r - l,
            h: b - t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use noisy_float::prelude::*;

    #[test]
    fn xywh_tlbr_conversion() {
        let tlbr = TLBR::from_tlbr([2.0, 1.0, 6.0, 4.0]);
        let xywh: XYWH<f64> = tlbr.into();
        assert_eq!(xywh.xywh(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(xywh.tlbr(), [2.0, 1.0, 6.0, 4.0]);
    }

    #[test]
    fn negative_size_is_rejected() {
        assert!(XYWH::try_from_xywh([0.0, 0.0, -0.1, 0.2]).is_err());
    }

    #[test]
    fn xywh_serializes_flat() {
        let rect = XYWH::from_xywh([r64(0.4), r64(0.4), r64(0.2), r64(0.25)]);
        let text = serde_json::to_string(&rect).unwrap();
        assert_eq!(text, r#"{"x":0.4,"y":0.4,"w":0.2,"h":0.25}"#);
    }
}
