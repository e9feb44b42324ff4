use super::TLBR;
use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    /// Build from the top-left corner `(x, y)` and the size `(w, h)`.
    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    fn from_xywh(xywh: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xywh(xywh).unwrap()
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn xywh(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.w(), self.h()]
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    /// Compute the intersection rectangle, or `None` if the rectangles do not overlap.
    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = self.t().max(other.t());
        let l = self.l().max(other.l());
        let b = self.b().min(other.b());
        let r = self.r().min(other.r());
        (b > t && r > l).then(|| TLBR::from_tlbr([t, l, b, r]))
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XYWH;
    use approx::assert_abs_diff_eq;

    #[test]
    fn disjoint_rects_do_not_intersect() {
        let lhs = TLBR::from_tlbr([0.0, 0.0, 0.1, 0.1]);
        let rhs = XYWH::from_xywh([0.4, 0.4, 0.2, 0.2]);
        assert!(lhs.intersect_with(&rhs).is_none());
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let lhs = XYWH::from_xywh([1.0, 0.2, 0.1, 0.1]);
        let frame = TLBR::from_tlbr([0.0, 0.0, 1.0, 1.0]);
        assert!(lhs.intersect_with(&frame).is_none());
    }

    #[test]
    fn overlapping_rects_intersect() {
        let lhs = XYWH::from_xywh([0.25, 0.25, 0.5, 0.5]);
        let rhs = TLBR::from_tlbr([0.5, 0.0, 1.0, 0.6]);
        let inter = lhs.intersect_with(&rhs).unwrap();
        for (value, expect) in inter.tlbr().iter().zip([0.5, 0.25, 0.75, 0.6].iter()) {
            assert_abs_diff_eq!(value, expect, epsilon = 1e-12);
        }
    }
}
