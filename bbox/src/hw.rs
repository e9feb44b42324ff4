use crate::common::*;

/// Image or rectangle size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HW<T> {
    w: T,
    h: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "height and width parameters must be non-negative"
        );
        Ok(Self { w, h })
    }

    pub fn from_hw(hw: [T; 2]) -> Self {
        Self::try_from_hw(hw).unwrap()
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn h(&self) -> T {
        self.h
    }

    /// True if the height and the width are both positive.
    pub fn is_non_empty(&self) -> bool {
        let zero = T::zero();
        self.h > zero && self.w > zero
    }
}

impl<T> From<(T, T)> for HW<T> {
    /// Build from `(width, height)`, the order image dimensions are reported in.
    fn from((w, h): (T, T)) -> Self {
        Self { w, h }
    }
}
