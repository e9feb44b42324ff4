use super::{TLBR, XYWH};
use crate::{common::*, HW};

/// Per-axis scaling followed by translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    /// The transform from ratio units to pixel units of an image of `size`.
    pub fn ratio_to_pixel(size: &HW<T>) -> Self {
        Self {
            sy: size.h(),
            sx: size.w(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    /// The transform from pixel units of an image of `size` to ratio units.
    pub fn pixel_to_ratio(size: &HW<T>) -> Self {
        Self {
            sy: T::one() / size.h(),
            sx: T::one() / size.w(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        TLBR {
            t: rhs.t * self.sy + self.ty,
            l: rhs.l * self.sx + self.tx,
            b: rhs.b * self.sy + self.ty,
            r: rhs.r * self.sx + self.tx,
        }
    }
}

impl<T> Mul<&XYWH<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = XYWH<T>;

    fn mul(self, rhs: &XYWH<T>) -> Self::Output {
        XYWH {
            x: rhs.x * self.sx + self.tx,
            y: rhs.y * self.sy + self.ty,
            w: rhs.w * self.sx,
            h: rhs.h * self.sy,
        }
    }
}
