pub use crate::error::{AugmentError, AugmentResult};
pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use bbox::{prelude::*, Transform, HW, TLBR, XYWH};
pub use futures::stream::{self, StreamExt as _};
pub use getset::{CopyGetters, Getters};
pub use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgb, RgbImage};
pub use imageproc::geometric_transformations::{warp, warp_with, Interpolation, Projection};
pub use itertools::Itertools as _;
pub use label::{ImageInfo, Label, RatioRect};
pub use noisy_float::prelude::*;
pub use par_stream::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use tracing::{debug, info, instrument, trace, warn};
pub use uuid::Uuid;

/// Generate a random identifier from `rng`, so seeded runs produce stable ids.
pub fn random_id<R>(rng: &mut R) -> String
where
    R: Rng,
{
    uuid::Builder::from_random_bytes(rng.gen())
        .into_uuid()
        .to_string()
}
