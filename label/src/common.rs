pub use anyhow::{ensure, Result};
pub use bbox::{prelude::*, Transform, HW, TLBR, XYWH};
pub use noisy_float::prelude::*;
pub use serde::{Deserialize, Serialize};
