//! Augmentation and label propagation for bounding-box annotated images.
//!
//! Labels are carried through a chain of raster operations by encoding each
//! box as a filled ellipse marker, transforming the markers together with the
//! image under shared random decisions, and decoding the surviving markers
//! back into boxes.

mod common;

pub mod bulk;
pub mod codec;
pub mod engine;
pub mod error;
pub mod operation;
pub mod pipeline;
pub mod sampler;
pub mod sink;
pub mod source;
pub mod store;

pub use bulk::*;
pub use codec::*;
pub use engine::*;
pub use error::*;
pub use operation::{DrawnParameters, Operation, OperationType, RasterOp, TransformClass};
pub use pipeline::*;
pub use sampler::*;
pub use sink::*;
pub use source::*;
pub use store::*;
