//! Typed failures of the augmentation engine.

use thiserror::Error;

pub type AugmentResult<T, E = AugmentError> = std::result::Result<T, E>;

/// Failures surfaced to the caller of the engine.
///
/// Configuration errors (`InvalidOperationChain`, `InvalidSampleCount`,
/// `InvalidLabel`) are raised before any pixel work begins. A label that
/// vanishes under a transform is not an error and never shows up here.
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("invalid operation chain: {reason}")]
    InvalidOperationChain { reason: String },
    #[error("the number of samples must be positive")]
    InvalidSampleCount,
    #[error("invalid label: {reason}")]
    InvalidLabel { reason: String },
    #[error("image '{image_id}' is not found")]
    ImageNotFound { image_id: String },
    #[error("dataset '{dataset_id}' has no images")]
    EmptyDataset { dataset_id: String },
    #[error("pixel data of image '{image_id}' is unavailable")]
    SourceUnavailable {
        image_id: String,
        #[source]
        error: anyhow::Error,
    },
    #[error("unable to decode pixel data of image '{image_id}'")]
    DecodeFailure {
        image_id: String,
        #[source]
        error: image::ImageError,
    },
    #[error("unable to encode the output image")]
    Encode(#[source] image::ImageError),
    #[error("operation '{operation}' failed: {reason}")]
    Transform {
        operation: &'static str,
        reason: String,
    },
}

impl AugmentError {
    pub(crate) fn invalid_chain(reason: impl ToString) -> Self {
        Self::InvalidOperationChain {
            reason: reason.to_string(),
        }
    }

    /// True for failures caused by the caller's input rather than by data or compute.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperationChain { .. } | Self::InvalidSampleCount | Self::InvalidLabel { .. }
        )
    }
}
