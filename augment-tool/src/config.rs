//! Augmentation tool configuration format.

use augment::{AugmentationEngineInit, BulkAugmentorInit, Operation};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The main tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The operation chain applied to every image.
    pub operations: Vec<Operation>,
    /// The number of samples per image. Uses the preview policy if unset.
    #[serde(default)]
    pub samples: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub marker_threshold: Option<u8>,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default)]
    pub bulk: Option<BulkConfig>,
}

/// Bulk augmentation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    pub image_count: usize,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

fn default_jpeg_quality() -> u8 {
    90
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5(&text)
    }

    pub fn from_json5(text: &str) -> Result<Self> {
        let config: Self = json5::from_str(text)?;
        ensure!(
            (1..=100).contains(&config.jpeg_quality),
            "jpeg_quality must be in range 1..=100"
        );
        ensure!(config.samples != Some(0), "samples must be positive");
        Ok(config)
    }

    pub fn engine_init(&self) -> AugmentationEngineInit {
        AugmentationEngineInit {
            seed: self.seed,
            marker_threshold: self.marker_threshold,
        }
    }

    pub fn bulk_init(&self) -> Option<BulkAugmentorInit> {
        let BulkConfig {
            image_count,
            max_workers,
        } = *self.bulk.as_ref()?;
        Some(BulkAugmentorInit {
            image_count,
            max_workers,
            seed: self.seed,
        })
    }
}
