use crate::common::*;

/// Descriptor of a stored image. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Path or URI to the encoded pixel data.
    pub path: String,
    /// The encoded size in bytes.
    #[serde(default)]
    pub size: u64,
    pub width: u32,
    pub height: u32,
    /// The augmentation run that produced this image, if any.
    #[serde(default)]
    pub pipeline_id: Option<String>,
}

impl ImageInfo {
    pub fn size_hw(&self) -> HW<u32> {
        HW::from_hw([self.height, self.width])
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}
