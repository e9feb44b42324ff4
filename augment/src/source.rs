//! Retrieval of encoded pixel data for image descriptors.

use crate::common::*;

/// Resolves an image descriptor to its encoded bytes.
pub trait ImageSource: Debug + Send + Sync {
    fn fetch(&self, image: &ImageInfo) -> Result<Vec<u8>>;
}

impl<T> ImageSource for Arc<T>
where
    T: ImageSource + ?Sized,
{
    fn fetch(&self, image: &ImageInfo) -> Result<Vec<u8>> {
        (**self).fetch(image)
    }
}

/// Reads images from the local file system.
///
/// Accepts plain paths and `file://` URIs. Relative paths are resolved
/// against the root directory if one is set.
#[derive(Debug, Clone, Default)]
pub struct FsImageSource {
    root: Option<PathBuf>,
}

impl FsImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_owned()),
        }
    }

    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let path = match location.split_once("://") {
            Some(("file", path)) => Path::new(path),
            Some((scheme, _)) => bail!("unsupported scheme '{}' in '{}'", scheme, location),
            None => Path::new(location),
        };

        let path = match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_owned(),
        };
        Ok(path)
    }
}

impl ImageSource for FsImageSource {
    fn fetch(&self, image: &ImageInfo) -> Result<Vec<u8>> {
        let path = self.resolve(&image.path)?;
        trace!(image_id = %image.id, path = %path.display(), "read image");
        let bytes =
            fs::read(&path).with_context(|| format!("unable to read '{}'", path.display()))?;
        Ok(bytes)
    }
}

/// Holds encoded images in memory, keyed by image id.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_id: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(image_id.into(), bytes);
    }

    /// Store `raster` encoded as PNG.
    pub fn insert_raster(&mut self, image_id: impl Into<String>, raster: &RgbImage) -> Result<()> {
        let mut bytes = vec![];
        DynamicImage::ImageRgb8(raster.clone()).write_to(&mut bytes, ImageOutputFormat::Png)?;
        self.insert(image_id, bytes);
        Ok(())
    }
}

impl ImageSource for MemoryImageSource {
    fn fetch(&self, image: &ImageInfo) -> Result<Vec<u8>> {
        let bytes = self
            .images
            .get(&image.id)
            .ok_or_else(|| format_err!("no pixel data for image '{}'", image.id))?;
        Ok(bytes.clone())
    }
}
