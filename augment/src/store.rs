//! Lookup of image descriptors and their labels.

use crate::common::*;

/// Read access to stored images and labels.
pub trait AnnotationStore: Debug + Send + Sync {
    fn find_image(&self, image_id: &str) -> Option<ImageInfo>;

    /// Images of a dataset in a stable order.
    fn find_images(&self, dataset_id: &str) -> Vec<ImageInfo>;

    /// Labels of an image in a stable order.
    fn find_labels(&self, image_id: &str) -> Vec<Label>;
}

/// The on-disk form of a [ManifestStore].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Annotation store backed by a JSON manifest.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    images: Vec<ImageInfo>,
    index: HashMap<String, usize>,
    labels: HashMap<String, Vec<Label>>,
}

impl ManifestStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read manifest '{}'", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("malformed manifest '{}'", path.display()))?;
        Self::from_manifest(manifest)
    }

    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let Manifest { images, labels } = manifest;

        let mut index = HashMap::with_capacity(images.len());
        for (position, image) in images.iter().enumerate() {
            let prev = index.insert(image.id.clone(), position);
            ensure!(prev.is_none(), "duplicated image id '{}'", image.id);
        }

        let mut grouped: HashMap<String, Vec<Label>> = HashMap::new();
        for label in labels {
            let image_id = match &label.image_id {
                Some(image_id) => image_id.clone(),
                None => {
                    warn!(label_id = %label.id, "skip label without image");
                    continue;
                }
            };
            ensure!(
                index.contains_key(&image_id),
                "label '{}' refers to unknown image '{}'",
                label.id,
                image_id
            );
            grouped.entry(image_id).or_default().push(label);
        }

        debug!(
            images = images.len(),
            labels = grouped.values().map(Vec::len).sum::<usize>(),
            "manifest loaded"
        );

        Ok(Self {
            images,
            index,
            labels: grouped,
        })
    }
}

impl AnnotationStore for ManifestStore {
    fn find_image(&self, image_id: &str) -> Option<ImageInfo> {
        let position = *self.index.get(image_id)?;
        Some(self.images[position].clone())
    }

    fn find_images(&self, dataset_id: &str) -> Vec<ImageInfo> {
        self.images
            .iter()
            .filter(|image| image.dataset_id.as_deref() == Some(dataset_id))
            .cloned()
            .collect()
    }

    fn find_labels(&self, image_id: &str) -> Vec<Label> {
        self.labels.get(image_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "images": [
            {"id": "i1", "dataset_id": "d1", "name": "a.jpg", "path": "a.jpg", "width": 100, "height": 50},
            {"id": "i2", "dataset_id": "d2", "name": "b.jpg", "path": "b.jpg", "width": 50, "height": 50}
        ],
        "labels": [
            {"id": "l1", "image_id": "i1", "category_id": "c1", "x": 0.1, "y": 0.1, "w": 0.2, "h": 0.2},
            {"id": "l2", "image_id": "i1", "x": 0.5, "y": 0.5, "w": 0.2, "h": 0.2}
        ]
    }"#;

    #[test]
    fn lookups() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let store = ManifestStore::from_manifest(manifest).unwrap();

        assert_eq!(store.find_image("i1").unwrap().width, 100);
        assert!(store.find_image("i3").is_none());
        assert_eq!(store.find_images("d1").len(), 1);
        assert!(store.find_images("d3").is_empty());

        let labels = store.find_labels("i1");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].id, "l1");
        assert!(store.find_labels("i2").is_empty());
    }

    #[test]
    fn dangling_label_is_rejected() {
        let mut manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        manifest.labels[0].image_id = Some("missing".into());
        assert!(ManifestStore::from_manifest(manifest).is_err());
    }
}
