//! Augmentation of a whole dataset on a worker pool.

use crate::{
    common::*,
    engine::AugmentationEngine,
    operation::Operation,
    pipeline::BatchPipeline,
    sink::{ProgressReporter, VariantSink},
    source::ImageSource,
    store::AnnotationStore,
};

/// Bulk augmentation initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAugmentorInit {
    /// The number of variants to produce.
    pub image_count: usize,
    /// The number of parallel units. Defaults to the number of CPUs.
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl BulkAugmentorInit {
    pub fn build(self) -> Result<BulkAugmentor> {
        let Self {
            image_count,
            max_workers,
            seed,
        } = self;
        ensure!(image_count > 0, "image_count must be positive");
        if let Some(max_workers) = max_workers {
            ensure!(max_workers > 0, "max_workers must be positive");
        }

        Ok(BulkAugmentor {
            image_count,
            num_workers: max_workers.unwrap_or_else(num_cpus::get),
            seed,
        })
    }
}

/// Description of one bulk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: String,
    pub dataset_id: String,
    pub image_count: usize,
    pub operations: Vec<Operation>,
}

/// A unit of work that failed. Its siblings are not affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub index: usize,
    pub image_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReport {
    pub pipeline: PipelineRecord,
    /// Descriptors of the persisted variants ordered by unit index.
    pub created: Vec<ImageInfo>,
    pub failures: Vec<UnitFailure>,
}

/// Produces a fixed number of variants over the images of a dataset.
///
/// Unit `i` augments image `i mod N` once. Units run in parallel and
/// finish in any order.
#[derive(Debug, Clone, CopyGetters)]
pub struct BulkAugmentor {
    #[getset(get_copy = "pub")]
    image_count: usize,
    #[getset(get_copy = "pub")]
    num_workers: usize,
    seed: Option<u64>,
}

impl BulkAugmentor {
    #[instrument(skip_all, fields(dataset_id = %dataset_id))]
    pub async fn run<S>(
        &self,
        store: Arc<dyn AnnotationStore>,
        engine: Arc<AugmentationEngine<S>>,
        sink: Arc<dyn VariantSink>,
        progress: Arc<dyn ProgressReporter>,
        dataset_id: &str,
        operations: &[Operation],
    ) -> AugmentResult<BulkReport>
    where
        S: ImageSource + 'static,
    {
        let image_count = self.image_count;
        BatchPipeline::new(operations)?;

        let images = store.find_images(dataset_id);
        if images.is_empty() {
            return Err(AugmentError::EmptyDataset {
                dataset_id: dataset_id.to_owned(),
            });
        }

        let base_seed = self.seed.unwrap_or_else(rand::random);
        let pipeline = PipelineRecord {
            id: random_id(&mut StdRng::seed_from_u64(base_seed)),
            dataset_id: dataset_id.to_owned(),
            image_count,
            operations: operations.to_vec(),
        };
        info!(
            pipeline_id = %pipeline.id,
            images = images.len(),
            image_count,
            num_workers = self.num_workers,
            "start bulk augmentation"
        );

        let images = Arc::new(images);
        let operations = Arc::new(pipeline.operations.clone());
        let pipeline_id = Arc::new(pipeline.id.clone());

        let mut outcomes: Vec<_> = stream::iter(0..image_count)
            .par_map_unordered(self.num_workers, move |index| {
                let images = images.clone();
                let operations = operations.clone();
                let pipeline_id = pipeline_id.clone();
                let store = store.clone();
                let engine = engine.clone();
                let sink = sink.clone();

                move || {
                    let image = &images[index % images.len()];
                    let seed = base_seed.wrapping_add(index as u64);

                    let result = (|| -> Result<ImageInfo> {
                        let mut rng = StdRng::seed_from_u64(seed);
                        let labels = store.find_labels(&image.id);
                        let samples =
                            engine.run_with_rng(image, &labels, &operations, 1, &mut rng)?;
                        let sample = samples
                            .into_iter()
                            .next()
                            .ok_or_else(|| format_err!("no sample was produced"))?;
                        sink.persist(Some(pipeline_id.as_str()), image, &sample)
                    })();

                    let outcome = result.map_err(|err| {
                        warn!(index, image_id = %image.id, "unit failed: {:#}", err);
                        UnitFailure {
                            index,
                            image_id: image.id.clone(),
                            reason: format!("{:#}", err),
                        }
                    });
                    (index, outcome)
                }
            })
            .enumerate()
            .map(|(done, outcome)| {
                progress.report(done + 1, image_count);
                outcome
            })
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let (created, failures): (Vec<_>, Vec<_>) = outcomes
            .into_iter()
            .map(|(_, outcome)| outcome)
            .partition_map(|outcome| match outcome {
                Ok(image) => itertools::Either::Left(image),
                Err(failure) => itertools::Either::Right(failure),
            });
        info!(
            pipeline_id = %pipeline.id,
            created = created.len(),
            failed = failures.len(),
            "bulk augmentation finished"
        );

        Ok(BulkReport {
            pipeline,
            created,
            failures,
        })
    }
}
