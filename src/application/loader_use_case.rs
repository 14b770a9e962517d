// ============================================================
// Layer 2 — LoaderUseCase
// ============================================================
// Builds the finetuning data loaders:
//
//   Step 1: Load records, tokenizer, categories   (Layer 2 - resources)
//   Step 2: Seeded train/validation split         (Layer 4 - data)
//   Step 3: One training-mode dataset per split   (Layer 4 - data)
//   Step 4: Shuffled train loader, ordered val loader (Burn)
//
// The train loader drops each epoch's short final batch; the
// validation loader keeps it so every record is evaluated.
//
// Both datasets are kept behind Arc so the caller can advance
// the epoch (and with it the random frame selection) while the
// loaders own them.

use anyhow::Result;
use burn::{
    data::{
        dataloader::{batcher::DynBatcher, BatchDataLoader, BatchStrategy, DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;

use crate::application::resources::{build_dataset, Resources};
use crate::data::{
    batcher::{DropLastStrategy, MultiModalBatch, MultiModalBatcher},
    dataset::{MultiModalDataset, MultiModalSample},
    splitter::split_train_val,
};
use crate::domain::record::{Mode, Record};
use crate::infra::config::PipelineConfig;

pub struct Loaders<B: Backend> {
    pub train:         Arc<dyn DataLoader<MultiModalBatch<B>>>,
    pub val:           Arc<dyn DataLoader<MultiModalBatch<B>>>,
    pub train_dataset: Arc<MultiModalDataset>,
    pub val_dataset:   Arc<MultiModalDataset>,
}

impl<B: Backend> Loaders<B> {
    /// Advance random frame sampling for both datasets
    pub fn set_epoch(&self, epoch: u64) {
        self.train_dataset.set_epoch(epoch);
        self.val_dataset.set_epoch(epoch);
    }
}

pub struct LoaderUseCase {
    config: PipelineConfig,
}

impl LoaderUseCase {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Seeded split of the annotation records
    pub fn split(&self) -> Result<(Vec<Record>, Vec<Record>)> {
        let resources = Resources::load(&self.config, Mode::Train)?;
        Ok(self.split_records(resources.records))
    }

    pub fn build<B: Backend>(&self, device: B::Device) -> Result<Loaders<B>> {
        let cfg = &self.config;

        // ── Step 1: resources ─────────────────────────────────────────────────
        let mut resources = Resources::load(cfg, Mode::Train)?;
        let records = std::mem::take(&mut resources.records);

        // ── Step 2: split ─────────────────────────────────────────────────────
        let (train_records, val_records) = self.split_records(records);

        // ── Step 3: datasets ──────────────────────────────────────────────────
        let train_dataset = Arc::new(build_dataset(cfg, Mode::Train, train_records, &resources)?);
        let val_dataset   = Arc::new(build_dataset(cfg, Mode::Train, val_records, &resources)?);
        tracing::info!(
            "Split: {} train, {} validation",
            train_dataset.record_count(),
            val_dataset.record_count()
        );

        // ── Step 4: loaders ───────────────────────────────────────────────────
        // DataLoaderBuilder only knows fixed batches that keep the
        // remainder, so the train loader is assembled by hand
        let train = train_loader(
            Arc::clone(&train_dataset),
            MultiModalBatcher::<B>::new(device.clone()),
            cfg,
        );

        let mut val_builder = DataLoaderBuilder::new(MultiModalBatcher::<B>::new(device))
            .batch_size(cfg.val_batch_size);
        if cfg.num_workers > 0 {
            val_builder = val_builder.num_workers(cfg.num_workers);
        }
        let val = val_builder.build(Arc::clone(&val_dataset));

        Ok(Loaders { train, val, train_dataset, val_dataset })
    }

    fn split_records(&self, records: Vec<Record>) -> (Vec<Record>, Vec<Record>) {
        split_train_val(records, self.config.val_ratio, self.config.seed)
    }
}

/// Shuffled (by seed), drop-last training loader
fn train_loader<B: Backend>(
    dataset: Arc<MultiModalDataset>,
    batcher: MultiModalBatcher<B>,
    cfg:     &PipelineConfig,
) -> Arc<dyn DataLoader<MultiModalBatch<B>>> {
    let dataset: Arc<dyn Dataset<MultiModalSample>> = dataset;
    let strategy: Box<dyn BatchStrategy<MultiModalSample>> =
        Box::new(DropLastStrategy::new(cfg.batch_size));
    let batcher: Box<dyn DynBatcher<MultiModalSample, MultiModalBatch<B>>> = Box::new(batcher);
    let rng = Some(StdRng::seed_from_u64(cfg.seed));

    if cfg.num_workers > 0 {
        Arc::new(BatchDataLoader::multi_thread(strategy, dataset, batcher, cfg.num_workers, rng))
    } else {
        Arc::new(BatchDataLoader::new(strategy, dataset, batcher, rng))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::fixtures::{self, Entry};
    use crate::infra::tokenizer_store::tests as tok_tests;
    use std::{fs, path::Path};

    type TestBackend = burn::backend::NdArray;

    /// A complete on-disk workspace: shards, annotations, categories, vocab
    pub(crate) fn workspace(dir: &Path, num_workers: usize) -> PipelineConfig {
        let shard0: Vec<Entry> = (0..6).map(|i| Entry::frames(&format!("v{i}"), 3 + i * 3, 4)).collect();
        let shard1: Vec<Entry> = (6..10).map(|i| Entry::frames(&format!("v{i}"), 3 + i * 3, 4)).collect();
        fixtures::write_shards(dir, &shard0, &shard1);

        let records: Vec<serde_json::Value> = (0..10)
            .map(|i| serde_json::json!({
                "id": format!("v{i}"),
                "title": "hello",
                "asr": "world",
                "ocr": [{"text": "cat"}],
                "category_id": if i % 2 == 0 { "0101" } else { "0201" },
            }))
            .collect();
        fs::write(dir.join("ann.json"), serde_json::to_string(&records).unwrap()).unwrap();
        fs::write(dir.join("categories.txt"), "0101\n0102\n0201\n").unwrap();
        tok_tests::write_vocab(dir);

        let dir_str = dir.to_string_lossy().into_owned();
        PipelineConfig {
            feature_dir:     dir_str.clone(),
            annotation:      dir.join("ann.json").to_string_lossy().into_owned(),
            bert_dir:        dir_str,
            category_list:   dir.join("categories.txt").to_string_lossy().into_owned(),
            max_frames:      8,
            bert_seq_length: 16,
            num_workers,
            batch_size:      4,
            val_batch_size:  4,
            val_ratio:       0.2,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_sizes_follow_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 0);
        let (train, val) = LoaderUseCase::new(cfg).split().unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
    }

    /// Batch sizes of one pass over `loader`
    fn batch_sizes(loader: &Arc<dyn DataLoader<MultiModalBatch<TestBackend>>>) -> Vec<usize> {
        loader
            .iter()
            .map(|batch| {
                let [b, frames, dim] = batch.frame_input.dims();
                assert_eq!((frames, dim), (8, 4));
                assert_eq!(batch.title_input.dims(), [b, 16]);
                assert_eq!(batch.label.map(|l| l.dims()), Some([b, 1]));
                b
            })
            .collect()
    }

    fn drain(loader: &Arc<dyn DataLoader<MultiModalBatch<TestBackend>>>) -> usize {
        batch_sizes(loader).iter().sum()
    }

    #[test]
    fn test_single_thread_loaders_cover_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 0);
        let loaders = LoaderUseCase::new(cfg).build::<TestBackend>(Default::default()).unwrap();

        assert_eq!(drain(&loaders.train), 8);
        assert_eq!(drain(&loaders.val), 2);
    }

    #[test]
    fn test_worker_loaders_cover_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 2);
        let loaders = LoaderUseCase::new(cfg).build::<TestBackend>(Default::default()).unwrap();

        assert_eq!(loaders.train_dataset.open_handles(), 0);
        loaders.set_epoch(1);
        assert_eq!(drain(&loaders.train), 8);
    }

    #[test]
    fn test_train_loader_drops_short_batch_val_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig {
            batch_size:     3,
            val_batch_size: 3,
            ..workspace(dir.path(), 0)
        };
        let loaders = LoaderUseCase::new(cfg).build::<TestBackend>(Default::default()).unwrap();

        // 8 training records
        assert_eq!(batch_sizes(&loaders.train), vec![3, 3]);
        assert_eq!(batch_sizes(&loaders.train), vec![3, 3]);
        // 2 validation records
        assert_eq!(batch_sizes(&loaders.val), vec![2]);
    }

    #[test]
    fn test_worker_shards_released_between_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 2);
        let loaders = LoaderUseCase::new(cfg).build::<TestBackend>(Default::default()).unwrap();

        for epoch in 0..5 {
            loaders.set_epoch(epoch);
            assert_eq!(drain(&loaders.train), 8);
            assert!(loaders.train_dataset.open_handles() <= 2);
        }
        // Burn joins its workers once the epoch is drained
        assert_eq!(loaders.train_dataset.open_handles(), 0);
    }
}
