// ============================================================
// Layer 2 — Shared Run Resources
// ============================================================
// Everything a dataset needs that is loaded once per process:
//
//   records     — from the annotation file
//   tokenizer   — from bert_dir, markers registered
//   categories  — from the category list (training only),
//                 shared between the train and val datasets

use anyhow::{Context, Result};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::data::{
    dataset::{DatasetOptions, MultiModalDataset},
    loader::AnnotationLoader,
};
use crate::domain::{
    category::CategoryMap,
    record::{Mode, Record},
    traits::RecordSource,
};
use crate::infra::{config::PipelineConfig, tokenizer_store::TokenizerStore};

pub struct Resources {
    pub records:    Vec<Record>,
    pub tokenizer:  Tokenizer,
    pub categories: Option<Arc<CategoryMap>>,
}

impl Resources {
    pub fn load(cfg: &PipelineConfig, mode: Mode) -> Result<Self> {
        cfg.validate()?;

        let records = AnnotationLoader::new(&cfg.annotation, mode).load_all()?;

        let store = TokenizerStore::new(&cfg.bert_dir);
        let store = if cfg.lowercase { store } else { store.cased() };
        let tokenizer = store
            .load(&cfg.markers)
            .with_context(|| format!("Cannot load tokenizer from '{}'", cfg.bert_dir))?;

        let categories = match mode {
            Mode::Train => {
                let map = CategoryMap::from_file(&cfg.category_list).with_context(|| {
                    format!("Cannot load category list '{}'", cfg.category_list)
                })?;
                tracing::debug!(
                    "Level-1 blocks start at {:?} in level-2 index space",
                    map.lv1_offsets()
                );
                Some(Arc::new(map))
            }
            Mode::Inference => None,
        };

        Ok(Self { records, tokenizer, categories })
    }
}

/// Build a dataset over `records` sharing the loaded tokenizer/categories
pub fn build_dataset(
    cfg:       &PipelineConfig,
    mode:      Mode,
    records:   Vec<Record>,
    resources: &Resources,
) -> Result<MultiModalDataset> {
    let options = DatasetOptions::from_config(cfg, mode)?;
    let dataset = MultiModalDataset::new(
        records,
        &cfg.feature_dir,
        resources.tokenizer.clone(),
        resources.categories.clone(),
        options,
    )
    .with_context(|| format!("Cannot open features in '{}'", cfg.feature_dir))?;
    Ok(dataset)
}
