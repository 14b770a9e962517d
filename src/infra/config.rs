// ============================================================
// Layer 6 — Pipeline Configuration
// ============================================================
// All tunables for sample assembly, loaded from a JSON file and
// then overridden field by field from the command line.
//
// Every field has a default so a config file only needs the
// values that differ, e.g.
//
//   { "feature_dir": "/data/zip_feats", "max_frames": 16 }
//
// Inference gets its own frame/sequence limits: there is no
// random cropping at inference, so more context is kept.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::archive::FallbackPolicy;
use crate::domain::record::Mode;
use crate::error::PipelineError;

/// Default never-split markers. The first three separate title,
/// ASR and OCR in that order; the fourth is reserved.
pub const DEFAULT_MARKERS: [&str; 4] = ["[unused4]", "[unused1]", "[unused3]", "[unused2]"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding labeled_0.zip and labeled_1.zip
    pub feature_dir:           String,
    /// JSON annotation file
    pub annotation:            String,
    /// Directory with tokenizer.json or vocab.txt
    pub bert_dir:              String,
    /// Lowercase text when building the tokenizer from vocab.txt
    pub lowercase:             bool,
    /// One category id per line
    pub category_list:         String,
    pub max_frames:            usize,
    pub bert_seq_length:       usize,
    pub max_frames_infer:      usize,
    pub bert_seq_length_infer: usize,
    pub num_workers:           usize,
    pub batch_size:            usize,
    pub val_batch_size:        usize,
    pub val_ratio:             f64,
    pub seed:                  u64,
    /// Title, ASR and OCR markers followed by any extra reserved tokens
    pub markers:               Vec<String>,
    pub fallback:              FallbackPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_dir:           "data/zip_feats".to_string(),
            annotation:            "data/annotations/labeled.json".to_string(),
            bert_dir:              "models/chinese-macbert-base".to_string(),
            lowercase:             true,
            category_list:         "data/category_ids.txt".to_string(),
            max_frames:            32,
            bert_seq_length:       256,
            max_frames_infer:      32,
            bert_seq_length_infer: 384,
            num_workers:           4,
            batch_size:            32,
            val_batch_size:        256,
            val_ratio:             0.1,
            seed:                  42,
            markers:               DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            fallback:              FallbackPolicy::MissingOnly,
        }
    }
}

impl PipelineConfig {
    /// Read a config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse config '{}'", path.display()))?;
        tracing::debug!("Loaded pipeline config from '{}'", path.display());
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(())
    }

    /// Frame count for the given mode
    pub fn frames_for(&self, mode: Mode) -> usize {
        match mode {
            Mode::Train     => self.max_frames,
            Mode::Inference => self.max_frames_infer,
        }
    }

    /// Token sequence length for the given mode
    pub fn seq_length_for(&self, mode: Mode) -> usize {
        match mode {
            Mode::Train     => self.bert_seq_length,
            Mode::Inference => self.bert_seq_length_infer,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let bad = |reason: String| Err(PipelineError::Config { reason });

        if self.max_frames == 0 || self.max_frames_infer == 0 {
            return bad("max_frames must be at least 1".into());
        }
        // [CLS] and [SEP] always take two positions
        if self.bert_seq_length < 2 || self.bert_seq_length_infer < 2 {
            return bad("bert_seq_length must be at least 2".into());
        }
        if !(0.0..1.0).contains(&self.val_ratio) {
            return bad(format!("val_ratio {} must be in [0, 1)", self.val_ratio));
        }
        if self.batch_size == 0 || self.val_batch_size == 0 {
            return bad("batch sizes must be at least 1".into());
        }
        if self.markers.len() < 3 {
            return bad(format!(
                "need title, asr and ocr markers, got {}",
                self.markers.len()
            ));
        }
        Ok(())
    }
}

// ─── Pretraining ──────────────────────────────────────────────────────────────

/// Self-supervised objectives used during pretraining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PretrainTask {
    /// Masked language modelling
    Mlm,
    /// Masked frame modelling
    Mfm,
    /// Video-text matching
    Itm,
    /// Video-text contrastive
    Itc,
}

/// How pretraining shards are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadDataType {
    /// Whole shard resident in memory
    Mem,
    /// Streamed on demand
    Fluid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PretrainConfig {
    pub tasks:             Vec<PretrainTask>,
    pub pretrain_file_num: usize,
    pub load_data_type:    LoadDataType,
    pub num_folds:         usize,
    pub seed:              u64,
}

impl Default for PretrainConfig {
    fn default() -> Self {
        Self {
            tasks:             vec![PretrainTask::Mlm, PretrainTask::Itm, PretrainTask::Mfm],
            pretrain_file_num: 15,
            load_data_type:    LoadDataType::Mem,
            num_folds:         1,
            seed:              42,
        }
    }
}

impl PretrainConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read pretrain config '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn uses(&self, task: PretrainTask) -> bool {
        self.tasks.contains(&task)
    }
}
