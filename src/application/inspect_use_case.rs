// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Assembles a single record exactly as a loader worker would and
// summarises the result. Handy for checking that a new feature
// dump, vocabulary or category list lines up before training.

use anyhow::{Context, Result};
use std::fmt;

use crate::application::resources::{build_dataset, Resources};
use crate::domain::record::Mode;
use crate::infra::config::PipelineConfig;

/// What one assembled example looks like
#[derive(Debug, Clone)]
pub struct SampleSummary {
    pub index:        usize,
    pub id:           String,
    pub frame_shape:  (usize, usize),
    pub valid_frames: usize,
    pub seq_length:   usize,
    pub text_tokens:  usize,
    pub label:        Option<usize>,
    pub lv1_label:    Option<usize>,
    pub category_id:  Option<String>,
    pub title_input:  Vec<u32>,
}

impl fmt::Display for SampleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "record #{} ({})", self.index, self.id)?;
        writeln!(
            f,
            "  frames: {:?}, {} real / {} padded",
            self.frame_shape,
            self.valid_frames,
            self.frame_shape.0 - self.valid_frames
        )?;
        writeln!(
            f,
            "  text:   {} of {} positions used",
            self.text_tokens, self.seq_length
        )?;
        writeln!(f, "  ids:    {:?}", &self.title_input[..self.text_tokens])?;
        match (&self.label, &self.lv1_label, &self.category_id) {
            (Some(label), Some(lv1), Some(cat)) => {
                write!(f, "  label:  {label} (category {cat}, level-1 group {lv1})")
            }
            _ => write!(f, "  label:  none"),
        }
    }
}

pub struct InspectUseCase {
    config: PipelineConfig,
    mode:   Mode,
}

impl InspectUseCase {
    pub fn new(mut config: PipelineConfig, mode: Mode) -> Self {
        // One record on the calling thread
        config.num_workers = 0;
        Self { config, mode }
    }

    pub fn inspect(&self, index: usize) -> Result<SampleSummary> {
        let mut resources = Resources::load(&self.config, self.mode)?;
        let records = std::mem::take(&mut resources.records);
        let category_id = records.get(index).and_then(|r| r.category_id.clone());
        let lv1_label = match (&resources.categories, &category_id) {
            (Some(map), Some(id)) => Some(map.lv1_index(id)?),
            _ => None,
        };

        let dataset = build_dataset(&self.config, self.mode, records, &resources)?;
        let sample = dataset
            .assemble(index)
            .with_context(|| format!("Cannot assemble record #{index}"))?;

        Ok(SampleSummary {
            index,
            id:           sample.id,
            frame_shape:  sample.frame_input.dim(),
            valid_frames: sample.frame_mask.iter().filter(|&&m| m == 1).count(),
            seq_length:   sample.title_input.len(),
            text_tokens:  sample.title_mask.iter().filter(|&&m| m == 1).count(),
            label:        sample.label,
            lv1_label,
            category_id:  category_id.filter(|_| !self.mode.is_inference()),
            title_input:  sample.title_input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::loader_use_case::tests::workspace;

    #[test]
    fn test_inspect_train_record() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 4);
        // v1 has 6 frames, category 0201
        let summary = InspectUseCase::new(cfg, Mode::Train).inspect(1).unwrap();

        assert_eq!(summary.id, "v1");
        assert_eq!(summary.frame_shape, (8, 4));
        assert_eq!(summary.valid_frames, 6);
        assert_eq!(summary.seq_length, 16);
        assert_eq!(summary.text_tokens, 8);
        assert_eq!(summary.label, Some(2));
        assert_eq!(summary.lv1_label, Some(1));
        assert!(summary.to_string().contains("category 0201, level-1 group 1"));
    }

    #[test]
    fn test_inspect_inference_uses_inference_limits() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = workspace(dir.path(), 0);
        cfg.max_frames_infer = 4;
        cfg.bert_seq_length_infer = 10;
        // v9 has 30 frames, lives in shard 1
        let summary = InspectUseCase::new(cfg, Mode::Inference).inspect(9).unwrap();

        assert_eq!(summary.frame_shape, (4, 4));
        assert_eq!(summary.valid_frames, 4);
        assert_eq!(summary.seq_length, 10);
        assert_eq!(summary.label, None);
        assert_eq!(summary.lv1_label, None);
        assert!(summary.to_string().ends_with("label:  none"));
    }

    #[test]
    fn test_inspect_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workspace(dir.path(), 0);
        assert!(InspectUseCase::new(cfg, Mode::Train).inspect(10).is_err());
    }
}
