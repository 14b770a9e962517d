// ============================================================
// Layer 4 — Multimodal Dataset
// ============================================================
// Builds one fixed-shape example per record index:
//
//   record ──► id ──► ShardPair ──► (num_frames, dim) f32
//                                        │ pad / subsample
//                                        ▼
//                               frame_input (max_frames, dim)
//                               frame_mask  (max_frames)
//
//   record ──► [unused4] title [unused1] asr [unused3] ocr
//                                        │ TextEncoder
//                                        ▼
//                               title_input / title_mask (seq_len)
//
// plus segment-type vectors (0 for text, 1 for video) and, in
// training mode, the level-2 category label.
//
// Implements Burn's Dataset trait so it plugs straight into
// DataLoaderBuilder. Records are immutable after construction;
// the only shared state is the archive handle pool.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use burn::data::dataset::Dataset;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokenizers::Tokenizer;

use crate::data::{
    archive::FallbackPolicy,
    frames::{normalize_frames, NormalizedFrames},
    handles::ArchiveHandles,
    text::{EncodedText, TextEncoder, TextMarkers},
};
use crate::domain::{
    category::CategoryMap,
    record::{Mode, Record},
};
use crate::error::{PipelineError, Result};
use crate::infra::config::PipelineConfig;

/// One assembled example
#[derive(Debug, Clone)]
pub struct MultiModalSample {
    pub id:               String,
    /// (max_frames, feature_dim)
    pub frame_input:      Array2<f32>,
    pub frame_mask:       Vec<u32>,
    pub title_input:      Vec<u32>,
    pub title_mask:       Vec<u32>,
    /// All zeros, one per text position
    pub text_token_type:  Vec<u32>,
    /// All ones, one per frame position
    pub video_token_type: Vec<u32>,
    /// Level-2 class index; None in inference mode
    pub label:            Option<usize>,
}

/// Per-dataset knobs, usually derived from PipelineConfig
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub mode:        Mode,
    pub max_frames:  usize,
    pub seq_length:  usize,
    pub num_workers: usize,
    pub seed:        u64,
    pub fallback:    FallbackPolicy,
    pub markers:     TextMarkers,
}

impl DatasetOptions {
    pub fn from_config(cfg: &PipelineConfig, mode: Mode) -> Result<Self> {
        Ok(Self {
            mode,
            max_frames:  cfg.frames_for(mode),
            seq_length:  cfg.seq_length_for(mode),
            num_workers: cfg.num_workers,
            seed:        cfg.seed,
            fallback:    cfg.fallback,
            markers:     TextMarkers::from_list(&cfg.markers)?,
        })
    }
}

pub struct MultiModalDataset {
    records:    Vec<Record>,
    handles:    ArchiveHandles,
    text:       TextEncoder,
    categories: Option<Arc<CategoryMap>>,
    options:    DatasetOptions,
    epoch:      AtomicU64,
}

impl MultiModalDataset {
    /// `categories` is required in training mode
    pub fn new(
        records:     Vec<Record>,
        feature_dir: impl Into<PathBuf>,
        tokenizer:   Tokenizer,
        categories:  Option<Arc<CategoryMap>>,
        options:     DatasetOptions,
    ) -> Result<Self> {
        if options.max_frames == 0 {
            return Err(PipelineError::Config { reason: "max_frames must be at least 1".into() });
        }
        if options.mode == Mode::Train && categories.is_none() {
            return Err(PipelineError::Config {
                reason: "training mode needs a category map for labels".into(),
            });
        }

        let handles = ArchiveHandles::new(feature_dir, options.fallback, options.num_workers)?;
        let text = TextEncoder::new(tokenizer, options.seq_length)?;

        tracing::info!(
            "Dataset ready: {} records, mode={:?}, max_frames={}, seq_length={}, workers={}",
            records.len(),
            options.mode,
            options.max_frames,
            options.seq_length,
            options.num_workers
        );

        Ok(Self { records, handles, text, categories, options, epoch: AtomicU64::new(0) })
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Changes which random frames training samples draw.
    /// Same (seed, epoch, index) always gives the same frames.
    pub fn set_epoch(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::Relaxed);
    }

    /// Number of shard pairs currently open
    pub fn open_handles(&self) -> usize {
        self.handles.open_pairs()
    }

    /// Visual features for `index`, randomness derived from
    /// (seed, epoch, index)
    pub fn fetch_visual(&self, index: usize) -> Result<NormalizedFrames> {
        let mut rng = self.frame_rng(index);
        self.fetch_visual_with(index, &mut rng)
    }

    /// Visual features for `index` using the caller's RNG
    pub fn fetch_visual_with<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng:   &mut R,
    ) -> Result<NormalizedFrames> {
        let record = self.record(index)?;
        let raw = self.handles.with_pair(|pair| pair.read_features(&record.id))?;
        Ok(normalize_frames(&raw, self.options.max_frames, self.options.mode, rng))
    }

    pub fn fetch_text(&self, raw_text: &str) -> Result<EncodedText> {
        self.text.encode(raw_text)
    }

    pub fn assemble(&self, index: usize) -> Result<MultiModalSample> {
        // Step 1: visual features
        let frames = self.fetch_visual(index)?;
        let record = self.record(index)?;

        // Step 2: marker-joined text
        let all_text = self.options.markers.compose(record);
        let text = self.fetch_text(&all_text)?;

        // Step 3: segment types
        let text_token_type = vec![0u32; text.input_ids.len()];
        let video_token_type = vec![1u32; frames.features.nrows()];

        // Step 4: label
        let label = match self.options.mode {
            Mode::Inference => None,
            Mode::Train => Some(self.label_for(record)?),
        };

        Ok(MultiModalSample {
            id:               record.id.clone(),
            frame_input:      frames.features,
            frame_mask:       frames.mask,
            title_input:      text.input_ids,
            title_mask:       text.attention_mask,
            text_token_type,
            video_token_type,
            label,
        })
    }

    fn record(&self, index: usize) -> Result<&Record> {
        self.records.get(index).ok_or(PipelineError::IndexOutOfRange {
            index,
            len: self.records.len(),
        })
    }

    fn label_for(&self, record: &Record) -> Result<usize> {
        let category_id = record
            .category_id
            .as_deref()
            .ok_or_else(|| PipelineError::MissingLabel { id: record.id.clone() })?;
        let categories = self.categories.as_ref().ok_or_else(|| PipelineError::Config {
            reason: "no category map loaded".into(),
        })?;
        categories.lv2_index(category_id)
    }

    fn frame_rng(&self, index: usize) -> StdRng {
        let epoch = self.epoch.load(Ordering::Relaxed);
        let seed = self.options.seed
            ^ epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (index as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        StdRng::seed_from_u64(seed)
    }
}

// ─── Burn Dataset Trait Implementation ───────────────────────────────────────
// Burn's loader iterates until get() returns None, so a record
// that cannot be assembled ends the iteration of the worker that
// hit it. The error is logged with the record id.
impl Dataset<MultiModalSample> for MultiModalDataset {
    fn get(&self, index: usize) -> Option<MultiModalSample> {
        if index >= self.records.len() {
            return None;
        }
        match self.assemble(index) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::error!(
                    "Cannot assemble record {} ('{}'): {}",
                    index,
                    self.records[index].id,
                    e
                );
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::fixtures::{self, Entry};
    use crate::domain::record::OcrFragment;
    use crate::infra::config::DEFAULT_MARKERS;
    use crate::infra::tokenizer_store::{tests as tok_tests, TokenizerStore};
    use ndarray::s;

    pub(crate) struct Fixture {
        pub dir:        tempfile::TempDir,
        pub tokenizer:  Tokenizer,
        pub categories: Arc<CategoryMap>,
    }

    pub(crate) fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_shards(
            dir.path(),
            &[Entry::frames("v1", 5, 4), Entry::frames("v2", 20, 4)],
            &[Entry::frames("v3", 12, 4)],
        );
        tok_tests::write_vocab(dir.path());
        let tokenizer = TokenizerStore::new(dir.path().to_string_lossy())
            .load(&tok_tests::markers())
            .unwrap();
        let categories = Arc::new(CategoryMap::from_ids(["0101", "0102", "0201"]).unwrap());
        Fixture { dir, tokenizer, categories }
    }

    pub(crate) fn records() -> Vec<Record> {
        let mut v1 = Record::new("v1");
        v1.title = "hello".into();
        v1.asr = "world".into();
        v1.ocr = vec![OcrFragment { text: "cat".into() }];
        v1.category_id = Some("0102".into());

        let mut v2 = Record::new("v2");
        v2.title = "视频".into();
        v2.category_id = Some("0201".into());

        let mut v3 = Record::new("v3");
        v3.category_id = Some("0101".into());

        vec![v1, v2, v3]
    }

    pub(crate) fn options(mode: Mode, num_workers: usize) -> DatasetOptions {
        let markers: Vec<String> = DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect();
        DatasetOptions {
            mode,
            max_frames: 8,
            seq_length: 12,
            num_workers,
            seed: 42,
            fallback: FallbackPolicy::MissingOnly,
            markers: TextMarkers::from_list(&markers).unwrap(),
        }
    }

    fn dataset(fx: &Fixture, mode: Mode) -> MultiModalDataset {
        MultiModalDataset::new(
            records(),
            fx.dir.path(),
            fx.tokenizer.clone(),
            Some(Arc::clone(&fx.categories)),
            options(mode, 0),
        )
        .unwrap()
    }

    fn id(tok: &str) -> u32 {
        tok_tests::TEST_VOCAB.iter().position(|t| *t == tok).unwrap() as u32
    }

    #[test]
    fn test_len_counts_records() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Train);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.record_count(), 3);
    }

    #[test]
    fn test_short_video_padded_with_mask() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Train);
        let frames = ds.fetch_visual(0).unwrap();

        assert_eq!(frames.features.dim(), (8, 4));
        assert_eq!(frames.mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(frames.features.slice(s![..5, ..]), fixtures::frame_matrix(5, 4));
        assert!(frames.features.slice(s![5.., ..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_inference_uses_uniform_stride() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Inference);
        let frames = ds.fetch_visual(1).unwrap();
        let raw = fixtures::frame_matrix(20, 4);

        for (row, src) in [0, 2, 4, 6, 8, 10, 12, 14].iter().enumerate() {
            assert_eq!(frames.features.row(row), raw.row(*src));
        }
        assert_eq!(frames.mask, vec![1; 8]);
        assert_eq!(ds.fetch_visual(1).unwrap(), frames);
    }

    #[test]
    fn test_train_sampling_reproducible_per_epoch() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Train);
        let a = ds.fetch_visual(1).unwrap();
        let b = ds.fetch_visual(1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mask, vec![1; 8]);

        let mut rng = StdRng::seed_from_u64(3);
        let c = ds.fetch_visual_with(1, &mut rng).unwrap();
        assert_eq!(c.features.dim(), (8, 4));
    }

    #[test]
    fn test_set_epoch_changes_selection_and_repeats_within_epoch() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Train);
        // v2: 20 frames, max 8
        let epoch0 = ds.fetch_visual(1).unwrap();

        ds.set_epoch(1);
        let epoch1 = ds.fetch_visual(1).unwrap();
        assert_eq!(ds.fetch_visual(1).unwrap(), epoch1);
        assert_ne!(epoch1.features, epoch0.features);
        assert_eq!(epoch1.mask, vec![1; 8]);

        ds.set_epoch(0);
        assert_eq!(ds.fetch_visual(1).unwrap(), epoch0);
    }

    #[test]
    fn test_secondary_shard_record() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Inference);
        let frames = ds.fetch_visual(2).unwrap();
        // 12 frames, max 8, stride 1 → first 8
        assert_eq!(frames.features, fixtures::frame_matrix(12, 4).slice(s![..8, ..]));
    }

    #[test]
    fn test_assemble_train_example() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Train);
        let sample = ds.assemble(0).unwrap();

        assert_eq!(sample.id, "v1");
        assert_eq!(sample.title_input.len(), 12);
        assert_eq!(
            &sample.title_input[..8],
            &[id("[CLS]"), id("[unused4]"), id("hello"), id("[unused1]"),
              id("world"), id("[unused3]"), id("cat"), id("[SEP]")]
        );
        assert_eq!(sample.title_mask, vec![1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(sample.text_token_type, vec![0; 12]);
        assert_eq!(sample.video_token_type, vec![1; 8]);
        assert_eq!(sample.label, Some(1));
    }

    #[test]
    fn test_assemble_inference_has_no_label() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Inference);
        assert_eq!(ds.assemble(2).unwrap().label, None);
    }

    #[test]
    fn test_unknown_category_fails_assembly() {
        let fx = fixture();
        let mut recs = records();
        recs[0].category_id = Some("9999".into());
        let ds = MultiModalDataset::new(
            recs,
            fx.dir.path(),
            fx.tokenizer.clone(),
            Some(Arc::clone(&fx.categories)),
            options(Mode::Train, 0),
        )
        .unwrap();
        assert!(matches!(ds.assemble(0), Err(PipelineError::UnknownCategory { .. })));
        assert!(ds.get(0).is_none());
    }

    #[test]
    fn test_out_of_range_index() {
        let fx = fixture();
        let ds = dataset(&fx, Mode::Train);
        assert!(matches!(
            ds.assemble(3),
            Err(PipelineError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(ds.get(3).is_none());
    }

    #[test]
    fn test_missing_features_fail_record() {
        let fx = fixture();
        let mut recs = records();
        recs.push(Record::new("ghost"));
        let ds = MultiModalDataset::new(
            recs,
            fx.dir.path(),
            fx.tokenizer.clone(),
            None,
            options(Mode::Inference, 0),
        )
        .unwrap();
        assert!(matches!(ds.fetch_visual(3), Err(PipelineError::FeatureMissing { .. })));
    }

    #[test]
    fn test_train_mode_requires_categories() {
        let fx = fixture();
        let result = MultiModalDataset::new(
            records(),
            fx.dir.path(),
            fx.tokenizer.clone(),
            None,
            options(Mode::Train, 0),
        );
        assert!(matches!(result, Err(PipelineError::Config { .. })));
    }

    #[test]
    fn test_lazy_handles_open_on_first_access() {
        let fx = fixture();
        let ds = MultiModalDataset::new(
            records(),
            fx.dir.path(),
            fx.tokenizer.clone(),
            Some(Arc::clone(&fx.categories)),
            options(Mode::Train, 2),
        )
        .unwrap();
        assert_eq!(ds.open_handles(), 0);
        ds.get(0).unwrap();
        assert_eq!(ds.open_handles(), 1);
    }
}
