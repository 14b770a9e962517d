// ============================================================
// Layer 4 — Multimodal Batcher
// ============================================================
// Implements Burn's Batcher trait to stack MultiModalSamples
// into tensors:
//
//   frame_input       [batch, max_frames, feature_dim]  float
//   frame_mask        [batch, max_frames]               int
//   title_input       [batch, seq_len]                  int
//   title_mask        [batch, seq_len]                  int
//   text_token_type   [batch, seq_len]                  int
//   video_token_type  [batch, max_frames]               int
//   label             [batch, 1]                        int (train only)
//
// Every sample is already fixed-size, so batching is flatten
// then reshape.
//
// DropLastStrategy groups samples for the training loader and
// discards a short final group, so every training batch has
// exactly batch_size rows. With worker threads each worker drops
// its own remainder.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::{batcher::Batcher, BatchStrategy},
    prelude::*,
};

use crate::data::dataset::MultiModalSample;

#[derive(Debug, Clone)]
pub struct MultiModalBatch<B: Backend> {
    pub frame_input:      Tensor<B, 3>,
    pub frame_mask:       Tensor<B, 2, Int>,
    pub title_input:      Tensor<B, 2, Int>,
    pub title_mask:       Tensor<B, 2, Int>,
    pub text_token_type:  Tensor<B, 2, Int>,
    pub video_token_type: Tensor<B, 2, Int>,
    /// Present only when every sample in the batch is labelled
    pub label:            Option<Tensor<B, 2, Int>>,
}

#[derive(Clone, Debug)]
pub struct MultiModalBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> MultiModalBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Flatten one per-sample u32 field and reshape to [batch, width]
    fn stack_ints(
        &self,
        items: &[MultiModalSample],
        field: impl Fn(&MultiModalSample) -> &[u32],
    ) -> Tensor<B, 2, Int> {
        let width = items.first().map(|s| field(s).len()).unwrap_or(0);
        let flat: Vec<i32> = items
            .iter()
            .flat_map(|s| field(s).iter().map(|&x| x as i32))
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([items.len(), width])
    }
}

impl<B: Backend> Batcher<MultiModalSample, MultiModalBatch<B>> for MultiModalBatcher<B> {
    fn batch(&self, items: Vec<MultiModalSample>) -> MultiModalBatch<B> {
        let batch_size = items.len();
        let (frames, dim) = items
            .first()
            .map(|s| s.frame_input.dim())
            .unwrap_or((0, 0));

        // Array2::iter walks in logical row-major order whatever the layout
        let frame_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.frame_input.iter().copied())
            .collect();
        let frame_input = Tensor::<B, 1>::from_floats(frame_flat.as_slice(), &self.device)
            .reshape([batch_size, frames, dim]);

        let labels: Option<Vec<i32>> = items
            .iter()
            .map(|s| s.label.map(|l| l as i32))
            .collect();
        let label = labels.map(|l| {
            Tensor::<B, 1, Int>::from_ints(l.as_slice(), &self.device)
                .reshape([batch_size, 1])
        });

        MultiModalBatch {
            frame_input,
            frame_mask:       self.stack_ints(&items, |s| s.frame_mask.as_slice()),
            title_input:      self.stack_ints(&items, |s| s.title_input.as_slice()),
            title_mask:       self.stack_ints(&items, |s| s.title_mask.as_slice()),
            text_token_type:  self.stack_ints(&items, |s| s.text_token_type.as_slice()),
            video_token_type: self.stack_ints(&items, |s| s.video_token_type.as_slice()),
            label,
        }
    }
}

/// Fixed-size batches; the short remainder of an epoch is discarded
pub struct DropLastStrategy<I> {
    items:      Vec<I>,
    batch_size: usize,
}

impl<I> DropLastStrategy<I> {
    pub fn new(batch_size: usize) -> Self {
        Self { items: Vec::with_capacity(batch_size), batch_size }
    }
}

impl<I: Send + 'static> BatchStrategy<I> for DropLastStrategy<I> {
    fn add(&mut self, item: I) {
        self.items.push(item);
    }

    fn batch(&mut self, force: bool) -> Option<Vec<I>> {
        if self.items.len() < self.batch_size {
            // force is only set once the dataset is exhausted
            if force && !self.items.is_empty() {
                tracing::debug!("Dropping short training batch of {}", self.items.len());
                self.items.clear();
            }
            return None;
        }
        let next = Vec::with_capacity(self.batch_size);
        Some(std::mem::replace(&mut self.items, next))
    }

    fn clone_dyn(&self) -> Box<dyn BatchStrategy<I>> {
        Box::new(Self::new(self.batch_size))
    }
}
