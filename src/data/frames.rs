// ============================================================
// Layer 4 — Frame Normaliser
// ============================================================
// Videos have a variable number of frames; the model wants
// exactly max_frames. Three cases:
//
//   num_frames <= max_frames   → copy, zero-pad the tail, mask 0
//   longer, inference          → uniform stride, deterministic
//   longer, training           → random distinct frames, sorted
//
// Example (inference, 20 frames, max 8):
//   stride = 20 / 8 = 2 → [0, 2, 4, 6, 8, 10, 12, 14]
//
// The random case takes its RNG as a parameter so callers can
// seed it; nothing here touches global random state.

use ndarray::{s, Array2, Axis};
use rand::Rng;

use crate::domain::record::Mode;

/// How the source frames map onto the output rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// All `valid` frames are copied, the rest is padding
    Pad { valid: usize },
    /// Output row i holds source frame indices[i]
    Subsample(Vec<usize>),
}

/// Fixed-size frame features plus validity mask
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrames {
    /// (max_frames, feature_dim)
    pub features: Array2<f32>,
    /// 1 = real frame, 0 = padding; length max_frames
    pub mask: Vec<u32>,
}

pub fn select_frames<R: Rng + ?Sized>(
    num_frames: usize,
    max_frames: usize,
    mode:       Mode,
    rng:        &mut R,
) -> FrameSelection {
    if num_frames <= max_frames {
        return FrameSelection::Pad { valid: num_frames };
    }
    match mode {
        Mode::Inference => FrameSelection::Subsample(uniform_indices(num_frames, max_frames)),
        Mode::Train     => FrameSelection::Subsample(random_indices(num_frames, max_frames, rng)),
    }
}

/// Every stride-th index from 0, truncated to max_frames.
/// Requires num_frames > max_frames > 0.
pub fn uniform_indices(num_frames: usize, max_frames: usize) -> Vec<usize> {
    let stride = num_frames / max_frames;
    (0..num_frames).step_by(stride).take(max_frames).collect()
}

/// max_frames distinct indices from [0, num_frames), ascending
pub fn random_indices<R: Rng + ?Sized>(
    num_frames: usize,
    max_frames: usize,
    rng:        &mut R,
) -> Vec<usize> {
    let mut picked = rand::seq::index::sample(rng, num_frames, max_frames).into_vec();
    // Keep temporal order
    picked.sort_unstable();
    picked
}

/// Pad or subsample `raw` (num_frames, dim) to (max_frames, dim)
pub fn normalize_frames<R: Rng + ?Sized>(
    raw:        &Array2<f32>,
    max_frames: usize,
    mode:       Mode,
    rng:        &mut R,
) -> NormalizedFrames {
    let (num_frames, dim) = raw.dim();
    let mut mask = vec![1u32; max_frames];

    let features = match select_frames(num_frames, max_frames, mode, rng) {
        FrameSelection::Pad { valid } => {
            let mut out = Array2::<f32>::zeros((max_frames, dim));
            out.slice_mut(s![..valid, ..]).assign(raw);
            mask[valid..].fill(0);
            out
        }
        FrameSelection::Subsample(indices) => raw.select(Axis(0), &indices),
    };

    NormalizedFrames { features, mask }
}
