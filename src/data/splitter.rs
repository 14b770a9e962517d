// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the record table with a seeded RNG and carves off the
// validation set:
//
//   val_size   = floor(total * val_ratio)
//   train_size = total - val_size
//
// The seed comes from the pipeline config so the same records
// land in validation on every run.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, val_ratio: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let val_size = ((total as f64) * val_ratio).floor() as usize;
    let val_size = val_size.min(total);

    // split_off(n) removes [n..] and returns it
    let val = samples.split_off(total - val_size);

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed {})",
        samples.len(),
        val.len(),
        seed
    );

    (samples, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.1, 42);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(),   10);
    }

    #[test]
    fn test_validation_size_rounds_down() {
        let items: Vec<usize> = (0..19).collect();
        let (train, val)      = split_train_val(items, 0.1, 42);
        assert_eq!(val.len(),   1);
        assert_eq!(train.len(), 18);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.3, 7);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..40).collect::<Vec<usize>>(), 0.25, 42);
        let b = split_train_val((0..40).collect::<Vec<usize>>(), 0.25, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.1, 42);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_zero_ratio_keeps_everything_for_training() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val)      = split_train_val(items, 0.0, 42);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
