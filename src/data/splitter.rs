// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles abstracts and splits them into a training set and a
// held-out set. The RNG is passed in so a run seeded from
// TrainConfig::seed always produces the same split.

use rand::{seq::SliceRandom, Rng};

/// Shuffle `items` with `rng` and split into (train, validation).
///
/// `train_fraction` is clamped into `[0, 1]`.
pub fn split_train_val<T, R: Rng + ?Sized>(
    mut items:      Vec<T>,
    train_fraction: f64,
    rng:            &mut R,
) -> (Vec<T>, Vec<T>) {
    items.shuffle(rng);

    let total    = items.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).round() as usize;
    let val      = items.split_off(split_at.min(total));

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        items.len(),
        val.len()
    );

    (items, val)
}
