// ============================================================
// Layer 4 — Variable-Length Batch Packer
// ============================================================
// Turns a list of variable-length sequences into something a
// recurrent encoder can consume in one batched call, and gives
// back the permutation that undoes the reordering afterwards.
//
//   sequences (ragged)
//       │  pad()          right-fill / truncate to target_length
//       ▼
//   PaddedBatch           [batch, max_len, dim] + true lengths
//       │  pack()         stable sort by descending length
//       ▼
//   PackedBatch           sorted rows + sort_order + restore_order
//       │  (encoder runs on sorted rows)
//       ▼
//   restore_rows()        gather by restore_order → input order
//
// The encoder needs non-increasing lengths; everything after
// the encoder needs the caller's original order. The two
// permutations stored here satisfy
//
//   restore_order[sort_order[i]] == i   for every i
//
// This module is pure Rust — no burn types — so the tensor side
// (ml::packing) can reuse the same sort plan.

use std::cmp::Reverse;

use thiserror::Error;

/// Every way a packing request can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PackError {
    fn invalid(msg: impl Into<String>) -> Self {
        PackError::InvalidInput(msg.into())
    }
}

pub type PackResult<T> = std::result::Result<T, PackError>;

// ─── Sequence ─────────────────────────────────────────────────────────────────
/// An ordered run of fixed-width `f32` vectors, stored row-major.
///
/// The width is stored explicitly so that an empty sequence still
/// knows its feature dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    data:  Vec<f32>,
    width: usize,
}

impl Sequence {
    /// Build from one `Vec<f32>` per step. All steps must share `width`.
    pub fn from_steps(steps: Vec<Vec<f32>>, width: usize) -> PackResult<Self> {
        if width == 0 {
            return Err(PackError::invalid("sequence width must be positive"));
        }
        let mut data = Vec::with_capacity(steps.len() * width);
        for (i, step) in steps.into_iter().enumerate() {
            if step.len() != width {
                return Err(PackError::invalid(format!(
                    "step {i} has width {} but sequence width is {width}",
                    step.len()
                )));
            }
            data.extend(step);
        }
        Ok(Self { data, width })
    }

    /// Build from an already-flattened buffer.
    pub fn from_flat(data: Vec<f32>, width: usize) -> PackResult<Self> {
        if width == 0 {
            return Err(PackError::invalid("sequence width must be positive"));
        }
        if data.len() % width != 0 {
            return Err(PackError::invalid(format!(
                "buffer of {} values is not a whole number of width-{width} steps",
                data.len()
            )));
        }
        Ok(Self { data, width })
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}

// ─── PaddedBatch ──────────────────────────────────────────────────────────────
/// A rectangular `[batch_size, max_length, feature_dim]` block plus the
/// true (pre-pad, post-truncate) length of every row.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedBatch {
    data:        Vec<f32>,
    batch_size:  usize,
    max_length:  usize,
    feature_dim: usize,
    lengths:     Vec<usize>,
}

impl PaddedBatch {
    /// Assemble a batch from raw parts, checking that the buffer and the
    /// lengths list agree with the declared shape.
    pub fn from_parts(
        data:        Vec<f32>,
        batch_size:  usize,
        max_length:  usize,
        feature_dim: usize,
        lengths:     Vec<usize>,
    ) -> PackResult<Self> {
        if batch_size == 0 {
            return Err(PackError::invalid("batch must contain at least one row"));
        }
        if lengths.len() != batch_size {
            return Err(PackError::invalid(format!(
                "{} true lengths supplied for {batch_size} rows",
                lengths.len()
            )));
        }
        if data.len() != batch_size * max_length * feature_dim {
            return Err(PackError::invalid(format!(
                "buffer holds {} values, shape [{batch_size}, {max_length}, {feature_dim}] needs {}",
                data.len(),
                batch_size * max_length * feature_dim
            )));
        }
        if let Some(&len) = lengths.iter().find(|&&l| l > max_length) {
            return Err(PackError::invalid(format!(
                "true length {len} exceeds max_length {max_length}"
            )));
        }
        Ok(Self { data, batch_size, max_length, feature_dim, lengths })
    }

    pub fn batch_size(&self) -> usize { self.batch_size }

    pub fn max_length(&self) -> usize { self.max_length }

    pub fn lengths(&self) -> &[usize] { &self.lengths }

    pub fn dims(&self) -> [usize; 3] {
        [self.batch_size, self.max_length, self.feature_dim]
    }

    pub fn as_flat(&self) -> &[f32] { &self.data }

    fn row_len(&self) -> usize {
        self.max_length * self.feature_dim
    }

    /// All `max_length * feature_dim` values of row `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        let n = self.row_len();
        &self.data[i * n..(i + 1) * n]
    }

    /// Copy rows out in the order given by `indices`.
    fn gather(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            data,
            batch_size:  self.batch_size,
            max_length:  self.max_length,
            feature_dim: self.feature_dim,
            lengths:     indices.iter().map(|&i| self.lengths[i]).collect(),
        }
    }
}

// ─── SortPlan ─────────────────────────────────────────────────────────────────
/// The pair of permutations produced by sorting a batch by length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortPlan {
    /// `sort_order[k]` = original index of the row placed at position `k`.
    pub sort_order:    Vec<usize>,
    /// `restore_order[i]` = sorted position holding original row `i`.
    pub restore_order: Vec<usize>,
}

impl SortPlan {
    /// Stable descending sort of `lengths`; equal lengths keep input order.
    pub fn from_lengths(lengths: &[usize]) -> Self {
        let mut sort_order: Vec<usize> = (0..lengths.len()).collect();
        // sort_by_key is a stable merge sort
        sort_order.sort_by_key(|&i| Reverse(lengths[i]));
        let restore_order = invert(&sort_order);
        Self { sort_order, restore_order }
    }

    pub fn is_identity(&self) -> bool {
        self.sort_order.iter().enumerate().all(|(k, &i)| k == i)
    }
}

/// Inverse of a permutation of `0..n`.
pub fn invert(permutation: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; permutation.len()];
    for (k, &i) in permutation.iter().enumerate() {
        inverse[i] = k;
    }
    inverse
}

// ─── PackedBatch ──────────────────────────────────────────────────────────────
/// A padded batch whose rows are sorted by non-increasing true length,
/// together with the permutations to get there and back.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBatch {
    batch: PaddedBatch,
    plan:  SortPlan,
}

impl PackedBatch {
    /// Rows in sorted order.
    pub fn batch(&self) -> &PaddedBatch { &self.batch }

    pub fn sorted_lengths(&self) -> &[usize] { self.batch.lengths() }

    pub fn sort_order(&self) -> &[usize] { &self.plan.sort_order }

    pub fn restore_order(&self) -> &[usize] { &self.plan.restore_order }

    /// Reorder per-sequence outputs (one item per sorted row) back into
    /// the caller's original order.
    pub fn restore_rows<T: Clone>(&self, sorted_rows: &[T]) -> PackResult<Vec<T>> {
        restore_rows(sorted_rows, &self.plan.restore_order)
    }
}

/// `out[i] = sorted_rows[restore_order[i]]`.
pub fn restore_rows<T: Clone>(sorted_rows: &[T], restore_order: &[usize]) -> PackResult<Vec<T>> {
    if sorted_rows.len() != restore_order.len() {
        return Err(PackError::invalid(format!(
            "{} output rows for a batch of {}",
            sorted_rows.len(),
            restore_order.len()
        )));
    }
    Ok(restore_order.iter().map(|&k| sorted_rows[k].clone()).collect())
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Resolve the padding length: explicit target, or the longest input.
pub fn resolve_target(lengths: &[usize], target_length: Option<usize>) -> PackResult<usize> {
    if lengths.is_empty() {
        return Err(PackError::invalid("cannot pad an empty list of sequences"));
    }
    let target = match target_length {
        Some(t) => t,
        None    => lengths.iter().copied().max().unwrap_or(0),
    };
    if target == 0 {
        return Err(PackError::invalid(match target_length {
            Some(_) => "target_length must be positive",
            None    => "every sequence is empty, no padding length can be inferred",
        }));
    }
    Ok(target)
}

/// Pad (or truncate) every sequence on the right to a common length.
///
/// Row order matches the input. The reported length of each row is
/// `min(original_length, target)`.
pub fn pad(
    sequences:     &[Sequence],
    target_length: Option<usize>,
    fill_value:    f32,
) -> PackResult<PaddedBatch> {
    let raw_lengths: Vec<usize> = sequences.iter().map(Sequence::len).collect();
    let target = resolve_target(&raw_lengths, target_length)?;

    let width = sequences[0].width();
    if let Some((i, s)) = sequences.iter().enumerate().find(|(_, s)| s.width() != width) {
        return Err(PackError::invalid(format!(
            "sequence {i} has width {} but sequence 0 has width {width}",
            s.width()
        )));
    }

    let mut data    = Vec::with_capacity(sequences.len() * target * width);
    let mut lengths = Vec::with_capacity(sequences.len());

    for seq in sequences {
        let kept = seq.len().min(target);
        data.extend_from_slice(&seq.as_flat()[..kept * width]);
        data.resize(data.len() + (target - kept) * width, fill_value);
        lengths.push(kept);
    }

    PaddedBatch::from_parts(data, sequences.len(), target, width, lengths)
}

/// Sort a padded batch by descending true length.
pub fn pack(batch: &PaddedBatch) -> PackedBatch {
    let plan = SortPlan::from_lengths(batch.lengths());
    let sorted = if plan.is_identity() {
        batch.clone()
    } else {
        batch.gather(&plan.sort_order)
    };
    PackedBatch { batch: sorted, plan }
}

/// `pad` followed by `pack`.
pub fn pad_and_pack(
    sequences:     &[Sequence],
    target_length: Option<usize>,
    fill_value:    f32,
) -> PackResult<PackedBatch> {
    let padded = pad(sequences, target_length, fill_value)?;
    tracing::trace!(
        "padded {} sequences to length {}",
        padded.batch_size(),
        padded.max_length()
    );
    Ok(pack(&padded))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// A width-1 sequence whose step values are `start, start+1, ...`.
    fn ramp(len: usize, start: f32) -> Sequence {
        let data = (0..len).map(|i| start + i as f32).collect();
        Sequence::from_flat(data, 1).unwrap()
    }

    fn with_lengths(lengths: &[usize]) -> Vec<Sequence> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &l)| ramp(l, (i * 100) as f32))
            .collect()
    }

    #[test]
    fn test_pads_short_sequence_with_fill() {
        let seq = Sequence::from_steps(
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            2,
        ).unwrap();
        let batch = pad(&[seq], Some(5), 0.0).unwrap();

        assert_eq!(batch.dims(), [1, 5, 2]);
        assert_eq!(batch.lengths(), &[3]);
        assert_eq!(
            batch.row(0),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_truncates_long_sequence() {
        let batch = pad(&[ramp(7, 1.0)], Some(5), 0.0).unwrap();
        assert_eq!(batch.lengths(), &[5]);
        assert_eq!(batch.row(0), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_nonzero_fill_value() {
        let batch = pad(&[ramp(1, 9.0)], Some(3), -1.0).unwrap();
        assert_eq!(batch.row(0), &[9.0, -1.0, -1.0]);
    }

    #[test]
    fn test_default_target_is_longest() {
        let batch = pad(&with_lengths(&[2, 4, 1]), None, 0.0).unwrap();
        assert_eq!(batch.max_length(), 4);
        assert_eq!(batch.lengths(), &[2, 4, 1]);
    }

    #[test]
    fn test_pad_keeps_input_order() {
        let batch = pad(&with_lengths(&[1, 3]), None, 0.0).unwrap();
        assert_eq!(batch.row(0)[0], 0.0);
        assert_eq!(batch.row(1)[0], 100.0);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = pad(&[], Some(3), 0.0).unwrap_err();
        assert!(matches!(err, PackError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_target_is_rejected() {
        assert!(pad(&with_lengths(&[2]), Some(0), 0.0).is_err());
    }

    #[test]
    fn test_all_empty_without_target_is_rejected() {
        assert!(pad(&with_lengths(&[0, 0]), None, 0.0).is_err());
    }

    #[test]
    fn test_empty_sequence_with_target_pads_fully() {
        let batch = pad(&with_lengths(&[0, 2]), Some(2), 7.0).unwrap();
        assert_eq!(batch.lengths(), &[0, 2]);
        assert_eq!(batch.row(0), &[7.0, 7.0]);
    }

    #[test]
    fn test_ragged_widths_are_rejected() {
        let a = Sequence::from_flat(vec![1.0, 2.0], 2).unwrap();
        let b = Sequence::from_flat(vec![1.0, 2.0, 3.0], 3).unwrap();
        assert!(pad(&[a, b], None, 0.0).is_err());
    }

    #[test]
    fn test_step_width_mismatch_is_rejected() {
        assert!(Sequence::from_steps(vec![vec![1.0], vec![1.0, 2.0]], 1).is_err());
    }

    #[test]
    fn test_zero_width_steps_are_rejected() {
        let err = Sequence::from_steps(vec![vec![], vec![], vec![]], 0).unwrap_err();
        assert!(matches!(err, PackError::InvalidInput(_)));
        assert!(Sequence::from_steps(Vec::new(), 0).is_err());
    }

    #[test]
    fn test_from_parts_rejects_mismatched_lengths() {
        let err = PaddedBatch::from_parts(vec![0.0; 4], 2, 2, 1, vec![1]).unwrap_err();
        assert!(matches!(err, PackError::InvalidInput(_)));
    }

    #[test]
    fn test_from_parts_rejects_wrong_buffer_size() {
        assert!(PaddedBatch::from_parts(vec![0.0; 3], 2, 2, 1, vec![1, 1]).is_err());
    }

    #[test]
    fn test_example_three_one_two() {
        let packed = pad_and_pack(&with_lengths(&[3, 1, 2]), None, 0.0).unwrap();
        assert_eq!(packed.sort_order(), &[0, 2, 1]);
        assert_eq!(packed.sorted_lengths(), &[3, 2, 1]);
        assert_eq!(packed.restore_order(), &[0, 2, 1]);
    }

    #[test]
    fn test_example_with_ties() {
        let packed = pad_and_pack(&with_lengths(&[2, 5, 1, 5]), None, 0.0).unwrap();
        assert_eq!(packed.sort_order(), &[1, 3, 0, 2]);
        assert_eq!(packed.restore_order(), &[2, 0, 3, 1]);
        assert_eq!(packed.sorted_lengths(), &[5, 5, 2, 1]);
        // rows moved with their lengths
        assert_eq!(packed.batch().row(0)[0], 100.0);
        assert_eq!(packed.batch().row(1)[0], 300.0);
    }

    #[test]
    fn test_equal_lengths_give_identity() {
        let packed = pad_and_pack(&with_lengths(&[4, 4, 4]), None, 0.0).unwrap();
        assert_eq!(packed.sort_order(), &[0, 1, 2]);
        assert_eq!(packed.restore_order(), &[0, 1, 2]);
    }

    #[test]
    fn test_single_row() {
        let packed = pad_and_pack(&with_lengths(&[3]), None, 0.0).unwrap();
        assert_eq!(packed.sort_order(), &[0]);
        assert_eq!(packed.restore_order(), &[0]);
    }

    #[test]
    fn test_restore_rows_recovers_input_order() {
        let packed = pad_and_pack(&with_lengths(&[2, 5, 1, 5]), None, 0.0).unwrap();
        // Pretend the encoder emitted the first value of each sorted row.
        let outputs: Vec<f32> = (0..4).map(|k| packed.batch().row(k)[0]).collect();
        let restored = packed.restore_rows(&outputs).unwrap();
        assert_eq!(restored, vec![0.0, 100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_restore_rows_rejects_wrong_count() {
        let packed = pad_and_pack(&with_lengths(&[2, 1]), None, 0.0).unwrap();
        assert!(packed.restore_rows(&[1.0]).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn prop_restore_inverts_sort(lengths in prop::collection::vec(0usize..12, 1..20)) {
                let plan = SortPlan::from_lengths(&lengths);
                for i in 0..lengths.len() {
                    prop_assert_eq!(plan.restore_order[plan.sort_order[i]], i);
                }
            }

            #[test]
            fn prop_equal_lengths_keep_input_order(lengths in prop::collection::vec(0usize..4, 1..20)) {
                let plan = SortPlan::from_lengths(&lengths);
                for w in plan.sort_order.windows(2) {
                    if lengths[w[0]] == lengths[w[1]] {
                        prop_assert!(w[0] < w[1]);
                    }
                }
            }

            #[test]
            fn prop_sorted_lengths_non_increasing(
                lengths in prop::collection::vec(1usize..12, 1..20),
                target in prop::option::of(1usize..10),
            ) {
                let packed = pad_and_pack(&with_lengths(&lengths), target, 0.0).unwrap();
                for w in packed.sorted_lengths().windows(2) {
                    prop_assert!(w[0] >= w[1]);
                }
            }

            #[test]
            fn prop_true_length_is_capped(
                lengths in prop::collection::vec(0usize..12, 1..20),
                target in 1usize..10,
            ) {
                let batch = pad(&with_lengths(&lengths), Some(target), 0.0).unwrap();
                for (&raw, &kept) in lengths.iter().zip(batch.lengths()) {
                    prop_assert_eq!(kept, raw.min(target));
                }
            }

            #[test]
            fn prop_round_trip_reproduces_padded_batch(
                lengths in prop::collection::vec(1usize..8, 1..12),
            ) {
                let seqs   = with_lengths(&lengths);
                let padded = pad(&seqs, None, 0.0).unwrap();
                let packed = pack(&padded);
                let rows: Vec<Vec<f32>> = (0..padded.batch_size())
                    .map(|k| packed.batch().row(k).to_vec())
                    .collect();
                let restored = packed.restore_rows(&rows).unwrap();
                for (i, row) in restored.iter().enumerate() {
                    prop_assert_eq!(row.as_slice(), padded.row(i));
                }
            }
        }
    }
}
