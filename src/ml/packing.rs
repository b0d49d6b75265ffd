// ============================================================
// Layer 5 — Tensor Packing
// ============================================================
// The burn-side counterpart of data::packer.
//
// Two ways into a PackedTensor:
//
//   1. from_packed()  — upload a PackedBatch that was padded
//                       and sorted in plain Rust (token vectors,
//                       which carry no gradient history)
//
//   2. pad_and_pack_tensors()
//                     — pad/sort tensors produced by the model
//                       itself (paragraph contexts built from
//                       encoder output). Padding is done with
//                       cat/select so gradients still flow back
//                       into the sentence encoder.
//
// Both use the same SortPlan, so the rules are identical:
// stable descending-length order, truncation to the target,
// restore_order = inverse of sort_order.

use anyhow::Result;
use burn::prelude::*;

use crate::data::packer::{resolve_target, PackError, PackedBatch, SortPlan};

/// A length-sorted `[batch, max_len, dim]` tensor ready for the encoder.
#[derive(Debug, Clone)]
pub struct PackedTensor<B: Backend> {
    /// Rows sorted by non-increasing true length.
    pub batch:         Tensor<B, 3>,
    /// True length of each sorted row.
    pub lengths:       Vec<usize>,
    /// `restore_order[i]` = sorted row holding original row `i`.
    pub restore_order: Vec<usize>,
}

impl<B: Backend> PackedTensor<B> {
    /// Upload a packed batch to `device`.
    pub fn from_packed(packed: &PackedBatch, device: &B::Device) -> Self {
        let [batch_size, max_len, dim] = packed.batch().dims();
        let batch = Tensor::<B, 1>::from_floats(packed.batch().as_flat(), device)
            .reshape([batch_size, max_len, dim]);
        Self {
            batch,
            lengths:       packed.sorted_lengths().to_vec(),
            restore_order: packed.restore_order().to_vec(),
        }
    }

    /// Gather per-sequence encoder output (first dim = sorted rows) back
    /// into the original order.
    pub fn restore<const D: usize>(&self, sorted_output: Tensor<B, D>) -> Tensor<B, D> {
        let indices = index_tensor::<B>(&self.restore_order, &sorted_output.device());
        sorted_output.select(0, indices)
    }
}

/// `usize` indices as a 1-D Int tensor.
pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ints: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device)
}

/// Pad (or truncate) `[len_i, dim]` tensors on the right to a common length
/// and stack them into `[batch, target, dim]`. Row order is unchanged.
pub fn pad_tensors<B: Backend>(
    sequences:     Vec<Tensor<B, 2>>,
    target_length: Option<usize>,
    fill_value:    f32,
) -> Result<(Tensor<B, 3>, Vec<usize>)> {
    let raw_lengths: Vec<usize> = sequences.iter().map(|s| s.dims()[0]).collect();
    let target = resolve_target(&raw_lengths, target_length)?;

    let width  = sequences[0].dims()[1];
    let device = sequences[0].device();
    if let Some(i) = sequences.iter().position(|s| s.dims()[1] != width) {
        return Err(PackError::InvalidInput(format!(
            "tensor {i} has width {} but tensor 0 has width {width}",
            sequences[i].dims()[1]
        )).into());
    }

    let mut rows    = Vec::with_capacity(sequences.len());
    let mut lengths = Vec::with_capacity(sequences.len());

    for seq in sequences {
        let len  = seq.dims()[0];
        let kept = len.min(target);

        let row = if kept == 0 {
            Tensor::full([target, width], fill_value, &device)
        } else {
            let head = if len > target { seq.slice([0..target]) } else { seq };
            if kept < target {
                let filler = Tensor::full([target - kept, width], fill_value, &device);
                Tensor::cat(vec![head, filler], 0)
            } else {
                head
            }
        };

        rows.push(row.unsqueeze::<3>());
        lengths.push(kept);
    }

    Ok((Tensor::cat(rows, 0), lengths))
}

/// Sort a padded tensor by descending true length.
pub fn pack_tensor<B: Backend>(batch: Tensor<B, 3>, lengths: Vec<usize>) -> Result<PackedTensor<B>> {
    let rows = batch.dims()[0];
    if lengths.len() != rows {
        return Err(PackError::InvalidInput(format!(
            "{} true lengths supplied for {rows} rows",
            lengths.len()
        )).into());
    }

    let plan = SortPlan::from_lengths(&lengths);
    let batch = if plan.is_identity() {
        batch
    } else {
        let indices = index_tensor::<B>(&plan.sort_order, &batch.device());
        batch.select(0, indices)
    };
    let lengths = plan.sort_order.iter().map(|&i| lengths[i]).collect();

    Ok(PackedTensor { batch, lengths, restore_order: plan.restore_order })
}

/// `pad_tensors` followed by `pack_tensor`.
pub fn pad_and_pack_tensors<B: Backend>(
    sequences:     Vec<Tensor<B, 2>>,
    target_length: Option<usize>,
    fill_value:    f32,
) -> Result<PackedTensor<B>> {
    let (batch, lengths) = pad_tensors(sequences, target_length, fill_value)?;
    pack_tensor(batch, lengths)
}
