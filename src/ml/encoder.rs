// ============================================================
// Layer 5 — Bidirectional LSTM Encoder
// ============================================================
// Encodes each row of a PackedTensor into one vector:
//
//   [batch, max_len, in_dim]  →  [batch, 2 * hidden_dim]
//
// burn's Lstm runs over the full padded length, so packed-
// sequence behaviour is rebuilt by hand:
//
//   forward  direction: run over the padded rows, read the
//                       output at step len-1 (padding after
//                       that step never reaches it)
//
//   backward direction: reverse each row *within its true
//                       length* first, then do the same:
//
//                       [a b c _ _]  →  [c b a _ _]
//
// The two final states are concatenated and the rows are
// gathered back into the caller's original order.

use anyhow::{bail, Result};
use burn::{
    nn::{Lstm, LstmConfig},
    prelude::*,
};

use crate::ml::packing::PackedTensor;

#[derive(Config, Debug)]
pub struct SentenceEncoderConfig {
    pub input_dim:  usize,
    pub hidden_dim: usize,
}

impl SentenceEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SentenceEncoder<B> {
        SentenceEncoder {
            forward_lstm:  LstmConfig::new(self.input_dim, self.hidden_dim, true).init(device),
            backward_lstm: LstmConfig::new(self.input_dim, self.hidden_dim, true).init(device),
            hidden_dim:    self.hidden_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct SentenceEncoder<B: Backend> {
    pub forward_lstm:  Lstm<B>,
    pub backward_lstm: Lstm<B>,
    pub hidden_dim:    usize,
}

impl<B: Backend> SentenceEncoder<B> {
    /// Width of one encoded row.
    pub fn output_dim(&self) -> usize {
        2 * self.hidden_dim
    }

    /// Encode every row and return them in original (pre-sort) order.
    pub fn forward(&self, packed: &PackedTensor<B>) -> Result<Tensor<B, 2>> {
        if let Some(k) = packed.lengths.iter().position(|&l| l == 0) {
            bail!(
                "cannot encode an empty sequence (sorted row {k}, original row {})",
                packed.restore_order.iter().position(|&r| r == k).unwrap_or(k)
            );
        }

        let x        = packed.batch.clone();
        let reversed = reverse_within_length(x.clone(), &packed.lengths);

        let (fwd_out, _) = self.forward_lstm.forward(x, None);
        let (bwd_out, _) = self.backward_lstm.forward(reversed, None);

        let encoded = Tensor::cat(
            vec![
                last_step(fwd_out, &packed.lengths),
                last_step(bwd_out, &packed.lengths),
            ],
            1,
        );

        Ok(packed.restore(encoded))
    }
}

/// Output at step `len - 1` of every row: `[b, t, h] → [b, h]`.
fn last_step<B: Backend>(output: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2> {
    let [batch, _, hidden] = output.dims();
    let indices: Vec<i32> = lengths
        .iter()
        .flat_map(|&l| std::iter::repeat((l - 1) as i32).take(hidden))
        .collect();
    let indices = Tensor::<B, 1, Int>::from_ints(indices.as_slice(), &output.device())
        .reshape([batch, 1, hidden]);
    output.gather(1, indices).reshape([batch, hidden])
}

/// Flip the first `len` steps of each row, leaving padding in place.
fn reverse_within_length<B: Backend>(x: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 3> {
    let [batch, steps, dim] = x.dims();
    let mut indices = Vec::with_capacity(batch * steps * dim);
    for &len in lengths {
        for t in 0..steps {
            let src = if t < len { len - 1 - t } else { t };
            indices.extend(std::iter::repeat(src as i32).take(dim));
        }
    }
    let indices = Tensor::<B, 1, Int>::from_ints(indices.as_slice(), &x.device())
        .reshape([batch, steps, dim]);
    x.gather(1, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::packer::{pad_and_pack, Sequence};
    use crate::ml::packing::pad_and_pack_tensors;

    type TestBackend = burn::backend::NdArray;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    fn rows(lengths: &[usize], dim: usize) -> Vec<Tensor<TestBackend, 2>> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &l)| {
                let values: Vec<f32> = (0..l * dim).map(|k| ((i + 1) * (k + 1)) as f32 * 0.1).collect();
                Tensor::<TestBackend, 1>::from_floats(values.as_slice(), &device()).reshape([l, dim])
            })
            .collect()
    }

    #[test]
    fn test_reverse_within_length() {
        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 7.0], &device())
            .reshape([2, 4, 1]);
        let r = reverse_within_length(x, &[3, 4]);
        assert_eq!(
            r.into_data().to_vec::<f32>().unwrap(),
            vec![3.0, 2.0, 1.0, 0.0, 7.0, 6.0, 5.0, 4.0]
        );
    }

    #[test]
    fn test_last_step_reads_true_end() {
        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &device())
            .reshape([2, 3, 1]);
        let last = last_step(x, &[2, 3]);
        assert_eq!(last.into_data().to_vec::<f32>().unwrap(), vec![2.0, 6.0]);
    }

    #[test]
    fn test_output_shape() {
        let encoder = SentenceEncoderConfig::new(3, 4).init::<TestBackend>(&device());
        let packed  = pad_and_pack_tensors(rows(&[2, 5, 1], 3), None, 0.0).unwrap();
        let out     = encoder.forward(&packed).unwrap();
        assert_eq!(out.dims(), [3, 8]);
        assert_eq!(encoder.output_dim(), 8);
    }

    #[test]
    fn test_encoding_ignores_padding_and_batch_order() {
        // Encoding a sequence alone and inside a batch (where it is
        // padded and moved by the sort) must give the same vector.
        let encoder = SentenceEncoderConfig::new(2, 3).init::<TestBackend>(&device());

        let batch = rows(&[2, 6, 4], 2);
        let alone = vec![batch[0].clone()];

        let in_batch = encoder
            .forward(&pad_and_pack_tensors(batch, None, 0.0).unwrap())
            .unwrap()
            .slice([0..1, 0..6]);
        let solo = encoder
            .forward(&pad_and_pack_tensors(alone, None, 0.0).unwrap())
            .unwrap();

        let a = in_batch.into_data().to_vec::<f32>().unwrap();
        let b = solo.into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_empty_row_is_rejected() {
        let encoder = SentenceEncoderConfig::new(1, 2).init::<TestBackend>(&device());
        let seqs = vec![
            Sequence::from_flat(vec![1.0, 2.0], 1).unwrap(),
            Sequence::from_flat(Vec::new(), 1).unwrap(),
        ];
        let pure   = pad_and_pack(&seqs, Some(2), 0.0).unwrap();
        let packed = PackedTensor::<TestBackend>::from_packed(&pure, &device());
        assert!(encoder.forward(&packed).is_err());
    }
}
