// ============================================================
// Layer 4 — Abstract Batcher
// ============================================================
// Groups several abstracts so all of their sentences can be
// encoded in a single recurrent-encoder call.
//
// How batching works here:
//   Input:  N abstracts with n_1, n_2, ..., n_N sentences
//   Output: one PackedBatch of (n_1 + ... + n_N) sentence rows,
//           each row = token vectors padded to `max_tokens`
//
//   Rows are flattened abstract by abstract:
//     [a1.s0, a1.s1, a1.s2, a2.s0, a2.s1, ...]
//
//   After the encoder has run (and its output has been put
//   back into this flattened order), `sentence_spans()` tells
//   the caller which rows belong to which abstract:
//     a1 → 0..3, a2 → 3..5, ...

use std::ops::Range;

use anyhow::{bail, Result};

use crate::data::embedding::EmbeddingTable;
use crate::data::packer::{pad_and_pack, PackedBatch, Sequence};
use crate::domain::abstract_text::Abstract;

/// Default cap on tokens per sentence.
pub const MAX_SENTENCE_TOKENS: usize = 50;

/// Value used for padded token slots.
pub const PAD_VALUE: f32 = 0.0;

#[derive(Debug, Clone)]
pub struct AbstractBatch {
    abstracts: Vec<Abstract>,
}

impl AbstractBatch {
    pub fn new(abstracts: Vec<Abstract>) -> Result<Self> {
        if abstracts.is_empty() {
            bail!("a batch needs at least one abstract");
        }
        Ok(Self { abstracts })
    }

    pub fn abstracts(&self) -> &[Abstract] {
        &self.abstracts
    }

    pub fn len(&self) -> usize {
        self.abstracts.len()
    }

    /// Total number of sentences across the batch.
    pub fn sentence_count(&self) -> usize {
        self.abstracts.iter().map(Abstract::len).sum()
    }

    /// Every sentence embedded, abstract by abstract.
    pub fn sentence_sequences(&self, table: &EmbeddingTable) -> Result<Vec<Sequence>> {
        self.abstracts
            .iter()
            .flat_map(|ab| ab.sentences())
            .map(|s| table.sentence_sequence(s))
            .collect()
    }

    /// Embed, pad to `max_tokens` and sort by length.
    pub fn packed_sentences(
        &self,
        table:      &EmbeddingTable,
        max_tokens: usize,
    ) -> Result<PackedBatch> {
        let sequences = self.sentence_sequences(table)?;
        Ok(pad_and_pack(&sequences, Some(max_tokens), PAD_VALUE)?)
    }

    /// Row range of each abstract inside the flattened sentence list.
    pub fn sentence_spans(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.abstracts
            .iter()
            .map(|ab| {
                let span = start..start + ab.len();
                start = span.end;
                span
            })
            .collect()
    }

    /// Split a flattened per-sentence output back into one slice per
    /// abstract.
    pub fn unpack_sentences<'a, T>(&self, encoded: &'a [T]) -> Result<Vec<&'a [T]>> {
        if encoded.len() != self.sentence_count() {
            bail!(
                "{} encoded rows for {} sentences",
                encoded.len(),
                self.sentence_count()
            );
        }
        Ok(self.sentence_spans().into_iter().map(|r| &encoded[r]).collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn ab(lengths: &[usize]) -> Abstract {
        Abstract::from_token_lists(
            lengths
                .iter()
                .map(|&n| (0..n).map(|i| format!("w{i}")).collect())
                .collect(),
        ).unwrap()
    }

    fn table() -> EmbeddingTable {
        EmbeddingTable::from_entries(
            1,
            (0..10).map(|i| (format!("w{i}"), vec![i as f32 + 1.0])),
        ).unwrap()
    }

    #[test]
    fn test_spans_cover_every_sentence() {
        let batch = AbstractBatch::new(vec![ab(&[1, 2, 3]), ab(&[4, 5])]).unwrap();
        assert_eq!(batch.sentence_count(), 5);
        assert_eq!(batch.sentence_spans(), vec![0..3, 3..5]);
    }

    #[test]
    fn test_packed_sentences_sort_by_token_count() {
        let batch  = AbstractBatch::new(vec![ab(&[1, 3]), ab(&[2])]).unwrap();
        let packed = batch.packed_sentences(&table(), 5).unwrap();
        assert_eq!(packed.batch().dims(), [3, 5, 1]);
        assert_eq!(packed.sorted_lengths(), &[3, 2, 1]);
        assert_eq!(packed.sort_order(), &[1, 2, 0]);
    }

    #[test]
    fn test_long_sentences_are_capped() {
        let batch  = AbstractBatch::new(vec![ab(&[8])]).unwrap();
        let packed = batch.packed_sentences(&table(), 4).unwrap();
        assert_eq!(packed.sorted_lengths(), &[4]);
    }

    #[test]
    fn test_unpack_groups_by_abstract() {
        let batch   = AbstractBatch::new(vec![ab(&[1, 1]), ab(&[1, 1, 1])]).unwrap();
        let encoded = vec!['a', 'b', 'c', 'd', 'e'];
        let groups  = batch.unpack_sentences(&encoded).unwrap();
        assert_eq!(groups, vec![&['a', 'b'][..], &['c', 'd', 'e'][..]]);
    }

    #[test]
    fn test_unpack_rejects_wrong_row_count() {
        let batch = AbstractBatch::new(vec![ab(&[1, 1])]).unwrap();
        assert!(batch.unpack_sentences(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(AbstractBatch::new(Vec::new()).is_err());
    }
}
