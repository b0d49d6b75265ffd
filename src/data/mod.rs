// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a corpus of abstracts and the rectangular
// f32 blocks the encoder consumes. No burn tensors are built
// here; the ml layer uploads the finished batches.
//
//   AbstractSource (SyntheticCorpus)
//       │
//       ▼
//   AbstractDataset   → length filter, random / sequential batches
//       │
//       ▼
//   AbstractBatch     → flatten sentences, embed tokens
//       │               (EmbeddingTable passed in by reference)
//       ▼
//   packer            → pad / truncate, sort by length,
//                       remember how to restore order
//
// Reference: Burn Book §4 (Datasets)

/// Pad, sort and restore variable-length batches
pub mod packer;

/// Token → vector lookup
pub mod embedding;

/// Groups abstracts and flattens their sentences
pub mod batcher;

/// Implements Burn's Dataset trait for abstracts
pub mod dataset;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Seeded corpus and embedding generator
pub mod synthetic;
