// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. The data layer hands over plain
// PaddedBatch / PackedBatch values; this layer turns them into
// burn tensors and runs the networks.
//
//   packing.rs    — PackedBatch → Tensor, plus tensor-side
//                   pad/pack that keeps autograd intact
//   encoder.rs    — Bidirectional LSTM over packed rows
//   targets.rs    — Labels, regression targets, order decoding
//   model.rs      — OrderingModel: sentence encoder + the head
//                   for the chosen objective
//   trainer.rs    — Epoch loop, Adam, checkpoint per epoch
//   inferencer.rs — Checkpoint → predicted sentence orders
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM

pub mod packing;

/// BiLSTM sentence / paragraph encoder
pub mod encoder;

pub mod targets;

/// Ordering model and its two objective heads
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and predicts orders
pub mod inferencer;
