// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
//   checkpoint.rs — Saving and loading model weights
//                   with Burn's CompactRecorder, plus the
//                   TrainConfig as JSON so inference can
//                   rebuild the model, embedding table and
//                   held-out split.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;
