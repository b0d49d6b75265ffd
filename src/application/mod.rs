// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: these use cases tell the data,
// ml and infra layers what to do, in which order, with which
// seed. No tensor code and no printing here (that's Layer 1).
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Training run: corpus → split → train loop → checkpoints
pub mod train_use_case;

// Reorder shuffled held-out abstracts with a checkpoint
pub mod order_use_case;
