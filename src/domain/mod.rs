// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust value types for the sentence-ordering problem:
// an Abstract is an ordered list of Sentences, and the task
// is to recover that order after the sentences are shuffled.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Values are immutable once built; construction goes
//     through factory functions that validate their input
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Sentences and abstracts with their gold positions
pub mod abstract_text;

/// Core abstractions (traits) that other layers implement
pub mod traits;
