// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to corpora and trained models
// only through these traits, so a synthetic corpus and a real
// one (or a regression model and a pairwise one) are
// interchangeable.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::abstract_text::Abstract;

// ─── AbstractSource ───────────────────────────────────────────────────────────
/// Anything that can hand over a corpus of abstracts in gold order.
///
/// Implementations:
///   - SyntheticCorpus → seeded generator used for training runs
pub trait AbstractSource {
    fn load_all(&self) -> Result<Vec<Abstract>>;
}

// ─── SentenceOrderer ──────────────────────────────────────────────────────────
/// Anything that can predict the order of an abstract's sentences.
///
/// Returns indices into `abstract_text.sentences()`, first sentence first.
///
/// Implementations:
///   - Inferencer → regression or pairwise model from a checkpoint
pub trait SentenceOrderer {
    fn order(&self, abstract_text: &Abstract) -> Result<Vec<usize>>;
}
