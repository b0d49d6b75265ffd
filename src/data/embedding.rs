// ============================================================
// Layer 4 — Embedding Table
// ============================================================
// Maps tokens to fixed-width word vectors.
//
// The table is an ordinary value: whoever builds it (the use
// case) owns it and passes `&EmbeddingTable` into every call
// that needs to embed a sentence. Nothing reads vectors from
// process-wide state.
//
// Unknown tokens embed as the zero vector, so a sentence made
// entirely of unknown words still has its true length.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::data::packer::Sequence;
use crate::domain::abstract_text::Sentence;

#[derive(Debug, Clone, Default)]
pub struct EmbeddingTable {
    dim:     usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    pub fn new(dim: usize) -> Self {
        Self { dim, vectors: HashMap::new() }
    }

    /// Build a table from `(token, vector)` pairs. Every vector must be
    /// `dim` wide.
    pub fn from_entries<I>(dim: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut table = Self::new(dim);
        for (token, vector) in entries {
            table.insert(token, vector)?;
        }
        Ok(table)
    }

    /// Add or replace one vector.
    pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        let token = token.into();
        if vector.len() != self.dim {
            bail!(
                "vector for '{}' has width {}, table width is {}",
                token,
                vector.len(),
                self.dim
            );
        }
        self.vectors.insert(token, vector);
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.vectors.contains_key(token)
    }

    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    /// One row per token; unknown tokens become zeros.
    pub fn sentence_sequence(&self, sentence: &Sentence) -> Result<Sequence> {
        let steps = sentence
            .tokens()
            .iter()
            .map(|token| match self.vectors.get(token) {
                Some(v) => v.clone(),
                None    => vec![0.0; self.dim],
            })
            .collect();
        Ok(Sequence::from_steps(steps, self.dim)?)
    }
}
