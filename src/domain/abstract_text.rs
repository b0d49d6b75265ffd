// ============================================================
// Layer 3 — Sentence and Abstract Domain Types
// ============================================================
// A Sentence is a list of tokens plus the position it held in
// its abstract. Shuffling an Abstract permutes the sentence
// list but every Sentence keeps its gold position, so the
// correct answer always travels with the data.
//
// Example:
//   gold:     [s0, s1, s2, s3]
//   shuffled: [s2, s0, s3, s1]
//   gold_order() of the shuffled abstract = [1, 3, 0, 2]
//     (index of s0, then s1, then s2, then s3)

use anyhow::{bail, Result};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

/// One tokenised sentence and its gold position in the abstract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    position: usize,
    tokens:   Vec<String>,
}

impl Sentence {
    /// Rejects sentences with no tokens: the encoder cannot read an
    /// empty sequence.
    pub fn new(position: usize, tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            bail!("sentence at position {position} has no tokens");
        }
        Ok(Self { position, tokens })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// An ordered (or shuffled) collection of sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstract {
    sentences: Vec<Sentence>,
}

impl Abstract {
    /// Build an abstract in gold order: sentence `i` gets position `i`.
    pub fn from_token_lists(token_lists: Vec<Vec<String>>) -> Result<Self> {
        let sentences = token_lists
            .into_iter()
            .enumerate()
            .map(|(i, tokens)| Sentence::new(i, tokens))
            .collect::<Result<Vec<_>>>()?;
        Self::from_sentences(sentences)
    }

    /// Build from sentences that already carry positions.
    /// The positions must be exactly `0..n` in some order.
    pub fn from_sentences(sentences: Vec<Sentence>) -> Result<Self> {
        if sentences.is_empty() {
            bail!("an abstract needs at least one sentence");
        }
        let mut seen = vec![false; sentences.len()];
        for s in &sentences {
            match seen.get_mut(s.position) {
                Some(slot) if !*slot => *slot = true,
                _ => bail!(
                    "sentence positions must be a permutation of 0..{}, got {}",
                    sentences.len(),
                    s.position
                ),
            }
        }
        Ok(Self { sentences })
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// A copy with the sentence list permuted uniformly at random.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut sentences = self.sentences.clone();
        sentences.shuffle(rng);
        Self { sentences }
    }

    /// Indices into `sentences()` listed in gold order, i.e. the answer
    /// a perfect orderer would return.
    pub fn gold_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.sentences.len()).collect();
        order.sort_by_key(|&i| self.sentences[i].position);
        order
    }

    /// Rebuild the abstract with its sentences listed in `order`.
    pub fn reordered(&self, order: &[usize]) -> Result<Self> {
        if order.len() != self.len() {
            bail!("order has {} entries for {} sentences", order.len(), self.len());
        }
        let sentences = order
            .iter()
            .map(|&i| {
                self.sentences
                    .get(i)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("order index {i} out of range"))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_sentences(sentences)
    }
}
