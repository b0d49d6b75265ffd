// ============================================================
// Layer 5 — Training Targets and Order Decoding
// ============================================================
// The tensor-free half of each objective: which examples to
// build, what label each one gets, and how model scores are
// turned back into a sentence order.
//
// Position regression:
//   sentence i of n  →  target  i / (n - 1) * 100
//   (0 → first sentence, 100 → last; a lone sentence gets 0)
//   order = sentences sorted by predicted position, ascending
//
// Pairwise classification:
//   adjacent pair (i, i+1) in gold order → label 1
//   the same pair swapped                → label 0
//   order = sentences sorted by Σ_j P(i before j), descending
//
// Left-right windows:
//   a random run of ≥ 2 consecutive sentences, plus the
//   sentence just before and just after it (if any)
//   each sentence of the run → FIRST / MIDDLE / LAST
//   order = repeatedly pick the likeliest FIRST sentence
//
// Shuffle discrimination:
//   gold order → 1, one random permutation → 0
//   order = best-scoring candidate permutation

use std::cmp::Ordering;

use rand::{seq::SliceRandom, Rng};

/// Upper end of the regression target scale.
pub const POSITION_SCALE: f32 = 100.0;

/// Window classes for the left-right objective.
pub const WINDOW_FIRST:  i32 = 0;
pub const WINDOW_MIDDLE: i32 = 1;
pub const WINDOW_LAST:   i32 = 2;

/// Up to this many sentences every permutation is scored.
pub const EXHAUSTIVE_ORDER_LIMIT: usize = 5;

/// Random permutations scored for longer abstracts.
pub const SAMPLED_ORDERS: usize = 200;

/// Regression target for sentence `i` of an `n`-sentence abstract.
pub fn position_target(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32 * POSITION_SCALE
    }
}

/// `(first, second, label)` for every adjacent pair, both ways round.
pub fn adjacent_pairs(n: usize) -> Vec<(usize, usize, i32)> {
    (1..n)
        .flat_map(|i| [(i - 1, i, 1), (i, i - 1, 0)])
        .collect()
}

/// Every ordered pair `(i, j)` with `i != j`.
pub fn all_ordered_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect()
}

/// Indices sorted by ascending predicted position; ties keep index order.
pub fn order_from_positions(predicted: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..predicted.len()).collect();
    order.sort_by(|&a, &b| predicted[a].total_cmp(&predicted[b]));
    order
}

/// Order from pairwise "i comes before j" probabilities.
///
/// `pairs` and `before` are parallel: `before[k]` is P(pairs[k].0 precedes
/// pairs[k].1).
pub fn order_from_pair_scores(n: usize, pairs: &[(usize, usize)], before: &[f32]) -> Vec<usize> {
    let mut scores = vec![0.0f32; n];
    for (&(i, _), &p) in pairs.iter().zip(before) {
        scores[i] += p;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    order
}

/// A contiguous run `start..end` of sentences and the neighbours on
/// either side of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end:   usize,
    pub left:  Option<usize>,
    pub right: Option<usize>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// `FIRST` / `MIDDLE` / `LAST` for each sentence of the run.
    pub fn labels(&self) -> Vec<i32> {
        (0..self.len()).map(|i| window_label(i, self.len())).collect()
    }
}

pub fn window_label(i: usize, len: usize) -> i32 {
    if i == 0 {
        WINDOW_FIRST
    } else if i + 1 == len {
        WINDOW_LAST
    } else {
        WINDOW_MIDDLE
    }
}

/// A window of random size (at least 2) at a random offset, or `None`
/// when the abstract has a single sentence.
pub fn random_window<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Option<Window> {
    if n < 2 {
        return None;
    }
    let size  = rng.gen_range(2..=n);
    let start = rng.gen_range(0..=n - size);
    let end   = start + size;
    Some(Window {
        start,
        end,
        left:  start.checked_sub(1),
        right: (end < n).then_some(end),
    })
}

/// The gold order labelled 1 and a random permutation labelled 0.
pub fn shuffle_examples<R: Rng + ?Sized>(n: usize, rng: &mut R) -> [(Vec<usize>, i32); 2] {
    let gold: Vec<usize> = (0..n).collect();
    let mut shuffled = gold.clone();
    shuffled.shuffle(rng);
    [(gold, 1), (shuffled, 0)]
}

/// Every permutation of `0..n`, in lexicographic order.
pub fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(prefix: &mut Vec<usize>, used: &mut [bool], out: &mut Vec<Vec<usize>>) {
        if prefix.len() == used.len() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..used.len() {
            if !used[i] {
                used[i] = true;
                prefix.push(i);
                extend(prefix, used, out);
                prefix.pop();
                used[i] = false;
            }
        }
    }
    let mut out = Vec::new();
    extend(&mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

/// Orders the shuffle discriminator chooses between: all of them for
/// short abstracts, otherwise the input order plus random samples.
pub fn candidate_orders<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Vec<usize>> {
    if n <= EXHAUSTIVE_ORDER_LIMIT {
        return permutations(n);
    }
    let identity: Vec<usize> = (0..n).collect();
    let mut candidates = Vec::with_capacity(SAMPLED_ORDERS + 1);
    candidates.push(identity.clone());
    for _ in 0..SAMPLED_ORDERS {
        let mut order = identity.clone();
        order.shuffle(rng);
        candidates.push(order);
    }
    candidates
}

/// Index of the largest score; the earliest one wins a tie.
pub fn best_index(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
            Some((_, b)) if s.total_cmp(&b) != Ordering::Greater => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}
