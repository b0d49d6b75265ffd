// ============================================================
// Layer 5 — Ordering Model
// ============================================================
// One sentence encoder shared by four training signals:
//
//   pairwise    cat(s_a, s_b)                     → {swapped, in order}
//   regression  cat(context, s_i, n)              → position 0..100
//   left-right  cat(left, context, right, s_i, m) → FIRST / MIDDLE / LAST
//   shuffle     [0 .. 0, s_π(0) .. s_π(n-1)]      → P(π is the gold order)
//
// "context" is a paragraph vector: the sentence followed by its
// paragraph (or window) in random order, packed with a cap of
// CONTEXT_LENGTH and run through a second BiLSTM.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};
use burn::{
    nn::{
        loss::{BinaryCrossEntropyLossConfig, CrossEntropyLossConfig, MseLoss, Reduction},
        Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu, sigmoid, softmax},
};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::AbstractBatch, embedding::EmbeddingTable};
use crate::ml::encoder::{SentenceEncoder, SentenceEncoderConfig};
use crate::ml::packing::{index_tensor, pad_and_pack_tensors, PackedTensor};
use crate::ml::targets::{
    adjacent_pairs, all_ordered_pairs, best_index, candidate_orders, order_from_pair_scores,
    order_from_positions, position_target, random_window, shuffle_examples, Window, WINDOW_FIRST,
};

/// Longest paragraph context fed to the context encoder, and the length
/// the shuffle discriminator left-pads abstracts to.
pub const CONTEXT_LENGTH: usize = 10;

/// Which training signal the model learns from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    /// Is sentence A directly followed by sentence B?
    Pairwise,
    /// Where in the abstract does this sentence sit (0..100)?
    Regression,
    /// Does this sentence open, continue or close its window?
    LeftRight,
    /// Is this run of sentences in its original order?
    Shuffle,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::Pairwise,
        Objective::Regression,
        Objective::LeftRight,
        Objective::Shuffle,
    ];
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Pairwise   => f.write_str("pairwise"),
            Objective::Regression => f.write_str("regression"),
            Objective::LeftRight  => f.write_str("left-right"),
            Objective::Shuffle    => f.write_str("shuffle"),
        }
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pairwise"                  => Ok(Objective::Pairwise),
            "regression"                => Ok(Objective::Regression),
            "left-right" | "left_right" => Ok(Objective::LeftRight),
            "shuffle"                   => Ok(Objective::Shuffle),
            other => Err(format!(
                "unknown objective '{other}' (pairwise | regression | left-right | shuffle)"
            )),
        }
    }
}

// ─── Heads ────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct PairClassifierConfig {
    /// Width of one encoded sentence.
    pub sentence_dim: usize,
    pub hidden_dim:   usize,
    #[config(default = 0.5)]
    pub dropout:      f64,
}

impl PairClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PairClassifier<B> {
        PairClassifier {
            hidden:  LinearConfig::new(2 * self.sentence_dim, self.hidden_dim).init(device),
            out:     LinearConfig::new(self.hidden_dim, 2).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// `cat(s_a, s_b)` → logits for {out of order, in order}.
#[derive(Module, Debug)]
pub struct PairClassifier<B: Backend> {
    pub hidden:  Linear<B>,
    pub out:     Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> PairClassifier<B> {
    pub fn forward(&self, pairs: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden.forward(self.dropout.forward(pairs)));
        self.out.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct FeedForwardHeadConfig {
    pub input_dim:  usize,
    pub hidden_dim: usize,
    pub outputs:    usize,
    #[config(default = 5)]
    pub depth:      usize,
}

impl FeedForwardHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForwardHead<B> {
        let mut layers = vec![LinearConfig::new(self.input_dim, self.hidden_dim).init(device)];
        for _ in 1..self.depth.max(1) {
            layers.push(LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device));
        }
        FeedForwardHead {
            layers,
            out: LinearConfig::new(self.hidden_dim, self.outputs).init(device),
        }
    }
}

/// Stack of ReLU layers ending in `outputs` values per row: the position
/// regressor (one output) and the window classifier (three logits).
#[derive(Module, Debug)]
pub struct FeedForwardHead<B: Backend> {
    pub layers: Vec<Linear<B>>,
    pub out:    Linear<B>,
}

impl<B: Backend> FeedForwardHead<B> {
    /// `[rows, input_dim]` → `[rows, outputs]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut y = x;
        for layer in &self.layers {
            y = relu(layer.forward(y));
        }
        self.out.forward(y)
    }
}

#[derive(Config, Debug)]
pub struct ShuffleDiscriminatorConfig {
    pub sentence_dim: usize,
    pub hidden_dim:   usize,
}

impl ShuffleDiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ShuffleDiscriminator<B> {
        ShuffleDiscriminator {
            lstm: LstmConfig::new(self.sentence_dim, self.hidden_dim, true).init(device),
            out:  LinearConfig::new(self.hidden_dim, 1).init(device),
        }
    }
}

/// Unidirectional LSTM over a left-padded run of sentence vectors. Its
/// last output gives one logit for "this is the gold order".
#[derive(Module, Debug)]
pub struct ShuffleDiscriminator<B: Backend> {
    pub lstm: Lstm<B>,
    pub out:  Linear<B>,
}

impl<B: Backend> ShuffleDiscriminator<B> {
    /// `[rows, steps, sentence_dim]` → `[rows]` logits
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 1> {
        let [rows, steps, _] = x.dims();
        let (output, _) = self.lstm.forward(x, None);
        let hidden = output.dims()[2];
        let last = output
            .slice([0..rows, steps - 1..steps, 0..hidden])
            .reshape([rows, hidden]);
        self.out.forward(last).flatten::<1>(0, 1)
    }
}

// ─── OrderingModel ────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct OrderingModelConfig {
    pub embedding_dim: usize,
    pub lstm_dim:      usize,
    pub lin_dim:       usize,
    pub objective:     Objective,
}

impl OrderingModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> OrderingModel<B> {
        let sentence_encoder = SentenceEncoderConfig::new(self.embedding_dim, self.lstm_dim).init(device);
        let sentence_dim     = sentence_encoder.output_dim();
        let context_encoder  = || Some(SentenceEncoderConfig::new(sentence_dim, self.lstm_dim).init(device));

        let mut model = OrderingModel {
            sentence_encoder,
            context_encoder: None,
            pair_head:       None,
            regressor:       None,
            window_head:     None,
            discriminator:   None,
        };

        match self.objective {
            Objective::Pairwise => {
                model.pair_head = Some(PairClassifierConfig::new(sentence_dim, self.lin_dim).init(device));
            }
            Objective::Regression => {
                model.context_encoder = context_encoder();
                // <context, sentence, abstract length>
                model.regressor = Some(
                    FeedForwardHeadConfig::new(2 * sentence_dim + 1, self.lin_dim, 1).init(device),
                );
            }
            Objective::LeftRight => {
                model.context_encoder = context_encoder();
                // <left, context, right, sentence, window length>
                model.window_head = Some(
                    FeedForwardHeadConfig::new(4 * sentence_dim + 1, self.lin_dim, 3).init(device),
                );
            }
            Objective::Shuffle => {
                model.discriminator = Some(
                    ShuffleDiscriminatorConfig::new(sentence_dim, self.lstm_dim).init(device),
                );
            }
        }
        model
    }
}

/// Sentence encoder plus whichever heads the objective needs, held in one
/// module so a single optimiser updates all of it.
#[derive(Module, Debug)]
pub struct OrderingModel<B: Backend> {
    pub sentence_encoder: SentenceEncoder<B>,
    pub context_encoder:  Option<SentenceEncoder<B>>,
    pub pair_head:        Option<PairClassifier<B>>,
    pub regressor:        Option<FeedForwardHead<B>>,
    pub window_head:      Option<FeedForwardHead<B>>,
    pub discriminator:    Option<ShuffleDiscriminator<B>>,
}

/// One left-right window before the context encoder runs. `left` and
/// `right` are `[1, dim]` (zeros when there is no neighbour); `middle`
/// holds the sentences to classify.
struct WindowInput<B: Backend> {
    left:   Tensor<B, 2>,
    middle: Tensor<B, 2>,
    right:  Tensor<B, 2>,
}

impl<B: Backend> OrderingModel<B> {
    pub fn objective(&self) -> Objective {
        if self.regressor.is_some() {
            Objective::Regression
        } else if self.window_head.is_some() {
            Objective::LeftRight
        } else if self.discriminator.is_some() {
            Objective::Shuffle
        } else {
            Objective::Pairwise
        }
    }

    /// Embed and encode every sentence of the batch: `[sentences, 2*lstm]`,
    /// rows in flattened abstract order.
    pub fn encode_sentences(
        &self,
        batch:      &AbstractBatch,
        table:      &EmbeddingTable,
        max_tokens: usize,
        device:     &B::Device,
    ) -> Result<Tensor<B, 2>> {
        let packed = batch.packed_sentences(table, max_tokens)?;
        let packed = PackedTensor::<B>::from_packed(&packed, device);
        self.sentence_encoder.forward(&packed)
    }

    /// Split batch-level sentence encodings into one tensor per abstract.
    fn group_sentences(batch: &AbstractBatch, encoded: Tensor<B, 2>) -> Vec<Tensor<B, 2>> {
        let width = encoded.dims()[1];
        batch
            .sentence_spans()
            .into_iter()
            .map(|span| encoded.clone().slice([span, 0..width]))
            .collect()
    }

    fn context_encoder(&self) -> Result<&SentenceEncoder<B>> {
        self.context_encoder
            .as_ref()
            .ok_or_else(|| anyhow!("model was not built with a context encoder"))
    }

    /// `[s_i] ++ shuffle(rows)` for every row `i`, in row order.
    fn contexts_for<R: Rng + ?Sized>(rows: &Tensor<B, 2>, rng: &mut R) -> Vec<Tensor<B, 2>> {
        let [n, width] = rows.dims();
        let device = rows.device();
        (0..n)
            .map(|i| {
                let mut perm: Vec<usize> = (0..n).collect();
                perm.shuffle(rng);
                let sentence = rows.clone().slice([i..i + 1, 0..width]);
                let shuffled = rows.clone().select(0, index_tensor::<B>(&perm, &device));
                Tensor::cat(vec![sentence, shuffled], 0)
            })
            .collect()
    }

    // ── Pairwise ──────────────────────────────────────────────────────────────

    fn pairwise_head(&self) -> Result<&PairClassifier<B>> {
        self.pair_head
            .as_ref()
            .ok_or_else(|| anyhow!("model was not built with a pairwise head"))
    }

    /// Rows `cat(s[a], s[b])` for each `(a, b)`.
    fn pair_rows(sentences: &Tensor<B, 2>, pairs: &[(usize, usize)]) -> Tensor<B, 2> {
        let device = sentences.device();
        let firsts: Vec<usize>  = pairs.iter().map(|&(a, _)| a).collect();
        let seconds: Vec<usize> = pairs.iter().map(|&(_, b)| b).collect();
        Tensor::cat(
            vec![
                sentences.clone().select(0, index_tensor::<B>(&firsts, &device)),
                sentences.clone().select(0, index_tensor::<B>(&seconds, &device)),
            ],
            1,
        )
    }

    fn pairwise_loss(&self, groups: &[Tensor<B, 2>]) -> Result<Tensor<B, 1>> {
        let head = self.pairwise_head()?;

        let mut rows   = Vec::new();
        let mut labels = Vec::new();
        for group in groups {
            let pairs = adjacent_pairs(group.dims()[0]);
            if pairs.is_empty() {
                continue;
            }
            let index_pairs: Vec<(usize, usize)> = pairs.iter().map(|&(a, b, _)| (a, b)).collect();
            rows.push(Self::pair_rows(group, &index_pairs));
            labels.extend(pairs.iter().map(|&(_, _, label)| label));
        }
        if rows.is_empty() {
            bail!("no abstract in the batch has two or more sentences");
        }

        let logits  = head.forward(Tensor::cat(rows, 0));
        let device  = logits.device();
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &device);
        Ok(CrossEntropyLossConfig::new().init(&device).forward(logits, targets))
    }

    /// P(row a precedes row b) for every ordered pair of one abstract.
    pub fn pair_probabilities(&self, sentences: Tensor<B, 2>) -> Result<(Vec<(usize, usize)>, Vec<f32>)> {
        let pairs = all_ordered_pairs(sentences.dims()[0]);
        if pairs.is_empty() {
            return Ok((pairs, Vec::new()));
        }
        let logits = self.pairwise_head()?.forward(Self::pair_rows(&sentences, &pairs));
        let [rows, _] = logits.dims();
        let in_order = softmax(logits, 1).slice([0..rows, 1..2]).flatten::<1>(0, 1);
        Ok((pairs, to_f32_vec(in_order)?))
    }

    // ── Position regression ───────────────────────────────────────────────────

    fn regressor(&self) -> Result<&FeedForwardHead<B>> {
        self.regressor
            .as_ref()
            .ok_or_else(|| anyhow!("model was not built with a regression head"))
    }

    /// Predicted position of every sentence in every group, concatenated.
    ///
    /// Each sentence is paired with a context made of itself followed by
    /// its abstract's sentences in random order; all contexts are packed
    /// into one batch for the context encoder.
    pub fn regress_positions<R: Rng + ?Sized>(
        &self,
        groups: &[Tensor<B, 2>],
        rng:    &mut R,
    ) -> Result<Tensor<B, 1>> {
        let regressor       = self.regressor()?;
        let context_encoder = self.context_encoder()?;

        let mut contexts  = Vec::new();
        let mut sentences = Vec::new();
        let mut sizes     = Vec::new();

        for group in groups {
            let [n, width] = group.dims();
            contexts.extend(Self::contexts_for(group, rng));
            for i in 0..n {
                sentences.push(group.clone().slice([i..i + 1, 0..width]));
                sizes.push(n as f32);
            }
        }
        if contexts.is_empty() {
            bail!("no sentences to regress");
        }

        let rows    = sizes.len();
        let device  = sentences[0].device();
        let packed  = pad_and_pack_tensors(contexts, Some(CONTEXT_LENGTH), 0.0)?;
        let context = context_encoder.forward(&packed)?;
        let sizes   = Tensor::<B, 1>::from_floats(sizes.as_slice(), &device).reshape([rows, 1]);

        let x = Tensor::cat(vec![context, Tensor::cat(sentences, 0), sizes], 1);
        Ok(regressor.forward(x).flatten::<1>(0, 1))
    }

    fn regression_loss<R: Rng + ?Sized>(&self, groups: &[Tensor<B, 2>], rng: &mut R) -> Result<Tensor<B, 1>> {
        let targets: Vec<f32> = groups
            .iter()
            .flat_map(|g| {
                let n = g.dims()[0];
                (0..n).map(move |i| position_target(i, n))
            })
            .collect();

        let predicted = self.regress_positions(groups, rng)?;
        let targets   = Tensor::<B, 1>::from_floats(targets.as_slice(), &predicted.device());
        Ok(MseLoss::new().forward(predicted, targets, Reduction::Mean))
    }

    // ── Left-right windows ────────────────────────────────────────────────────

    fn window_head(&self) -> Result<&FeedForwardHead<B>> {
        self.window_head
            .as_ref()
            .ok_or_else(|| anyhow!("model was not built with a left-right head"))
    }

    /// Row `index` of `group`, or a zero row when there is no neighbour.
    fn neighbour(group: &Tensor<B, 2>, index: Option<usize>) -> Tensor<B, 2> {
        let width = group.dims()[1];
        match index {
            Some(i) => group.clone().slice([i..i + 1, 0..width]),
            None    => Tensor::zeros([1, width], &group.device()),
        }
    }

    fn window_input(group: &Tensor<B, 2>, window: &Window) -> WindowInput<B> {
        let width = group.dims()[1];
        WindowInput {
            left:   Self::neighbour(group, window.left),
            middle: group.clone().slice([window.start..window.end, 0..width]),
            right:  Self::neighbour(group, window.right),
        }
    }

    /// FIRST / MIDDLE / LAST logits for every sentence of every window,
    /// windows concatenated in order: `[Σ window sizes, 3]`.
    fn window_logits<R: Rng + ?Sized>(
        &self,
        windows: &[WindowInput<B>],
        rng:     &mut R,
    ) -> Result<Tensor<B, 2>> {
        let head            = self.window_head()?;
        let context_encoder = self.context_encoder()?;

        let mut contexts = Vec::new();
        let mut features = Vec::new();

        for window in windows {
            let [m, width] = window.middle.dims();
            let device = window.middle.device();
            contexts.extend(Self::contexts_for(&window.middle, rng));
            for i in 0..m {
                features.push((
                    window.left.clone(),
                    window.right.clone(),
                    window.middle.clone().slice([i..i + 1, 0..width]),
                    Tensor::<B, 2>::full([1, 1], m as f32, &device),
                ));
            }
        }
        if contexts.is_empty() {
            bail!("no window sentences to classify");
        }

        let packed  = pad_and_pack_tensors(contexts, Some(CONTEXT_LENGTH), 0.0)?;
        let context = context_encoder.forward(&packed)?;
        let width   = context.dims()[1];

        let rows: Vec<Tensor<B, 2>> = features
            .into_iter()
            .enumerate()
            .map(|(k, (left, right, sentence, size))| {
                let ctx = context.clone().slice([k..k + 1, 0..width]);
                Tensor::cat(vec![left, ctx, right, sentence, size], 1)
            })
            .collect();

        Ok(head.forward(Tensor::cat(rows, 0)))
    }

    fn left_right_loss<R: Rng + ?Sized>(&self, groups: &[Tensor<B, 2>], rng: &mut R) -> Result<Tensor<B, 1>> {
        let mut inputs = Vec::new();
        let mut labels = Vec::new();
        for group in groups {
            if let Some(window) = random_window(group.dims()[0], rng) {
                labels.extend(window.labels());
                inputs.push(Self::window_input(group, &window));
            }
        }
        if inputs.is_empty() {
            bail!("no abstract in the batch has two or more sentences");
        }

        let logits  = self.window_logits(&inputs, rng)?;
        let device  = logits.device();
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &device);
        Ok(CrossEntropyLossConfig::new().init(&device).forward(logits, targets))
    }

    /// Greedy decoding. The unplaced sentences form the window and the
    /// last placed one is its left neighbour; the sentence most likely to
    /// be FIRST goes next.
    fn left_right_order<R: Rng + ?Sized>(&self, group: &Tensor<B, 2>, rng: &mut R) -> Result<Vec<usize>> {
        let [n, width] = group.dims();
        let device = group.device();
        let first  = WINDOW_FIRST as usize;

        let mut remaining: Vec<usize> = (0..n).collect();
        let mut order = Vec::with_capacity(n);

        while remaining.len() > 1 {
            let input = WindowInput {
                left:   Self::neighbour(group, order.last().copied()),
                middle: group.clone().select(0, index_tensor::<B>(&remaining, &device)),
                right:  Tensor::zeros([1, width], &device),
            };
            let logits = self.window_logits(std::slice::from_ref(&input), rng)?;
            let rows   = logits.dims()[0];
            let opens  = log_softmax(logits, 1)
                .slice([0..rows, first..first + 1])
                .flatten::<1>(0, 1);
            let pick = best_index(&to_f32_vec(opens)?)
                .ok_or_else(|| anyhow!("window produced no scores"))?;
            order.push(remaining.remove(pick));
        }
        order.extend(remaining);
        Ok(order)
    }

    // ── Shuffle discrimination ────────────────────────────────────────────────

    fn discriminator(&self) -> Result<&ShuffleDiscriminator<B>> {
        self.discriminator
            .as_ref()
            .ok_or_else(|| anyhow!("model was not built with a shuffle discriminator"))
    }

    /// One row per order: zeros, then the group's rows in that order, for
    /// `length` steps in total.
    fn left_padded(group: &Tensor<B, 2>, orders: &[Vec<usize>], length: usize) -> Tensor<B, 3> {
        let [n, width] = group.dims();
        let device = group.device();
        let rows = orders
            .iter()
            .map(|order| {
                let ordered = group.clone().select(0, index_tensor::<B>(order, &device));
                let row = if length > n {
                    Tensor::cat(vec![Tensor::zeros([length - n, width], &device), ordered], 0)
                } else {
                    ordered
                };
                row.unsqueeze::<3>()
            })
            .collect();
        Tensor::cat(rows, 0)
    }

    fn shuffle_loss<R: Rng + ?Sized>(&self, groups: &[Tensor<B, 2>], rng: &mut R) -> Result<Tensor<B, 1>> {
        let discriminator = self.discriminator()?;

        let mut rows   = Vec::new();
        let mut labels = Vec::new();
        for group in groups {
            let n = group.dims()[0];
            if n < 2 || n >= CONTEXT_LENGTH {
                continue;
            }
            let [(gold, yes), (shuffled, no)] = shuffle_examples(n, rng);
            rows.push(Self::left_padded(group, &[gold, shuffled], CONTEXT_LENGTH));
            labels.extend([yes, no]);
        }
        if rows.is_empty() {
            bail!("no abstract in the batch has between 2 and {} sentences", CONTEXT_LENGTH - 1);
        }

        let logits  = discriminator.forward(Tensor::cat(rows, 0));
        let device  = logits.device();
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &device);
        Ok(BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&device)
            .forward(logits, targets))
    }

    /// The candidate permutation the discriminator finds most plausible.
    fn shuffle_order<R: Rng + ?Sized>(&self, group: &Tensor<B, 2>, rng: &mut R) -> Result<Vec<usize>> {
        let n          = group.dims()[0];
        let candidates = candidate_orders(n, rng);
        let x          = Self::left_padded(group, &candidates, CONTEXT_LENGTH.max(n));
        let scores     = to_f32_vec(sigmoid(self.discriminator()?.forward(x)))?;
        let best       = best_index(&scores).ok_or_else(|| anyhow!("no candidate orders"))?;
        Ok(candidates[best].clone())
    }

    // ── Shared entry points ───────────────────────────────────────────────────

    /// Loss of one batch of gold-ordered abstracts under the model's
    /// objective.
    pub fn forward_loss<R: Rng + ?Sized>(
        &self,
        batch:      &AbstractBatch,
        table:      &EmbeddingTable,
        max_tokens: usize,
        device:     &B::Device,
        rng:        &mut R,
    ) -> Result<Tensor<B, 1>> {
        let encoded = self.encode_sentences(batch, table, max_tokens, device)?;
        let groups  = Self::group_sentences(batch, encoded);
        match self.objective() {
            Objective::Pairwise   => self.pairwise_loss(&groups),
            Objective::Regression => self.regression_loss(&groups, rng),
            Objective::LeftRight  => self.left_right_loss(&groups, rng),
            Objective::Shuffle    => self.shuffle_loss(&groups, rng),
        }
    }

    /// Predicted order of every abstract in the batch, as indices into
    /// that abstract's sentence list.
    pub fn predict_order<R: Rng + ?Sized>(
        &self,
        batch:      &AbstractBatch,
        table:      &EmbeddingTable,
        max_tokens: usize,
        device:     &B::Device,
        rng:        &mut R,
    ) -> Result<Vec<Vec<usize>>> {
        let encoded = self.encode_sentences(batch, table, max_tokens, device)?;
        let groups  = Self::group_sentences(batch, encoded);

        match self.objective() {
            Objective::Regression => {
                let predicted = to_f32_vec(self.regress_positions(&groups, rng)?)?;
                Ok(batch
                    .unpack_sentences(&predicted)?
                    .into_iter()
                    .map(order_from_positions)
                    .collect())
            }
            Objective::Pairwise => groups
                .into_iter()
                .map(|g| {
                    let n = g.dims()[0];
                    let (pairs, before) = self.pair_probabilities(g)?;
                    Ok(order_from_pair_scores(n, &pairs, &before))
                })
                .collect(),
            Objective::LeftRight => groups.iter().map(|g| self.left_right_order(g, rng)).collect(),
            Objective::Shuffle   => groups.iter().map(|g| self.shuffle_order(g, rng)).collect(),
        }
    }
}

/// Pull a 1-D float tensor back to the host.
pub fn to_f32_vec<B: Backend>(t: Tensor<B, 1>) -> Result<Vec<f32>> {
    t.into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read tensor data: {e:?}"))
}
