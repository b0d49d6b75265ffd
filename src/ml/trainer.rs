// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop over randomly drawn batches with Adam.
//
//   - Training runs on Autodiff<NdArray> or Autodiff<Wgpu>,
//     chosen once from TrainConfig::device
//   - model.valid() returns the model on the inner backend
//     (no autodiff, dropout off) for the validation pass
//   - One checkpoint per epoch
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::{DeviceChoice, TrainConfig};
use crate::data::{dataset::AbstractDataset, embedding::EmbeddingTable};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::OrderingModel;

/// Average losses of one finished epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochSummary {
    pub epoch:      usize,
    pub train_loss: f64,
    /// NaN when there is no validation data.
    pub val_loss:   f64,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: &AbstractDataset,
    val_dataset:   &AbstractDataset,
    table:         &EmbeddingTable,
    ckpt_manager:  &CheckpointManager,
) -> Result<Vec<EpochSummary>> {
    match cfg.device {
        DeviceChoice::Cpu => {
            let device = NdArrayDevice::Cpu;
            tracing::info!("Using NdArray device: {:?}", device);
            train_loop::<Autodiff<NdArray>>(cfg, train_dataset, val_dataset, table, ckpt_manager, &device)
        }
        DeviceChoice::Gpu => {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<Autodiff<Wgpu>>(cfg, train_dataset, val_dataset, table, ckpt_manager, &device)
        }
    }
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: &AbstractDataset,
    val_dataset:   &AbstractDataset,
    table:         &EmbeddingTable,
    ckpt_manager:  &CheckpointManager,
    device:        &B::Device,
) -> Result<Vec<EpochSummary>> {
    let train_size = train_dataset.abstracts().len();
    if train_size == 0 {
        bail!("training set is empty (try more --num-abstracts or a larger --max-sentences)");
    }
    let batch_size = cfg.batch_size.min(train_size);
    if batch_size < cfg.batch_size {
        tracing::warn!("Batch size lowered to {} to fit the training set", batch_size);
    }

    B::seed(cfg.seed);
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: OrderingModel<B> = cfg.model_config().init(device);
    tracing::info!(
        "Model ready: {} objective, lstm_dim={}, lin_dim={}",
        cfg.objective,
        cfg.lstm_dim,
        cfg.lin_dim
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let mut summaries = Vec::with_capacity(cfg.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for _ in 0..cfg.epoch_size {
            let batch = train_dataset.random_batch(batch_size, &mut rng)?;
            let loss  = model.forward_loss(&batch, table, cfg.max_tokens, device, &mut rng)?;

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;

        for batch in val_dataset.batches(batch_size) {
            let batch = batch?;
            let loss  = model_valid.forward_loss(&batch, table, cfg.max_tokens, device, &mut rng)?;
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;
        }

        let avg_val_loss = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss,
        );

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        summaries.push(EpochSummary { epoch, train_loss: avg_train_loss, val_loss: avg_val_loss });
    }

    tracing::info!("Training complete!");
    Ok(summaries)
}
