// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// plus the TrainConfig needed to rebuild the same architecture.
//
// File layout inside the output directory:
//
//   output/
//     train_config.json    ← hyperparameters (model + schedule)
//     model_final.mpk.gz   ← weights after the last epoch
//
// CompactRecorder writes MessagePack and gzips it. The recorder
// appends the extension itself, so names are passed without one.
// Loading is type-checked: a record only loads into a module with
// the same architecture.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{prelude::*, record::CompactRecorder};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

pub const CONFIG_FILE: &str = "train_config.json";
pub const FINAL_MODEL: &str = "model_final";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates `dir` (like `mkdir -p`) if it is missing
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Opens an existing directory written by a previous `train` run
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!(
                "Output dir '{}' does not exist. Run 'train' first.",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save weights as `{dir}/{name}.mpk.gz`
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, name: &str) -> Result<()> {
        let path = self.dir.join(name);

        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::info!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Load `{dir}/{name}.mpk.gz` into a freshly initialised `model`
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        name:   &str,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(name);

        let model = model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        tracing::info!("Loaded model weights from '{}'", path.display());
        Ok(model)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'evaluate'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{DigitNet, DigitNetConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("digit-trainer-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = scratch_dir("ckpt-config");
        let ckpt = CheckpointManager::new(&dir).unwrap();

        let cfg = TrainConfig { epochs: 3, l1_lambda: 1e-5, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();

        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.l1_lambda, 1e-5);
        assert_eq!(loaded.scheduler, cfg.scheduler);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_model_weights_survive_save_and_load() {
        let dir    = scratch_dir("ckpt-model");
        let ckpt   = CheckpointManager::new(&dir).unwrap();
        let device = Default::default();
        let config = DigitNetConfig::new();

        let saved: DigitNet<TestBackend> = config.init(&device);
        ckpt.save_model(&saved, FINAL_MODEL).unwrap();
        assert!(dir.join("model_final.mpk.gz").exists());

        let fresh: DigitNet<TestBackend> = config.init(&device);
        let loaded = ckpt.load_model(fresh, FINAL_MODEL, &device).unwrap();

        let a = saved.fc2.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = loaded.fc2.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_files_are_errors() {
        let dir  = scratch_dir("ckpt-missing");
        let ckpt = CheckpointManager::new(&dir).unwrap();
        assert!(ckpt.load_config().is_err());

        let device = Default::default();
        let model: DigitNet<TestBackend> = DigitNetConfig::new().init(&device);
        assert!(ckpt.load_model(model, FINAL_MODEL, &device).is_err());

        assert!(CheckpointManager::open(dir.join("nope")).is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
