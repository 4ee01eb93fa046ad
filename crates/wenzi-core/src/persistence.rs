//! # Model persistence
//!
//! A saved model is a directory with `model_info.json` (class paths,
//! architecture, embedding and processor configuration) and
//! `model.safetensors` (trainable weights).

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::Device;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::EmbeddingConfig;
use crate::error::{Result, WenziError};
use crate::model::{Model, ModelClass, ModelInfo};
use crate::processor::Processor;

/// Metadata document name.
pub const MODEL_INFO_FILE: &str = "model_info.json";
/// Weights file name.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Write `model_info.json` and the weights into `dir`, creating it.
pub fn save_model(model: &Model, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let info = model.info()?;
    fs::create_dir_all(dir)?;

    write_model_info(&info, dir)?;
    model.varmap().save(dir.join(WEIGHTS_FILE))?;

    info!(path = %dir.display(), class = %info.class_name, "saved model");
    Ok(dir.to_path_buf())
}

pub(crate) fn write_model_info(info: &ModelInfo, dir: &Path) -> Result<()> {
    fs::write(dir.join(MODEL_INFO_FILE), serde_json::to_string_pretty(info)?)?;
    Ok(())
}

/// Read the metadata document of a saved model.
pub fn read_model_info(dir: impl AsRef<Path>) -> Result<ModelInfo> {
    let content = fs::read_to_string(dir.as_ref().join(MODEL_INFO_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

/// Rebuild a saved model on `device`.
///
/// Model and embedding classes are resolved from the stored paths, the
/// network is recreated from the architecture section and the weights are
/// loaded into it.
pub fn load_model(dir: impl AsRef<Path>, device: &Device) -> Result<Model> {
    let dir = dir.as_ref();
    let info = read_model_info(dir)?;

    let class = ModelClass::locate(&info.module, &info.class_name)?;
    let embed_info = &info.embedding;
    let embedding = EmbeddingConfig::locate(&embed_info.module, &embed_info.class_name, &embed_info.config)?;
    let processor = embed_info.processor.load()?;

    if processor.task() != class.task() {
        return Err(WenziError::TaskMismatch {
            expected: class.task().as_str(),
            actual: processor.task().as_str(),
        });
    }

    let mut model = Model::from_parts(
        class,
        embedding,
        processor,
        info.architecture.hidden_size,
        device.clone(),
    );
    model.build_network()?;
    model.varmap_mut().load(dir.join(&info.architecture.weights))?;

    info!(path = %dir.display(), class = %info.class_name, "loaded model");
    Ok(model)
}

/// Rebuild only the processor of a saved model, e.g. to prepare requests
/// for a serving export.
pub fn load_processor(dir: impl AsRef<Path>) -> Result<Processor> {
    read_model_info(dir)?.embedding.processor.load()
}

/// Name, shape and dtype of one stored tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorManifest {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

impl TensorManifest {
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

/// List the tensors of a safetensors file, sorted by name.
pub fn weight_manifest(path: impl AsRef<Path>) -> Result<Vec<TensorManifest>> {
    let bytes = fs::read(path)?;
    let tensors = safetensors::SafeTensors::deserialize(&bytes)
        .map_err(|e| WenziError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;

    let mut manifest: Vec<TensorManifest> = tensors
        .tensors()
        .into_iter()
        .map(|(name, view)| TensorManifest {
            name,
            shape: view.shape().to_vec(),
            dtype: format!("{:?}", view.dtype()),
        })
        .collect();
    manifest.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(manifest)
}
