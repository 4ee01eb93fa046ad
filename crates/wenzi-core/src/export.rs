//! Serving export: a versioned directory holding weights, the metadata
//! document and a signature describing model inputs and outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, WenziError};
use crate::model::Model;
use crate::persistence::{self, WEIGHTS_FILE};
use crate::processor::Task;

/// Signature document name.
pub const SIGNATURE_FILE: &str = "signature.json";

/// Shape and dtype of a named tensor; `None` marks a dynamic dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub shape: Vec<Option<usize>>,
    pub dtype: String,
}

/// Contents of `signature.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServingSignature {
    pub inputs: BTreeMap<String, TensorSpec>,
    pub outputs: BTreeMap<String, TensorSpec>,
    pub weights: String,
    pub parameters: usize,
}

fn default_inputs(sequence_length: usize) -> BTreeMap<String, TensorSpec> {
    BTreeMap::from([(
        "token_ids".to_string(),
        TensorSpec {
            shape: vec![None, Some(sequence_length)],
            dtype: "u32".to_string(),
        },
    )])
}

fn default_outputs(task: Task, sequence_length: usize, num_labels: usize) -> BTreeMap<String, TensorSpec> {
    let shape = match task {
        Task::Labeling => vec![None, Some(sequence_length), Some(num_labels)],
        Task::Classification => vec![None, Some(num_labels)],
    };
    BTreeMap::from([(
        "logits".to_string(),
        TensorSpec {
            shape,
            dtype: "f32".to_string(),
        },
    )])
}

/// Compiled once, on first export.
static VERSION_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$"));

fn validate_version(version: &str) -> Result<()> {
    let pattern = VERSION_PATTERN.as_ref().map_err(Clone::clone)?;
    if pattern.is_match(version) && !version.contains("..") {
        Ok(())
    } else {
        Err(WenziError::InvalidVersion(version.to_string()))
    }
}

/// Export `model` for serving under `model_path/<version>`.
///
/// The version defaults to the current Unix time in seconds. `inputs` and
/// `outputs` override the signature entries derived from the model.
/// Returns the export directory.
pub fn convert_to_saved_model(
    model: &Model,
    model_path: impl AsRef<Path>,
    version: Option<&str>,
    inputs: Option<BTreeMap<String, TensorSpec>>,
    outputs: Option<BTreeMap<String, TensorSpec>>,
) -> Result<PathBuf> {
    if !model.is_built() {
        return Err(WenziError::ModelNotBuilt("export"));
    }

    let version = match version {
        Some(v) => v.to_string(),
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string(),
    };
    validate_version(&version)?;

    let export_path = model_path.as_ref().join(&version);
    fs::create_dir_all(&export_path)?;

    let model_info = model.info()?;
    let arch = &model_info.architecture;
    model.varmap().save(export_path.join(WEIGHTS_FILE))?;
    persistence::write_model_info(&model_info, &export_path)?;

    let parameters = persistence::weight_manifest(export_path.join(WEIGHTS_FILE))?
        .iter()
        .map(|t| t.num_elements())
        .sum();
    let signature = ServingSignature {
        inputs: inputs.unwrap_or_else(|| default_inputs(arch.sequence_length)),
        outputs: outputs
            .unwrap_or_else(|| default_outputs(arch.task, arch.sequence_length, arch.num_labels)),
        weights: WEIGHTS_FILE.to_string(),
        parameters,
    };
    fs::write(
        export_path.join(SIGNATURE_FILE),
        serde_json::to_string_pretty(&signature)?,
    )?;

    info!(path = %export_path.display(), %version, parameters, "exported model for serving");
    Ok(export_path)
}
