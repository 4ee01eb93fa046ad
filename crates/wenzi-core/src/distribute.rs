//! # Multi-device execution
//!
//! Replicates a built model on several candle devices and splits each batch
//! across them. Kernels and transfers belong to candle; this module only
//! copies weights and merges outputs.

use std::fmt;
use std::str::FromStr;

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use tracing::{debug, info};

use crate::error::{Result, WenziError};
use crate::model::network::Network;
use crate::model::{Model, Runtime};

/// A device named on the command line or in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceSpec {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl DeviceSpec {
    /// Open the device. Fails when candle was built without the backend.
    pub fn open(&self) -> Result<Device> {
        let device = match self {
            DeviceSpec::Cpu => Device::Cpu,
            DeviceSpec::Cuda(ordinal) => Device::new_cuda(*ordinal)
                .map_err(|e| WenziError::InvalidDevice(format!("{self}: {e}")))?,
            DeviceSpec::Metal(ordinal) => Device::new_metal(*ordinal)
                .map_err(|e| WenziError::InvalidDevice(format!("{self}: {e}")))?,
        };
        Ok(device)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Cpu => write!(f, "cpu"),
            DeviceSpec::Cuda(i) => write!(f, "cuda:{i}"),
            DeviceSpec::Metal(i) => write!(f, "metal:{i}"),
        }
    }
}

impl FromStr for DeviceSpec {
    type Err = WenziError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let (kind, ordinal) = match lower.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| WenziError::InvalidDevice(s.to_string()))?;
                (kind.to_string(), ordinal)
            }
            None => (lower.clone(), 0),
        };

        match kind.as_str() {
            "cpu" => Ok(DeviceSpec::Cpu),
            "cuda" | "gpu" => Ok(DeviceSpec::Cuda(ordinal)),
            "metal" => Ok(DeviceSpec::Metal(ordinal)),
            _ => Err(WenziError::InvalidDevice(s.to_string())),
        }
    }
}

/// One network per device; batches are split along the first dimension.
pub struct ReplicatedNetwork {
    replicas: Vec<Network>,
    merge_device: Device,
}

impl ReplicatedNetwork {
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn merge_device(&self) -> &Device {
        &self.merge_device
    }

    pub(crate) fn embedding_dim(&self) -> usize {
        self.replicas
            .first()
            .map(Network::embedding_dim)
            .unwrap_or_default()
    }

    /// Split the batch into contiguous shards, run each on its replica and
    /// concatenate the outputs on the merge device.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        let (batch, _) = token_ids.dims2()?;
        if batch == 0 {
            return Err(WenziError::EmptyInput("batch"));
        }
        let shard = batch.div_ceil(self.replicas.len());

        let mut outputs = Vec::with_capacity(self.replicas.len());
        for (i, replica) in self.replicas.iter().enumerate() {
            let start = i * shard;
            if start >= batch {
                break;
            }
            let len = shard.min(batch - start);
            let ids = token_ids.narrow(0, start, len)?.to_device(replica.device())?;
            let logits = replica.forward(&ids)?;
            outputs.push(logits.to_device(&self.merge_device)?);
        }

        Ok(Tensor::cat(&outputs, 0)?)
    }
}

/// Wrap a built model for execution on `devices`.
///
/// Every trainable weight is copied to every device; with `cpu_relocation`
/// weights are staged through host memory first. Outputs are merged on the
/// CPU when `cpu_merge` is set, otherwise on the first device.
pub fn convert_to_multi_device(
    mut model: Model,
    devices: &[DeviceSpec],
    cpu_merge: bool,
    cpu_relocation: bool,
) -> Result<Model> {
    if !model.is_built() {
        return Err(WenziError::ModelNotBuilt("converting to a multi-device model"));
    }
    if devices.is_empty() {
        return Err(WenziError::InvalidDevice("at least one device is required".into()));
    }

    let opened = devices
        .iter()
        .map(DeviceSpec::open)
        .collect::<Result<Vec<_>>>()?;

    let mut replicas = Vec::with_capacity(opened.len());
    for (spec, device) in devices.iter().zip(&opened) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let network = Network::new(model.embedding(), model.processor(), model.hidden_size(), vb)?;
        copy_weights(model.varmap(), &varmap, device, cpu_relocation)?;
        debug!(device = %spec, "created replica");
        replicas.push(network);
    }

    let merge_device = if cpu_merge {
        Device::Cpu
    } else {
        opened[0].clone()
    };

    info!(
        replicas = replicas.len(),
        cpu_merge,
        cpu_relocation,
        "converted model to multi-device execution"
    );
    model.set_runtime(Runtime::Replicated(ReplicatedNetwork {
        replicas,
        merge_device,
    }));
    Ok(model)
}

fn copy_weights(source: &VarMap, target: &VarMap, device: &Device, via_cpu: bool) -> Result<()> {
    let source = source.data().lock().map_err(|_| WenziError::LockPoisoned)?;
    let target = target.data().lock().map_err(|_| WenziError::LockPoisoned)?;

    for (name, var) in source.iter() {
        let Some(dst) = target.get(name) else {
            continue;
        };
        let tensor = if via_cpu {
            var.as_tensor().to_device(&Device::Cpu)?
        } else {
            var.as_tensor().clone()
        };
        dst.set(&tensor.to_device(device)?)?;
    }
    Ok(())
}
