//! # wenzi Core
//!
//! Building blocks for Chinese sequence labeling and classification models
//! on candle: text processors, pluggable embeddings, a GRU encoder, and the
//! glue to save, reload, export and replicate trained models.
//!
//! ## Quick Start
//!
//! ```rust
//! use wenzi_core::{EmbeddingConfig, Labels, Model, ModelClass};
//!
//! let x: Vec<Vec<String>> = vec!["今天天气".chars().map(String::from).collect()];
//! let y = Labels::Classes(vec!["weather".to_string()]);
//!
//! let mut model = Model::new(ModelClass::GruClassification, EmbeddingConfig::bare(16))
//!     .unwrap()
//!     .with_hidden_size(8);
//! model.build_model(&x, &y).unwrap();
//!
//! assert_eq!(model.predict(&x, 32).unwrap(), y);
//! ```
pub mod distribute;
pub mod doccano;
pub mod embedding;
pub mod encoder;
pub mod error;
pub mod export;
pub mod labels;
pub mod model;
pub mod persistence;
pub mod processor;
pub mod registry;
pub mod utils;

// Re-export primary API
pub use distribute::{DeviceSpec, ReplicatedNetwork, convert_to_multi_device};
pub use doccano::{DoccanoRecord, convert_labeling_to_doccano};
pub use embedding::{Embedding, EmbeddingConfig, EmbeddingInfo, ProcessorInfo};
pub use encoder::GruEncoder;
pub use error::{Result, WenziError};
pub use export::{ServingSignature, TensorSpec, convert_to_saved_model};
pub use labels::{BioTag, EntitySpan, SemanticRecord, extract_entities};
pub use model::{ArchitectureConfig, Model, ModelClass, ModelInfo};
pub use persistence::{load_model, load_processor, read_model_info, save_model};
pub use processor::{Labels, Processor, ProcessorConfig, Task};
pub use utils::{get_list_subset, unison_shuffled_copies};
