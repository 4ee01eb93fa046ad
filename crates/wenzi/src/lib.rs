//! # wenzi
//!
//! Chinese NLP models on candle: corpus loaders, a GRU encoder, training,
//! persistence and serving export behind one import.
//!
//! ```no_run
//! use wenzi::prelude::*;
//!
//! let (x, y) = SMP2018ECDTCorpus::default()
//!     .load_data(Subset::Train, true, Cutter::Char)
//!     .unwrap();
//! let y = Labels::Classes(y);
//!
//! let mut model = Model::new(ModelClass::GruClassification, EmbeddingConfig::bare(100)).unwrap();
//! Trainer::new(TrainConfig::default().with_epochs(3))
//!     .fit(&mut model, &x, &y, None)
//!     .unwrap();
//! model.save("models/intents").unwrap();
//! ```

pub use wenzi_core;
pub use wenzi_corpus;
pub use wenzi_trainer;

pub use wenzi_core::{Result, WenziError};

pub mod prelude {
    pub use wenzi_core::{
        DeviceSpec, EmbeddingConfig, Labels, Model, ModelClass, Processor, SemanticRecord, Task,
        convert_labeling_to_doccano, convert_to_multi_device, convert_to_saved_model,
        get_list_subset, load_model, load_processor, unison_shuffled_copies,
    };
    pub use wenzi_corpus::{ChineseDailyNerCorpus, CorpusCache, Cutter, SMP2018ECDTCorpus, Subset};
    pub use wenzi_trainer::{TrainConfig, Trainer};
}
