//! # wenzi Corpus
//!
//! Downloadable Chinese corpora, cached locally and loaded as token lists:
//!
//! - [`ChineseDailyNerCorpus`]: People's Daily NER, character level BIO tags
//! - [`SMP2018ECDTCorpus`]: SMP2018-ECDT intent classification
//!
//! ```no_run
//! use wenzi_corpus::{ChineseDailyNerCorpus, Subset};
//!
//! let (x, y) = ChineseDailyNerCorpus::default()
//!     .load_data(Subset::Train, true)
//!     .unwrap();
//! assert_eq!(x.len(), y.len());
//! ```
pub mod cache;
pub mod cutter;
pub mod error;
pub mod ner;
pub mod smp;
pub mod subset;

pub use cache::{CorpusCache, DATA_DIR_ENV, default_data_dir};
pub use cutter::{Cutter, SentenceCutter};
pub use error::{CorpusError, Result};
pub use ner::{ChineseDailyNerCorpus, LabelingData};
pub use smp::{ClassificationData, SMP2018ECDTCorpus};
pub use subset::Subset;
