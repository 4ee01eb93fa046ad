//! SMP2018 ECDT task 1 intent classification corpus.

use std::path::Path;

use serde::Deserialize;
use tracing::info;
use wenzi_core::utils::unison_shuffled_copies;

use crate::cache::CorpusCache;
use crate::cutter::{Cutter, SentenceCutter};
use crate::error::Result;
use crate::subset::Subset;

/// Token sequences and one label per sequence.
pub type ClassificationData = (Vec<Vec<String>>, Vec<String>);

#[derive(Debug, Deserialize)]
struct Row {
    label: String,
    query: String,
}

/// Chinese human-computer dialogue intents, released by iFLYTEK for the
/// SMP2018-ECDT evaluation.
///
/// ```text
///   label     query
///   weather   今天东莞天气如何
///   map       从观音桥到重庆市图书馆怎么走
///   cookbook  鸭蛋怎么腌？
/// ```
#[derive(Debug, Clone, Default)]
pub struct SMP2018ECDTCorpus {
    cache: CorpusCache,
    seed: Option<u64>,
}

impl SMP2018ECDTCorpus {
    pub const NAME: &'static str = "SMP2018ECDTCorpus";
    pub const URL: &'static str = "http://storage.eliyar.biz/corpus/SMP2018ECDTCorpus.tar.gz";

    pub fn new(cache: CorpusCache) -> Self {
        Self { cache, seed: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Download the corpus if needed and load `{subset}.csv`.
    pub fn load_data(&self, subset: Subset, shuffle: bool, cutter: Cutter) -> Result<ClassificationData> {
        let corpus_path = self.cache.get_file(Self::NAME, Self::URL, true)?;
        self.load_from_dir(&corpus_path, subset, shuffle, cutter)
    }

    /// Load one subset from an already extracted corpus directory.
    pub fn load_from_dir(
        &self,
        dir: &Path,
        subset: Subset,
        shuffle: bool,
        cutter: Cutter,
    ) -> Result<ClassificationData> {
        let (x, y) = Self::parse_csv(&dir.join(format!("{subset}.csv")), cutter)?;
        info!(corpus = Self::NAME, %subset, %cutter, samples = x.len(), "loaded corpus");

        if shuffle {
            Ok(unison_shuffled_copies(x, y, self.seed)?)
        } else {
            Ok((x, y))
        }
    }

    /// Read a CSV with `label` and `query` columns and tokenize each query.
    pub fn parse_csv(path: &Path, cutter: Cutter) -> Result<ClassificationData> {
        let cutter = SentenceCutter::new(cutter)?;
        let mut reader = csv::Reader::from_path(path)?;

        let mut x_data = Vec::new();
        let mut y_data = Vec::new();
        for row in reader.deserialize() {
            let row: Row = row?;
            x_data.push(cutter.cut(&row.query));
            y_data.push(row.label);
        }
        Ok((x_data, y_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CorpusError;
    use std::fs;

    const CSV: &str = "label,query\nweather,今天东莞天气如何\ncookbook,鸭蛋怎么腌？\nchat,唠什么\n";

    #[test]
    fn test_parse_csv_char_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        fs::write(&path, CSV).unwrap();

        let (x, y) = SMP2018ECDTCorpus::parse_csv(&path, Cutter::Char).unwrap();
        assert_eq!(y, vec!["weather", "cookbook", "chat"]);
        assert_eq!(x[2], vec!["唠", "什", "么"]);
        assert_eq!(x[0].len(), 8);
    }

    #[test]
    fn test_columns_in_any_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "query,label\n听新闻。,news\n").unwrap();

        let (x, y) = SMP2018ECDTCorpus::parse_csv(&path, Cutter::None).unwrap();
        assert_eq!(x, vec![vec!["听", "新", "闻", "。"]]);
        assert_eq!(y, vec!["news"]);
    }

    #[test]
    fn test_load_from_dir_uses_subset_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("valid.csv"), CSV).unwrap();

        let corpus = SMP2018ECDTCorpus::default().with_seed(3);
        let (x, y) = corpus
            .load_from_dir(dir.path(), Subset::Valid, true, Cutter::Char)
            .unwrap();
        assert_eq!(x.len(), y.len());
        assert_eq!(x.len(), 3);

        let err = corpus
            .load_from_dir(dir.path(), Subset::Train, false, Cutter::Char)
            .unwrap_err();
        assert!(matches!(err, CorpusError::Csv(_)));
    }

    #[test]
    fn test_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        fs::write(&path, "intent,text\nchat,hi\n").unwrap();
        assert!(SMP2018ECDTCorpus::parse_csv(&path, Cutter::Char).is_err());
    }
}
