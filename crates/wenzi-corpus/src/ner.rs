//! China People's Daily NER corpus, character level with BIO tags.

use std::fs;
use std::path::Path;

use tracing::info;
use wenzi_core::utils::unison_shuffled_copies;

use crate::cache::CorpusCache;
use crate::error::Result;
use crate::subset::Subset;

/// Token sequences and their aligned tag sequences.
pub type LabelingData = (Vec<Vec<String>>, Vec<Vec<String>>);

/// Chinese Daily news NER corpus.
///
/// ```text
/// 海 O
/// 钓 O
/// 比 O
/// 赛 O
/// 地 O
/// 点 O
/// 在 O
/// 厦 B-LOC
/// 门 I-LOC
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChineseDailyNerCorpus {
    cache: CorpusCache,
    seed: Option<u64>,
}

impl ChineseDailyNerCorpus {
    pub const NAME: &'static str = "china-people-daily-ner-corpus";
    pub const URL: &'static str =
        "http://storage.eliyar.biz/corpus/china-people-daily-ner-corpus.tar.gz";

    pub fn new(cache: CorpusCache) -> Self {
        Self { cache, seed: None }
    }

    /// Fix the shuffle order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// File holding `subset` inside the extracted corpus.
    pub fn subset_file(subset: Subset) -> &'static str {
        match subset {
            Subset::Train => "example.train",
            Subset::Test => "example.test",
            Subset::Valid => "example.dev",
        }
    }

    /// Download the corpus if needed and load one subset.
    ///
    /// `x[i]` and `y[i]` always have the same length. With `shuffle` both
    /// lists are permuted together.
    pub fn load_data(&self, subset: Subset, shuffle: bool) -> Result<LabelingData> {
        let corpus_path = self.cache.get_file(Self::NAME, Self::URL, true)?;
        self.load_from_dir(&corpus_path, subset, shuffle)
    }

    /// Load one subset from an already extracted corpus directory.
    pub fn load_from_dir(&self, dir: &Path, subset: Subset, shuffle: bool) -> Result<LabelingData> {
        let (x, y) = Self::parse_file(&dir.join(Self::subset_file(subset)))?;
        info!(corpus = Self::NAME, %subset, samples = x.len(), "loaded corpus");

        if shuffle {
            Ok(unison_shuffled_copies(x, y, self.seed)?)
        } else {
            Ok((x, y))
        }
    }

    /// Parse `char label` lines; a line without a second field ends an example.
    pub fn parse_file(path: &Path) -> Result<LabelingData> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_str(&content))
    }

    pub fn parse_str(content: &str) -> LabelingData {
        let mut x_data = Vec::new();
        let mut y_data = Vec::new();
        let mut x = Vec::new();
        let mut y = Vec::new();

        for line in content.lines() {
            let mut rows = line.split(' ');
            match (rows.next(), rows.next()) {
                (Some(token), Some(label)) => {
                    x.push(token.to_string());
                    y.push(label.to_string());
                }
                _ => {
                    if !x.is_empty() {
                        x_data.push(std::mem::take(&mut x));
                        y_data.push(std::mem::take(&mut y));
                    }
                }
            }
        }
        if !x.is_empty() {
            x_data.push(x);
            y_data.push(y);
        }

        (x_data, y_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "海 O\n钓 O\n在 O\n厦 B-LOC\n门 I-LOC\n\n\n人 O\n民 O\n\n中 B-ORG\n共 I-ORG";

    #[test]
    fn test_parse_examples() {
        let (x, y) = ChineseDailyNerCorpus::parse_str(SAMPLE);
        assert_eq!(x.len(), 3);
        assert_eq!(x[0], vec!["海", "钓", "在", "厦", "门"]);
        assert_eq!(y[0][3], "B-LOC");
        // trailing example without a closing blank line is kept
        assert_eq!(y[2], vec!["B-ORG", "I-ORG"]);
        for (tokens, tags) in x.iter().zip(&y) {
            assert_eq!(tokens.len(), tags.len());
        }
    }

    #[test]
    fn test_load_from_dir_by_subset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("example.train"), SAMPLE).unwrap();
        fs::write(dir.path().join("example.dev"), "人 O\n\n").unwrap();

        let corpus = ChineseDailyNerCorpus::default().with_seed(7);
        let (x, y) = corpus.load_from_dir(dir.path(), Subset::Train, true).unwrap();
        assert_eq!(x.len(), 3);
        for (tokens, tags) in x.iter().zip(&y) {
            assert_eq!(tokens.len(), tags.len());
        }

        let (x, _) = corpus.load_from_dir(dir.path(), Subset::Valid, false).unwrap();
        assert_eq!(x, vec![vec!["人".to_string()]]);

        assert!(corpus.load_from_dir(dir.path(), Subset::Test, false).is_err());
    }

    #[test]
    fn test_seeded_shuffle_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("example.train"), SAMPLE).unwrap();

        let corpus = ChineseDailyNerCorpus::default().with_seed(42);
        let first = corpus.load_from_dir(dir.path(), Subset::Train, true).unwrap();
        let second = corpus.load_from_dir(dir.path(), Subset::Train, true).unwrap();
        assert_eq!(first, second);
    }
}
