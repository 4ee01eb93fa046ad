//! # Sentence cutters
//!
//! Split a raw sentence into tokens: one token per character, or words from
//! the jieba segmenter when the `jieba` feature is enabled.

use std::fmt;
use std::str::FromStr;

use crate::error::{CorpusError, Result};

/// Tokenization mode for sentence-level corpora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cutter {
    /// One token per character.
    #[default]
    Char,
    /// Word segmentation with jieba.
    Jieba,
    /// No segmenter requested; sentences are still split per character.
    None,
}

impl FromStr for Cutter {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "char" => Ok(Cutter::Char),
            "jieba" => Ok(Cutter::Jieba),
            "none" => Ok(Cutter::None),
            other => Err(CorpusError::InvalidCutter(other.to_string())),
        }
    }
}

impl fmt::Display for Cutter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cutter::Char => write!(f, "char"),
            Cutter::Jieba => write!(f, "jieba"),
            Cutter::None => write!(f, "none"),
        }
    }
}

/// A ready-to-use cutter; holds the segmenter dictionary when needed.
pub enum SentenceCutter {
    Chars,
    #[cfg(feature = "jieba")]
    Jieba(Box<jieba_rs::Jieba>),
}

impl SentenceCutter {
    /// Prepare a cutter, loading the jieba dictionary if requested.
    pub fn new(cutter: Cutter) -> Result<Self> {
        match cutter {
            Cutter::Char | Cutter::None => Ok(SentenceCutter::Chars),
            Cutter::Jieba => Self::jieba(),
        }
    }

    #[cfg(feature = "jieba")]
    fn jieba() -> Result<Self> {
        Ok(SentenceCutter::Jieba(Box::new(jieba_rs::Jieba::new())))
    }

    #[cfg(not(feature = "jieba"))]
    fn jieba() -> Result<Self> {
        Err(CorpusError::MissingDependency {
            name: "jieba",
            hint: "rebuild with `--features jieba`",
        })
    }

    /// Split a sentence into tokens.
    ///
    /// # Examples
    /// ```
    /// use wenzi_corpus::cutter::{Cutter, SentenceCutter};
    ///
    /// let cutter = SentenceCutter::new(Cutter::Char).unwrap();
    /// assert_eq!(cutter.cut("听新闻。"), vec!["听", "新", "闻", "。"]);
    /// ```
    pub fn cut(&self, sentence: &str) -> Vec<String> {
        match self {
            SentenceCutter::Chars => sentence.chars().map(String::from).collect(),
            #[cfg(feature = "jieba")]
            SentenceCutter::Jieba(jieba) => jieba
                .cut(sentence, false)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cutters() {
        assert_eq!("char".parse::<Cutter>().unwrap(), Cutter::Char);
        assert_eq!("jieba".parse::<Cutter>().unwrap(), Cutter::Jieba);
        assert_eq!("none".parse::<Cutter>().unwrap(), Cutter::None);
        assert!(matches!(
            "jeiba".parse::<Cutter>(),
            Err(CorpusError::InvalidCutter(_))
        ));
    }

    #[test]
    fn test_char_cut() {
        let cutter = SentenceCutter::new(Cutter::Char).unwrap();
        assert_eq!(cutter.cut("鸭蛋怎么腌？").len(), 6);
        assert!(cutter.cut("").is_empty());
    }

    #[test]
    fn test_none_behaves_as_char() {
        let cutter = SentenceCutter::new(Cutter::None).unwrap();
        assert_eq!(cutter.cut("唠什么"), vec!["唠", "什", "么"]);
    }

    #[cfg(not(feature = "jieba"))]
    #[test]
    fn test_jieba_without_feature() {
        assert!(matches!(
            SentenceCutter::new(Cutter::Jieba),
            Err(CorpusError::MissingDependency { name: "jieba", .. })
        ));
    }

    #[cfg(feature = "jieba")]
    #[test]
    fn test_jieba_segments_words() {
        let cutter = SentenceCutter::new(Cutter::Jieba).unwrap();
        let words = cutter.cut("今天东莞天气如何");
        assert!(words.len() < 8);
        assert_eq!(words.concat(), "今天东莞天气如何");
    }
}
