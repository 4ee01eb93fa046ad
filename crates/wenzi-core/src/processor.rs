//! # Text processor
//!
//! Maps token and label strings to tensor indices and back. The processor is
//! the part of a model an external serving stack needs to prepare requests,
//! so its whole state lives in a serializable [`ProcessorConfig`].

use std::collections::HashMap;

use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WenziError};

/// Default padding token, always index 0 of a fitted vocabulary.
pub const PAD_TOKEN: &str = "<PAD>";
/// Default token used for out-of-vocabulary input.
pub const UNK_TOKEN: &str = "<UNK>";

/// The kind of prediction a model makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// One label per token.
    Labeling,
    /// One label per sequence.
    Classification,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Labeling => "labeling",
            Task::Classification => "classification",
        }
    }
}

/// Targets for a batch of token sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Labels {
    /// Per-token labels, one sequence per example.
    Sequences(Vec<Vec<String>>),
    /// One class per example.
    Classes(Vec<String>),
}

impl Labels {
    pub fn task(&self) -> Task {
        match self {
            Labels::Sequences(_) => Task::Labeling,
            Labels::Classes(_) => Task::Classification,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Labels::Sequences(y) => y.len(),
            Labels::Classes(y) => y.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels of the examples at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        match self {
            Labels::Sequences(y) => Labels::Sequences(crate::utils::get_list_subset(y, indices)),
            Labels::Classes(y) => Labels::Classes(crate::utils::get_list_subset(y, indices)),
        }
    }

    /// Labels of `self` followed by those of `other`.
    pub fn concat(&self, other: &Labels) -> Result<Self> {
        match (self, other) {
            (Labels::Sequences(a), Labels::Sequences(b)) => {
                Ok(Labels::Sequences(a.iter().chain(b).cloned().collect()))
            }
            (Labels::Classes(a), Labels::Classes(b)) => {
                Ok(Labels::Classes(a.iter().chain(b).cloned().collect()))
            }
            _ => Err(WenziError::TaskMismatch {
                expected: self.task().as_str(),
                actual: other.task().as_str(),
            }),
        }
    }

    /// Check that the labels line up with `x`, example by example.
    pub fn check_aligned(&self, x: &[Vec<String>]) -> Result<()> {
        if self.len() != x.len() {
            return Err(WenziError::LengthMismatch {
                left: x.len(),
                right: self.len(),
            });
        }
        if let Labels::Sequences(y) = self {
            for (tokens, tags) in x.iter().zip(y) {
                if tokens.len() != tags.len() {
                    return Err(WenziError::LengthMismatch {
                        left: tokens.len(),
                        right: tags.len(),
                    });
                }
            }
        }
        Ok(())
    }

    fn flat(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Labels::Sequences(y) => Box::new(y.iter().flatten().map(String::as_str)),
            Labels::Classes(y) => Box::new(y.iter().map(String::as_str)),
        }
    }
}

impl From<Vec<Vec<String>>> for Labels {
    fn from(y: Vec<Vec<String>>) -> Self {
        Labels::Sequences(y)
    }
}

impl From<Vec<String>> for Labels {
    fn from(y: Vec<String>) -> Self {
        Labels::Classes(y)
    }
}

/// Serializable processor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub task: Task,
    /// Tokens in index order.
    #[serde(default)]
    pub vocab: Vec<String>,
    /// Labels in index order. Labeling processors reserve index 0 for padding.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Fixed sequence length; derived from the training data when `None`.
    #[serde(default)]
    pub sequence_length: Option<usize>,
    pub pad_token: String,
    pub unk_token: String,
    /// Tokens seen fewer times than this map to the unknown token.
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    /// Whether `vocab` came from a pretrained embedding and must not be refit.
    #[serde(default)]
    pub pretrained_vocab: bool,
}

fn default_min_count() -> usize {
    1
}

impl ProcessorConfig {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            vocab: Vec::new(),
            labels: Vec::new(),
            sequence_length: None,
            pad_token: PAD_TOKEN.to_string(),
            unk_token: UNK_TOKEN.to_string(),
            min_count: default_min_count(),
            pretrained_vocab: false,
        }
    }

    pub fn with_sequence_length(mut self, sequence_length: Option<usize>) -> Self {
        self.sequence_length = sequence_length;
        self
    }

    pub fn with_min_count(mut self, min_count: usize) -> Self {
        self.min_count = min_count.max(1);
        self
    }

    /// Use an existing vocabulary, e.g. from a pretrained embedding.
    pub fn with_pretrained_vocab(
        mut self,
        vocab: Vec<String>,
        pad_token: impl Into<String>,
        unk_token: impl Into<String>,
    ) -> Self {
        self.vocab = vocab;
        self.pad_token = pad_token.into();
        self.unk_token = unk_token.into();
        self.pretrained_vocab = true;
        self
    }
}

/// Token and label indexer.
#[derive(Debug, Clone)]
pub struct Processor {
    config: ProcessorConfig,
    token2idx: HashMap<String, u32>,
    label2idx: HashMap<String, u32>,
}

impl Processor {
    /// Module path recorded in model metadata.
    pub const MODULE: &'static str = "wenzi_core::processor";
    /// Class name recorded in model metadata.
    pub const CLASS_NAME: &'static str = "Processor";

    pub fn new(config: ProcessorConfig) -> Self {
        let token2idx = index_map(&config.vocab);
        let label2idx = index_map(&config.labels);
        Self {
            config,
            token2idx,
            label2idx,
        }
    }

    /// Rebuild a processor from stored configuration.
    pub fn from_config(config: ProcessorConfig) -> Self {
        Self::new(config)
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn task(&self) -> Task {
        self.config.task
    }

    pub fn is_fitted(&self) -> bool {
        !self.config.vocab.is_empty() && !self.config.labels.is_empty()
    }

    pub fn vocab_size(&self) -> usize {
        self.config.vocab.len()
    }

    pub fn num_labels(&self) -> usize {
        self.config.labels.len()
    }

    pub fn token2idx(&self) -> &HashMap<String, u32> {
        &self.token2idx
    }

    pub fn label2idx(&self) -> &HashMap<String, u32> {
        &self.label2idx
    }

    /// Padded sequence length used by `numerize_x`.
    pub fn sequence_length(&self) -> Result<usize> {
        self.config
            .sequence_length
            .ok_or(WenziError::ProcessorNotFitted)
    }

    /// Index of the padding token.
    pub fn pad_id(&self) -> u32 {
        self.token2idx
            .get(&self.config.pad_token)
            .copied()
            .unwrap_or(0)
    }

    fn unk_id(&self) -> u32 {
        self.token2idx
            .get(&self.config.unk_token)
            .copied()
            .unwrap_or_else(|| self.pad_id())
    }

    /// Build token and label vocabularies from training data.
    ///
    /// A pretrained vocabulary is kept as is; labels and the sequence length
    /// are always derived here unless already fixed.
    pub fn fit(&mut self, x: &[Vec<String>], y: &Labels) -> Result<()> {
        if x.is_empty() {
            return Err(WenziError::EmptyInput("training corpus"));
        }
        if y.task() != self.config.task {
            return Err(WenziError::TaskMismatch {
                expected: self.config.task.as_str(),
                actual: y.task().as_str(),
            });
        }
        y.check_aligned(x)?;

        if !self.config.pretrained_vocab {
            let (pad, unk) = (&self.config.pad_token, &self.config.unk_token);
            let mut vocab = vec![pad.clone(), unk.clone()];
            vocab.extend(
                by_frequency(x.iter().flatten().map(String::as_str))
                    .into_iter()
                    .filter(|(token, count)| *count >= self.config.min_count && token != pad && token != unk)
                    .map(|(token, _)| token),
            );
            self.config.vocab = vocab;
        }

        let mut labels = match self.config.task {
            Task::Labeling => vec![self.config.pad_token.clone()],
            Task::Classification => Vec::new(),
        };
        for (label, _) in by_frequency(y.flat()) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        self.config.labels = labels;

        if self.config.sequence_length.is_none() {
            let mut lengths: Vec<usize> = x.iter().map(Vec::len).collect();
            lengths.sort_unstable();
            let rank = ((lengths.len() as f64) * 0.95).ceil() as usize;
            let length = lengths[rank.clamp(1, lengths.len()) - 1].max(1);
            self.config.sequence_length = Some(length);
        }

        self.token2idx = index_map(&self.config.vocab);
        self.label2idx = index_map(&self.config.labels);

        debug!(
            vocab = self.vocab_size(),
            labels = self.num_labels(),
            sequence_length = ?self.config.sequence_length,
            "fitted processor"
        );
        Ok(())
    }

    /// Convert token sequences to a `(batch, sequence_length)` u32 tensor,
    /// padding and truncating at the end.
    pub fn numerize_x(&self, x: &[Vec<String>], device: &Device) -> Result<Tensor> {
        if !self.is_fitted() {
            return Err(WenziError::ProcessorNotFitted);
        }
        let seq_len = self.sequence_length()?;
        let pad = self.pad_id();
        let unk = self.unk_id();

        let mut ids = Vec::with_capacity(x.len() * seq_len);
        for tokens in x {
            ids.extend(
                tokens
                    .iter()
                    .take(seq_len)
                    .map(|t| self.token2idx.get(t).copied().unwrap_or(unk)),
            );
            ids.extend(std::iter::repeat_n(pad, seq_len.saturating_sub(tokens.len())));
        }

        Ok(Tensor::from_vec(ids, (x.len(), seq_len), device)?)
    }

    /// Convert targets to indices: `(batch, sequence_length)` for labeling,
    /// `(batch,)` for classification.
    pub fn numerize_y(&self, y: &Labels, device: &Device) -> Result<Tensor> {
        if !self.is_fitted() {
            return Err(WenziError::ProcessorNotFitted);
        }
        let lookup = |label: &str| {
            self.label2idx
                .get(label)
                .copied()
                .ok_or_else(|| WenziError::UnknownLabel(label.to_string()))
        };

        match (self.config.task, y) {
            (Task::Labeling, Labels::Sequences(seqs)) => {
                let seq_len = self.sequence_length()?;
                let mut ids = Vec::with_capacity(seqs.len() * seq_len);
                for tags in seqs {
                    for tag in tags.iter().take(seq_len) {
                        ids.push(lookup(tag)?);
                    }
                    ids.extend(std::iter::repeat_n(0u32, seq_len.saturating_sub(tags.len())));
                }
                Ok(Tensor::from_vec(ids, (seqs.len(), seq_len), device)?)
            }
            (Task::Classification, Labels::Classes(classes)) => {
                let ids = classes
                    .iter()
                    .map(|c| lookup(c.as_str()))
                    .collect::<Result<Vec<u32>>>()?;
                Ok(Tensor::from_vec(ids, classes.len(), device)?)
            }
            (expected, other) => Err(WenziError::TaskMismatch {
                expected: expected.as_str(),
                actual: other.task().as_str(),
            }),
        }
    }

    /// Map predicted label indices back to strings.
    ///
    /// For labeling, `lengths` trims each row to its input length; predicted
    /// padding becomes `O`.
    pub fn reverse_numerize(&self, indices: &[Vec<u32>], lengths: &[usize]) -> Labels {
        let label = |idx: u32| -> String {
            match self.config.labels.get(idx as usize) {
                Some(l) if self.config.task == Task::Labeling && idx == 0 => {
                    if self.label2idx.contains_key("O") { "O".to_string() } else { l.clone() }
                }
                Some(l) => l.clone(),
                None => self.config.unk_token.clone(),
            }
        };

        match self.config.task {
            Task::Labeling => Labels::Sequences(
                indices
                    .iter()
                    .zip(lengths)
                    .map(|(row, &len)| row.iter().take(len).map(|&i| label(i)).collect())
                    .collect(),
            ),
            Task::Classification => Labels::Classes(
                indices
                    .iter()
                    .map(|row| row.first().map(|&i| label(i)).unwrap_or_default())
                    .collect(),
            ),
        }
    }
}

fn index_map(items: &[String]) -> HashMap<String, u32> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.clone(), i as u32))
        .collect()
}

/// Distinct items by descending count, ties broken by first appearance.
fn by_frequency<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, item) in items.enumerate() {
        counts.entry(item).or_insert((0, order)).0 += 1;
    }
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|(_, (ca, oa)), (_, (cb, ob))| cb.cmp(ca).then(oa.cmp(ob)));
    sorted
        .into_iter()
        .map(|(item, (count, _))| (item.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<String> {
        s.chars().map(String::from).collect()
    }

    fn ner_data() -> (Vec<Vec<String>>, Labels) {
        let x = vec![chars("去厦门"), chars("厦门大学好")];
        let y = Labels::Sequences(vec![
            vec!["O".into(), "B-LOC".into(), "I-LOC".into()],
            vec!["B-ORG".into(), "I-ORG".into(), "I-ORG".into(), "I-ORG".into(), "O".into()],
        ]);
        (x, y)
    }

    #[test]
    fn test_fit_builds_vocabularies() {
        let (x, y) = ner_data();
        let mut processor = Processor::new(ProcessorConfig::new(Task::Labeling));
        processor.fit(&x, &y).unwrap();

        assert!(processor.is_fitted());
        assert_eq!(processor.config().vocab[0], PAD_TOKEN);
        assert_eq!(processor.config().vocab[1], UNK_TOKEN);
        // 厦 and 门 appear twice and come first.
        assert_eq!(processor.config().vocab[2], "厦");
        assert_eq!(processor.config().vocab[3], "门");
        assert_eq!(processor.config().labels[0], PAD_TOKEN);
        assert_eq!(processor.config().labels[1], "I-ORG");
        assert_eq!(processor.sequence_length().unwrap(), 5);
    }

    #[test]
    fn test_reserved_tokens_in_data_keep_their_index() {
        let x = vec![vec![PAD_TOKEN.to_string(), "a".into(), UNK_TOKEN.to_string()]];
        let y = Labels::Sequences(vec![vec!["O".into(), "B-X".into(), "O".into()]]);
        let mut processor = Processor::new(ProcessorConfig::new(Task::Labeling));
        processor.fit(&x, &y).unwrap();

        assert_eq!(processor.config().vocab, vec![PAD_TOKEN, UNK_TOKEN, "a"]);
        assert_eq!(processor.pad_id(), 0);
        assert_eq!(processor.token2idx()[UNK_TOKEN], 1);

        let short = vec![vec!["a".to_string()]];
        let ids = processor.numerize_x(&short, &Device::Cpu).unwrap();
        assert_eq!(ids.to_vec2::<u32>().unwrap(), vec![vec![2, 0, 0]]);
    }

    #[test]
    fn test_numerize_pads_and_truncates() {
        let (x, y) = ner_data();
        let mut processor = Processor::new(
            ProcessorConfig::new(Task::Labeling).with_sequence_length(Some(4)),
        );
        processor.fit(&x, &y).unwrap();

        let ids = processor
            .numerize_x(&[chars("厦门"), chars("厦门大学好"), chars("北")], &Device::Cpu)
            .unwrap();
        assert_eq!(ids.dims(), &[3, 4]);
        let rows: Vec<Vec<u32>> = ids.to_vec2().unwrap();
        assert_eq!(rows[0], vec![2, 3, 0, 0]);
        assert_eq!(rows[1].len(), 4);
        assert_eq!(rows[2], vec![1, 0, 0, 0]);

        let tags = processor.numerize_y(&y, &Device::Cpu).unwrap();
        assert_eq!(tags.dims(), &[2, 4]);
    }

    #[test]
    fn test_classification_roundtrip_indices() {
        let x = vec![chars("今天天气"), chars("听新闻"), chars("天气好吗")];
        let y = Labels::Classes(vec!["weather".into(), "news".into(), "weather".into()]);
        let mut processor = Processor::new(ProcessorConfig::new(Task::Classification));
        processor.fit(&x, &y).unwrap();

        assert_eq!(processor.config().labels, vec!["weather", "news"]);
        let ids: Vec<u32> = processor.numerize_y(&y, &Device::Cpu).unwrap().to_vec1().unwrap();
        assert_eq!(ids, vec![0, 1, 0]);

        let back = processor.reverse_numerize(&[vec![1], vec![0]], &[3, 4]);
        assert_eq!(back, Labels::Classes(vec!["news".into(), "weather".into()]));
    }

    #[test]
    fn test_reverse_numerize_trims_and_maps_padding() {
        let (x, y) = ner_data();
        let mut processor = Processor::new(ProcessorConfig::new(Task::Labeling));
        processor.fit(&x, &y).unwrap();

        let o = processor.label2idx()["O"];
        let back = processor.reverse_numerize(&[vec![0, o, 0, 0, 0]], &[2]);
        assert_eq!(back, Labels::Sequences(vec![vec!["O".into(), "O".into()]]));
    }

    #[test]
    fn test_unknown_label_and_task_mismatch() {
        let (x, y) = ner_data();
        let mut processor = Processor::new(ProcessorConfig::new(Task::Labeling));
        processor.fit(&x, &y).unwrap();

        let bad = Labels::Sequences(vec![vec!["B-XYZ".into()]]);
        assert!(matches!(
            processor.numerize_y(&bad, &Device::Cpu),
            Err(WenziError::UnknownLabel(_))
        ));

        let mut classifier = Processor::new(ProcessorConfig::new(Task::Classification));
        assert!(matches!(
            classifier.fit(&x, &y),
            Err(WenziError::TaskMismatch { .. })
        ));
    }

    #[test]
    fn test_misaligned_labels_rejected() {
        let x = vec![chars("ab")];
        let y = Labels::Sequences(vec![vec!["O".into()]]);
        let mut processor = Processor::new(ProcessorConfig::new(Task::Labeling));
        assert!(matches!(
            processor.fit(&x, &y),
            Err(WenziError::LengthMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_pretrained_vocab_is_kept() {
        let vocab: Vec<String> = ["[PAD]", "[UNK]", "你", "好"].iter().map(|s| s.to_string()).collect();
        let config = ProcessorConfig::new(Task::Classification)
            .with_pretrained_vocab(vocab.clone(), "[PAD]", "[UNK]");
        let mut processor = Processor::new(config);
        processor
            .fit(&[chars("你们好")], &Labels::Classes(vec!["chat".into()]))
            .unwrap();

        assert_eq!(processor.config().vocab, vocab);
        let ids: Vec<Vec<u32>> = processor
            .numerize_x(&[chars("你们好")], &Device::Cpu)
            .unwrap()
            .to_vec2()
            .unwrap();
        assert_eq!(ids[0], vec![2, 1, 3]);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let (x, y) = ner_data();
        let mut processor = Processor::new(ProcessorConfig::new(Task::Labeling));
        processor.fit(&x, &y).unwrap();

        let json = serde_json::to_string(processor.config()).unwrap();
        let restored = Processor::from_config(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.config(), processor.config());
        assert_eq!(restored.token2idx(), processor.token2idx());
    }
}
