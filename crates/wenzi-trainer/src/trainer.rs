//! Training loop for wenzi models.

use anyhow::{Context, bail};
use candle_core::{D, DType, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use serde::Serialize;
use tracing::{debug, info};
use wenzi_core::utils::get_list_subset;
use wenzi_core::{Labels, Model, Task};

use crate::data::BatchSampler;

/// Optimisation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 64,
            learning_rate: 1e-3,
            weight_decay: 0.01,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Loss and accuracy over a dataset.
///
/// For labeling the accuracy counts non-padding positions only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
    pub samples: usize,
}

/// Summary of one training epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train: Evaluation,
    pub validation: Option<Evaluation>,
}

/// Cross entropy over `(batch, seq, labels)` logits that ignores targets
/// equal to the padding index 0.
pub fn masked_cross_entropy(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let num_labels = logits.dim(D::Minus1)?;
    let logits = logits.reshape(((), num_labels))?;
    let targets = targets.flatten_all()?;

    let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
    let picked = log_probs.gather(&targets.unsqueeze(1)?, 1)?.squeeze(1)?;
    let mask = targets.ne(0u32)?.to_dtype(DType::F32)?;

    let count = mask.sum_all()?.to_scalar::<f32>()?.max(1.0);
    (picked * mask)?.sum_all()?.affine(-1.0 / f64::from(count), 0.0)
}

fn task_loss(task: Task, logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    match task {
        Task::Labeling => masked_cross_entropy(logits, targets),
        Task::Classification => candle_nn::loss::cross_entropy(logits, targets),
    }
}

/// `(correct, counted)` predictions in a batch.
fn batch_hits(task: Task, logits: &Tensor, targets: &Tensor) -> candle_core::Result<(usize, usize)> {
    let predicted = logits.argmax(D::Minus1)?.flatten_all()?.to_vec1::<u32>()?;
    let expected = targets.flatten_all()?.to_vec1::<u32>()?;

    let mut correct = 0;
    let mut counted = 0;
    for (p, t) in predicted.iter().zip(&expected) {
        if task == Task::Labeling && *t == 0 {
            continue;
        }
        counted += 1;
        if p == t {
            correct += 1;
        }
    }
    Ok((correct, counted))
}

#[derive(Default)]
struct Tally {
    loss: f64,
    batches: usize,
    correct: usize,
    counted: usize,
    samples: usize,
}

impl Tally {
    fn add(&mut self, loss: f32, hits: (usize, usize), samples: usize) {
        self.loss += f64::from(loss);
        self.batches += 1;
        self.correct += hits.0;
        self.counted += hits.1;
        self.samples += samples;
    }

    fn finish(&self) -> Evaluation {
        Evaluation {
            loss: if self.batches > 0 { (self.loss / self.batches as f64) as f32 } else { 0.0 },
            accuracy: if self.counted > 0 { self.correct as f32 / self.counted as f32 } else { 0.0 },
            samples: self.samples,
        }
    }
}

pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train `model` on `x`/`y`, building it first when needed.
    ///
    /// Returns one report per epoch. `validation` is evaluated after every
    /// epoch when given.
    pub fn fit(
        &self,
        model: &mut Model,
        x: &[Vec<String>],
        y: &Labels,
        validation: Option<(&[Vec<String>], &Labels)>,
    ) -> anyhow::Result<Vec<EpochReport>> {
        if x.is_empty() {
            bail!("cannot train on an empty dataset");
        }
        y.check_aligned(x)?;
        if !model.is_built() {
            model.build_model_with_validation(x, y, validation)?;
        }

        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            weight_decay: self.config.weight_decay,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(model.trainable_vars()?, params)?;
        let mut sampler = BatchSampler::new(x.len(), self.config.batch_size, self.config.seed);

        info!(
            samples = x.len(),
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            batches = sampler.num_batches(),
            "starting training"
        );

        let mut reports = Vec::with_capacity(self.config.epochs);
        for epoch in 1..=self.config.epochs {
            let mut tally = Tally::default();

            for (step, batch) in sampler.epoch().into_iter().enumerate() {
                let batch_x = get_list_subset(x, &batch);
                let batch_y = y.subset(&batch);
                let ids = model.processor().numerize_x(&batch_x, model.device())?;
                let targets = model.processor().numerize_y(&batch_y, model.device())?;

                let logits = model.forward(&ids)?;
                let loss = task_loss(model.task(), &logits, &targets)?;
                optimizer.backward_step(&loss)?;

                let loss = loss.to_scalar::<f32>()?;
                tally.add(loss, batch_hits(model.task(), &logits, &targets)?, batch.len());
                debug!(epoch, step, loss, "training step");
            }

            let train = tally.finish();
            let validation = match validation {
                Some((vx, vy)) => Some(self.evaluate(model, vx, vy).context("validation failed")?),
                None => None,
            };

            info!(
                epoch,
                loss = train.loss,
                accuracy = train.accuracy,
                val_accuracy = ?validation.map(|v| v.accuracy),
                "epoch complete"
            );
            reports.push(EpochReport {
                epoch,
                train,
                validation,
            });
        }

        Ok(reports)
    }

    /// Loss and accuracy of `model` on `x`/`y` without updating weights.
    pub fn evaluate(&self, model: &Model, x: &[Vec<String>], y: &Labels) -> anyhow::Result<Evaluation> {
        y.check_aligned(x)?;
        let mut tally = Tally::default();

        let indices: Vec<usize> = (0..x.len()).collect();
        for batch in indices.chunks(self.config.batch_size.max(1)) {
            let batch_x = get_list_subset(x, batch);
            let batch_y = y.subset(batch);
            let ids = model.processor().numerize_x(&batch_x, model.device())?;
            let targets = model.processor().numerize_y(&batch_y, model.device())?;

            let logits = model.forward(&ids)?.detach();
            let loss = task_loss(model.task(), &logits, &targets)?.to_scalar::<f32>()?;
            tally.add(loss, batch_hits(model.task(), &logits, &targets)?, batch.len());
        }

        Ok(tally.finish())
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use wenzi_core::{EmbeddingConfig, ModelClass};

    fn chars(s: &str) -> Vec<String> {
        s.chars().map(String::from).collect()
    }

    fn intents() -> (Vec<Vec<String>>, Labels) {
        let x = vec![chars("今天天气"), chars("听新闻"), chars("明天天气"), chars("播新闻")];
        let y = Labels::Classes(vec![
            "weather".into(),
            "news".into(),
            "weather".into(),
            "news".into(),
        ]);
        (x, y)
    }

    #[test]
    fn test_masked_cross_entropy_ignores_padding() {
        let logits = Tensor::zeros((1, 3, 2), DType::F32, &Device::Cpu).unwrap();
        let targets = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let loss = masked_cross_entropy(&logits, &targets)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_masked_cross_entropy_all_padding() {
        let logits = Tensor::zeros((2, 2, 3), DType::F32, &Device::Cpu).unwrap();
        let targets = Tensor::zeros((2, 2), DType::U32, &Device::Cpu).unwrap();
        let loss = masked_cross_entropy(&logits, &targets)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_fit_reduces_classification_loss() {
        let (x, y) = intents();
        let mut model = Model::new(ModelClass::GruClassification, EmbeddingConfig::bare(8))
            .unwrap()
            .with_hidden_size(8);
        let trainer = Trainer::new(
            TrainConfig::default()
                .with_epochs(30)
                .with_batch_size(4)
                .with_learning_rate(0.05)
                .with_seed(11),
        );

        let reports = trainer.fit(&mut model, &x, &y, Some((x.as_slice(), &y))).unwrap();
        assert_eq!(reports.len(), 30);
        assert!(reports.last().unwrap().train.loss < reports[0].train.loss);
        assert!(reports.iter().all(|r| r.validation.is_some()));
        assert_eq!(reports[0].train.samples, 4);
    }

    #[test]
    fn test_fit_labeling_model() {
        let x = vec![chars("我在厦门"), chars("去北京")];
        let y = Labels::Sequences(vec![
            vec!["O".into(), "O".into(), "B-LOC".into(), "I-LOC".into()],
            vec!["O".into(), "B-LOC".into(), "I-LOC".into()],
        ]);
        let mut model = Model::new(ModelClass::GruLabeling, EmbeddingConfig::bare(8))
            .unwrap()
            .with_hidden_size(8);
        let trainer = Trainer::new(TrainConfig::default().with_epochs(2).with_batch_size(1).with_seed(5));

        let reports = trainer.fit(&mut model, &x, &y, None).unwrap();
        assert_eq!(reports.len(), 2);
        let eval = trainer.evaluate(&model, &x, &y).unwrap();
        assert!((0.0..=1.0).contains(&eval.accuracy));
        assert!(eval.loss.is_finite());
    }

    #[test]
    fn test_fit_with_validation_labels_unseen_in_training() {
        let (x, y) = intents();
        let valid_x = vec![chars("放首歌")];
        let valid_y = Labels::Classes(vec!["music".into()]);
        let mut model = Model::new(ModelClass::GruClassification, EmbeddingConfig::bare(4))
            .unwrap()
            .with_hidden_size(4);
        let trainer = Trainer::new(TrainConfig::default().with_epochs(1).with_seed(2));

        let reports = trainer
            .fit(&mut model, &x, &y, Some((valid_x.as_slice(), &valid_y)))
            .unwrap();
        let validation = reports[0].validation.unwrap();
        assert_eq!(validation.samples, 1);
        assert_eq!(model.processor().num_labels(), 3);
    }

    #[test]
    fn test_fit_rejects_misaligned_data() {
        let (x, _) = intents();
        let y = Labels::Classes(vec!["weather".into()]);
        let mut model = Model::new(ModelClass::GruClassification, EmbeddingConfig::bare(4)).unwrap();
        assert!(Trainer::default().fit(&mut model, &x, &y, None).is_err());
        assert!(Trainer::default().fit(&mut model, &[], &Labels::Classes(vec![]), None).is_err());
    }
}
