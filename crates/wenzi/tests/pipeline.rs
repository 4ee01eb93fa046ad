use std::fs;

use wenzi::prelude::*;

const NER: &str = "我 O\n在 O\n厦 B-LOC\n门 I-LOC\n\n去 O\n北 B-LOC\n京 I-LOC\n玩 O\n\n";
const SMP: &str = "label,query\nweather,今天天气如何\nnews,听新闻\nweather,明天下雨吗\n";

fn seeded_cache() -> (tempfile::TempDir, CorpusCache) {
    let dir = tempfile::tempdir().unwrap();
    let cache = CorpusCache::new(dir.path());

    let ner = cache.dataset_path(ChineseDailyNerCorpus::NAME);
    fs::create_dir_all(&ner).unwrap();
    fs::write(ner.join("example.train"), NER).unwrap();

    let smp = cache.dataset_path(SMP2018ECDTCorpus::NAME);
    fs::create_dir_all(&smp).unwrap();
    fs::write(smp.join("train.csv"), SMP).unwrap();

    (dir, cache)
}

#[test]
fn labeling_pipeline_survives_save_and_load() {
    let (_dir, cache) = seeded_cache();
    let (x, y) = ChineseDailyNerCorpus::new(cache)
        .with_seed(1)
        .load_data(Subset::Train, true)
        .unwrap();
    assert_eq!(x.len(), 2);
    let y = Labels::Sequences(y);

    let mut model = Model::new(ModelClass::GruLabeling, EmbeddingConfig::bare(8))
        .unwrap()
        .with_hidden_size(8);
    Trainer::new(TrainConfig::default().with_epochs(2).with_seed(1))
        .fit(&mut model, &x, &y, None)
        .unwrap();

    let out = tempfile::tempdir().unwrap();
    model.save(out.path()).unwrap();
    let device = DeviceSpec::Cpu.open().unwrap();
    let loaded = load_model(out.path(), &device).unwrap();
    assert_eq!(loaded.predict(&x, 8).unwrap(), model.predict(&x, 8).unwrap());

    let processor = load_processor(out.path()).unwrap();
    assert_eq!(processor.task(), Task::Labeling);

    let export = convert_to_saved_model(&loaded, out.path().join("serving"), Some("1"), None, None).unwrap();
    assert!(export.ends_with("1"));
}

#[test]
fn classification_corpus_trains() {
    let (_dir, cache) = seeded_cache();
    let (x, y) = SMP2018ECDTCorpus::new(cache)
        .load_data(Subset::Train, false, Cutter::Char)
        .unwrap();
    let y = Labels::Classes(y);

    let mut model = Model::new(ModelClass::GruClassification, EmbeddingConfig::bare(8))
        .unwrap()
        .with_hidden_size(8);
    let reports = Trainer::new(TrainConfig::default().with_epochs(1))
        .fit(&mut model, &x, &y, Some((x.as_slice(), &y)))
        .unwrap();
    assert_eq!(reports.len(), 1);

    match model.predict(&x, 2).unwrap() {
        Labels::Classes(predicted) => assert_eq!(predicted.len(), 3),
        other => panic!("unexpected labels {other:?}"),
    }
}

#[test]
fn ner_corpus_converts_to_doccano() {
    let (_dir, cache) = seeded_cache();
    let (x, y) = ChineseDailyNerCorpus::new(cache)
        .load_data(Subset::Train, false)
        .unwrap();
    let records: Vec<SemanticRecord> = x
        .iter()
        .zip(&y)
        .map(|(tokens, tags)| SemanticRecord::from_tags(tokens, tags))
        .collect();

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("doccano.jsonl");
    let converted = convert_labeling_to_doccano(&records, Some(&path), "").unwrap();

    assert_eq!(converted[0].text, "我在厦门");
    assert_eq!(converted[0].labels, vec![(2, 4, "LOC".to_string())]);
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
}

#[test]
fn helpers_keep_pairs_together() {
    let x = vec!["a", "b", "c", "d"];
    let y = vec![1, 2, 3, 4];
    let (sx, sy) = unison_shuffled_copies(x.clone(), y.clone(), Some(9)).unwrap();
    for (a, b) in sx.iter().zip(&sy) {
        assert_eq!(x.iter().position(|v| v == a), y.iter().position(|v| v == b));
    }
    assert_eq!(get_list_subset(&x, &[0, 2, 10]), vec!["a", "c"]);
}
