use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wenzi_core::embedding::BareEmbedding;
use wenzi_core::{convert_labeling_to_doccano, GruEncoder, SemanticRecord};

fn bench_gru_encoder(c: &mut Criterion) {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let embedding = BareEmbedding::new(5000, 100, vb.pp("embedding")).unwrap();
    let encoder = GruEncoder::new(embedding, 128, vb.pp("gru")).unwrap();

    let ids: Vec<u32> = (0..32 * 50).map(|i| (i * 7 % 5000) as u32).collect();
    let x = Tensor::from_vec(ids, (32, 50), &Device::Cpu).unwrap();
    let hidden = encoder.initialize_hidden_state(32, &Device::Cpu).unwrap();

    c.bench_function("gru_encoder_batch_32x50", |b| {
        b.iter(|| encoder.forward(black_box(&x), black_box(&hidden)).unwrap());
    });
}

fn bench_doccano(c: &mut Criterion) {
    let tokens: Vec<String> = "海钓比赛地点在厦门与金门之间的海域".chars().map(String::from).collect();
    let tags = [
        "O", "O", "O", "O", "O", "O", "O", "B-LOC", "I-LOC", "O", "B-LOC", "I-LOC", "O", "O", "O", "O", "O",
    ];
    let records: Vec<SemanticRecord> = (0..1000)
        .map(|_| SemanticRecord::from_tags(&tokens, &tags))
        .collect();

    c.bench_function("doccano_convert_1000", |b| {
        b.iter(|| convert_labeling_to_doccano(black_box(&records), None, "").unwrap());
    });
}

criterion_group!(benches, bench_gru_encoder, bench_doccano);
criterion_main!(benches);
