use criterion::{black_box, criterion_group, criterion_main, Criterion};
use calypso_core::conll::convert_bio_tags_to_conll_format;
use calypso_core::tags::parse_tags;
use calypso_core::ViterbiDecoder;

const LABELS: &[&str] = &[
    "O", "B-ARG0", "I-ARG0", "B-ARG1", "I-ARG1", "B-ARG2", "I-ARG2", "B-ARGM-TMP", "I-ARGM-TMP",
    "B-ARGM-LOC", "I-ARGM-LOC", "B-ARGM-MNR", "I-ARGM-MNR", "B-V",
];

fn bench_viterbi(c: &mut Criterion) {
    let tags = parse_tags(LABELS).unwrap();
    let decoder = ViterbiDecoder::new(&tags);
    let num_tags = tags.len();

    // Deterministic pseudo-scores for a 40 token sentence.
    let emissions: Vec<Vec<f32>> = (0..40)
        .map(|pos| {
            (0..num_tags)
                .map(|tag| (((pos * 31 + tag * 17) % 23) as f32) / 23.0)
                .collect()
        })
        .collect();
    let transitions = vec![vec![0.0f32; num_tags]; num_tags];

    c.bench_function("viterbi_decode_40_tokens", |b| {
        b.iter(|| decoder.decode(black_box(&emissions), black_box(&transitions)).unwrap());
    });

    let path = decoder.decode(&emissions, &transitions).unwrap();
    let decoded: Vec<_> = path.iter().map(|&idx| tags[idx].clone()).collect();
    c.bench_function("conll_convert_40_tokens", |b| {
        b.iter(|| convert_bio_tags_to_conll_format(black_box(&decoded)));
    });
}

criterion_group!(benches, bench_viterbi);
criterion_main!(benches);
