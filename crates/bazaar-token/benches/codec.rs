use bazaar_token::{SigningSecret, TokenCodec};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn codec_benchmark(c: &mut Criterion) {
    let codec = TokenCodec::new(SigningSecret::new("benchmark-secret-key-0123456789"));
    let token = codec.mint(42);

    let mut group = c.benchmark_group("token");

    group.bench_function("mint", |b| b.iter(|| codec.mint(black_box(42))));

    group.bench_function("validate", |b| {
        b.iter(|| codec.validate(black_box(&token)))
    });

    group.bench_function("validate_garbage", |b| {
        b.iter(|| codec.validate(black_box("bm90LWEtdG9rZW4")))
    });

    group.finish();
}

criterion_group!(benches, codec_benchmark);
criterion_main!(benches);
