use criterion::{criterion_group, criterion_main, Criterion};
use paprika::pipeline::compile;
use std::hint::black_box;

static INPUTS: [(&str, &str); 3] = [
    ("sum", include_str!("../../demos/sum.pap")),
    ("records", include_str!("../../demos/records.pap")),
    ("ranges", include_str!("../../demos/ranges.pap")),
];

fn criterion_benchmark(c: &mut Criterion) {
    for (name, input) in INPUTS {
        c.bench_function(&format!("compile/{name}"), |b| {
            b.iter(|| {
                let compilation = compile(black_box(input)).unwrap();
                black_box(compilation.program);
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
