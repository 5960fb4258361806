use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vicmd::cmdline::{classify_position, split};
use vicmd::commands;

fn make_line(repeats: usize) -> String {
    let chunk = "cd 'some dir' | s/a|b/c/g | echo 1 || 0 | select *.rs,*.toml | ";
    let mut line = chunk.repeat(repeats);
    line.push_str("nnoremap x :cd a|cd b<cr>");
    line
}

fn bench_split(c: &mut Criterion) {
    let reg = commands::registry();
    let small = make_line(1);
    let med = make_line(10);
    let large = make_line(100);

    let mut g = c.benchmark_group("split");
    g.bench_function("small", |b| b.iter(|| split(black_box(&small), &reg)));
    g.bench_function("med", |b| b.iter(|| split(black_box(&med), &reg)));
    g.bench_function("large", |b| b.iter(|| split(black_box(&large), &reg)));
    g.finish();
}

fn bench_classify(c: &mut Criterion) {
    let reg = commands::registry();
    let line = "substitute/a\\/b|c/'d e'/gi";

    let mut g = c.benchmark_group("classify_position");
    g.bench_function("every_cursor", |b| {
        b.iter(|| {
            (0..=line.len())
                .map(|cursor| classify_position(&reg, black_box(line), cursor))
                .count()
        })
    });
    g.finish();
}

criterion_group!(benches, bench_split, bench_classify);
criterion_main!(benches);
