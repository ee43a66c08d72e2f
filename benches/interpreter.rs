//! Benchmarks for the interpreter and cost evaluation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use evolve_bf::{
    compute::{evaluate, evolution::ProgramRng, score},
    schema::{CostOptions, Program},
};

const HELLO_WORLD: &str = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    let hello = Program::parse(HELLO_WORLD);
    group.bench_function("hello_world", |b| {
        b.iter(|| evaluate(black_box(&hello), "", 100));
    });

    let cat = Program::parse(",[.,]");
    for len in [16, 256, 4096] {
        let input: String = "abcdefghijklmnop".chars().cycle().take(len).collect();
        group.bench_with_input(BenchmarkId::new("cat", len), &input, |b, input| {
            b.iter(|| evaluate(black_box(&cat), black_box(input), 100));
        });
    }

    group.finish();
}

fn bench_score_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_population");
    let options = CostOptions::default();
    let inputs = ["1", "2", "3"];
    let targets = ["one", "two", "three"];

    for size in [8, 32, 128] {
        let mut rng = ProgramRng::new(42);
        let population = rng.random_population(100, size);

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &population,
            |b, population| {
                b.iter(|| {
                    for program in population {
                        black_box(score(&inputs, &targets, program, &options));
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_score_population);
criterion_main!(benches);
