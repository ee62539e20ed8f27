use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ucl::{parse, Context, Instance};

const PIPELINE_SCRIPT: &str = r#"["a" "b" "c" "d" "e"] | map { |x| toUpper $x } | head"#;

const LOOP_SCRIPT: &str = r#"
set total 0
foreach [1 2 3 4 5 6 7 8 9 10] { |n|
    set total (add $total $n)
}
cat $total
"#;

const PROC_SCRIPT: &str = r#"
proc upcat { |a b| toUpper (cat $a $b) }
upcat "x" "y"
"#;

fn sink_instance() -> Instance {
    Instance::builder().output(std::io::sink()).build()
}

fn bench_parse(c: &mut Criterion) {
    let mut g = c.benchmark_group("parse");

    g.bench_function("pipeline", |b| {
        b.iter(|| parse(black_box(PIPELINE_SCRIPT)).unwrap())
    });
    g.bench_function("loop", |b| b.iter(|| parse(black_box(LOOP_SCRIPT)).unwrap()));

    g.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut g = c.benchmark_group("eval");

    let inst = sink_instance();
    let ctx = Context::new();

    g.bench_function("pipeline_map", |b| {
        b.iter(|| inst.eval(&ctx, black_box(PIPELINE_SCRIPT)).unwrap())
    });
    g.bench_function("foreach_sum", |b| {
        b.iter(|| inst.eval(&ctx, black_box(LOOP_SCRIPT)).unwrap())
    });
    g.bench_function("proc_call", |b| {
        b.iter(|| inst.eval(&ctx, black_box(PROC_SCRIPT)).unwrap())
    });

    g.finish();
}

criterion_group!(benches, bench_parse, bench_eval);
criterion_main!(benches);
