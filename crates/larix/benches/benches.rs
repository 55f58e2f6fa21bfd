use criterion::{criterion_group, criterion_main, Criterion};
use larix::{
    automaton,
    grammar::{examples, Grammar, GrammarDef, GrammarDefError},
};

criterion_main!(benches);
criterion_group!(benches, bench_slr_gen);

fn bench_slr_gen(c: &mut Criterion) {
    bench_grammar(c, "arithmetic", examples::arithmetic);
    bench_grammar(c, "braced_list", examples::braced_list);
    bench_grammar(c, "key_value_list", examples::key_value_list);
}

fn bench_grammar(
    c: &mut Criterion,
    name: &str,
    define: fn(&mut GrammarDef) -> Result<(), GrammarDefError>,
) {
    let grammar = Grammar::define(define).unwrap();

    let mut group = c.benchmark_group(name);
    group.bench_function("lr0", |b| b.iter(|| automaton::lr0(&grammar)));
    group.bench_function("slr", |b| b.iter(|| automaton::slr(&grammar)));
    group.finish();
}
