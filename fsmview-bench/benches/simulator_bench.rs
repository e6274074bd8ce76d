//! Simulator benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fsmview_core::{parse, Model, Simulator, TextRenderer};
use std::io;

/// States nested `depth` levels deep. Only the outermost compound handles
/// `escape`, so resolving it from the innermost state bubbles all the way up.
fn nested_model(depth: usize) -> Model {
    let mut src = String::from("STATE l0 _ \"Level 0\" : COMPOUND;\n");
    for i in 1..depth {
        src.push_str(&format!("STATE l{} l{} \"Level {}\" : COMPOUND;\n", i, i - 1, i));
    }
    src.push_str(&format!("STATE leaf l{} \"Leaf\" : INITIAL;\n", depth - 1));
    src.push_str("STATE out _ \"Out\" : SIMPLE;\n");
    src.push_str("TRIGGER escape \"Escape\";\nTRIGGER back \"Back\";\n");
    src.push_str("TRANSITION esc l0 -> out escape;\n");
    src.push_str("TRANSITION ret out -> leaf back;\n");
    for i in 0..depth {
        src.push_str(&format!("ACTION x{} \"Leave {}\" : EXIT_ACTION ON l{};\n", i, i, i));
    }
    parse(&src).model
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator_resolve");

    for depth in [1, 8, 64] {
        let mut model = nested_model(depth);
        group.bench_with_input(BenchmarkId::new("bubbling", depth), &depth, |b, _| {
            let sim = Simulator::new(&mut model, &TextRenderer);
            b.iter(|| black_box(sim.resolve("escape")))
        });
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator_fire");

    for depth in [1, 8, 64] {
        let mut model = nested_model(depth);
        group.bench_with_input(BenchmarkId::new("escape_and_back", depth), &depth, |b, _| {
            let mut sim = Simulator::new(&mut model, &TextRenderer);
            let mut sink = io::sink();
            b.iter(|| {
                sim.execute_transition("esc", &mut sink).unwrap();
                sim.execute_transition("ret", &mut sink).unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_round_trip);
criterion_main!(benches);
