use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use quince_chess::game_state::game_state::GameState;
use quince_chess::search::board_scoring::{BoardScorer, StandardScorer};
use quince_chess::search::iterative_deepening::{ParallelConfig, SearchConfig, Searcher};

const POSITIONS: &[(&str, &str)] = &[
    ("start", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
    ("kiwipete", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"),
    ("italian", "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10"),
];

fn bench_eval(c: &mut Criterion) {
    let scorer = StandardScorer;
    let mut group = c.benchmark_group("eval");
    for &(name, fen) in POSITIONS {
        let game = GameState::from_fen(fen).expect("benchmark FEN should parse");
        group.bench_with_input(BenchmarkId::from_parameter(name), &game, |b, game| {
            b.iter(|| black_box(scorer.score(black_box(game))));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let depth = 4;
    let mut group = c.benchmark_group(format!("search_d{depth}"));
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(6));
    group.sample_size(10);

    for threads in [1usize, 4] {
        let searcher = Searcher::new(Arc::new(StandardScorer), 32)
            .with_threads(threads)
            .expect("pool should start");
        let config = SearchConfig {
            max_depth: depth,
            parallel: ParallelConfig {
                min_split_depth: 3,
                ..ParallelConfig::default()
            },
            ..SearchConfig::default()
        };

        for &(name, fen) in POSITIONS {
            let game = GameState::from_fen(fen).expect("benchmark FEN should parse");
            group.bench_with_input(BenchmarkId::new(name, format!("t{threads}")), &game, |b, game| {
                b.iter(|| {
                    searcher.clear_table();
                    let result = searcher.search(black_box(game), &config).expect("search should run");
                    black_box(result.best_move)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(search_benches, bench_eval, bench_search);
criterion_main!(search_benches);
