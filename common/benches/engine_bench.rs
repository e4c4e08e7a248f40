use criterion::{criterion_group, criterion_main, Criterion, SamplingMode};
use std::hint::black_box;
use std::time::Duration;
use common::PlayerId;
use common::games::SessionRng;
use common::games::snake::{
    Direction, GameMode, GameSettings, GameState, GameStatus, SpectatorSettings, simulate_step,
    spawn_bot,
};

const GAME_TICKS: usize = 1_000;

fn bench_game_ticks(mode: GameMode) {
    let settings = GameSettings::default();
    let mut rng = SessionRng::new(1);
    let mut state = GameState::new(mode, 0, &settings, &mut rng);
    state.status = GameStatus::Playing;

    let turns = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];
    for tick in 0..GAME_TICKS {
        let requested = turns[(tick / 7) % turns.len()];
        let (next, _) = state.advance(requested, &settings, &mut rng);
        state = if next.status == GameStatus::GameOver {
            let mut fresh = GameState::new(mode, next.high_score, &settings, &mut rng);
            fresh.status = GameStatus::Playing;
            fresh
        } else {
            next
        };
    }
    black_box(state);
}

fn bench_spectator_steps() {
    let settings = SpectatorSettings::default();
    let mut rng = SessionRng::new(2);
    let mut bots: Vec<_> = (0..10)
        .map(|i| spawn_bot(PlayerId::new(format!("p{i}")), "bench", &settings, &mut rng))
        .collect();
    for _ in 0..100 {
        for bot in bots.iter_mut() {
            *bot = simulate_step(bot, &settings, &mut rng);
        }
    }
    black_box(bots);
}

fn engine_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    group
        .sampling_mode(SamplingMode::Flat)
        .sample_size(20)
        .measurement_time(Duration::from_secs(10));

    group.bench_function("1000_ticks_walls", |b| {
        b.iter(|| bench_game_ticks(GameMode::Walls))
    });

    group.bench_function("1000_ticks_pass_through", |b| {
        b.iter(|| bench_game_ticks(GameMode::PassThrough))
    });

    group.bench_function("10_bots_100_steps", |b| {
        b.iter(bench_spectator_steps)
    });

    group.finish();
}

criterion_group!(benches, engine_bench);
criterion_main!(benches);
