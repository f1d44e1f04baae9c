use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tui_achievement_tracker::internal::models::Game;
use tui_achievement_tracker::internal::stats::LibraryStats;
use tui_achievement_tracker::internal::ui::sort::{SortBy, SortOrder, sort_games};
use tui_achievement_tracker::internal::ui::view::wrap_description;

fn library(size: u32) -> Vec<Game> {
    (0..size)
        .map(|i| Game {
            id: i,
            name: format!("Game {}", (i * 7919) % size),
            achievements: i % 60,
            completed: (i * 13) % 61,
            playtime_minutes: (i * 37) % 10_000,
            ..Default::default()
        })
        .collect()
}

fn benchmark_library_stats(c: &mut Criterion) {
    let games = library(5_000);
    c.bench_function("library stats 5k games", |b| {
        b.iter(|| LibraryStats::from_games(black_box(&games)))
    });
}

fn benchmark_sort(c: &mut Criterion) {
    let games = library(5_000);
    for sort_by in [SortBy::Name, SortBy::Completion] {
        c.bench_function(&format!("sort 5k games by {}", sort_by.as_str()), |b| {
            b.iter_batched(
                || games.clone(),
                |mut games| sort_games(black_box(&mut games), sort_by, SortOrder::Descending),
                criterion::BatchSize::SmallInput,
            )
        });
    }
}

fn benchmark_wrap_description(c: &mut Criterion) {
    let text = "Complete every chapter on the hardest difficulty without dying once, then do it again with the commentary turned on.";
    c.bench_function("wrap achievement description", |b| {
        b.iter(|| wrap_description(black_box(text), black_box(60)))
    });
}

criterion_group!(
    benches,
    benchmark_library_stats,
    benchmark_sort,
    benchmark_wrap_description
);
criterion_main!(benches);
