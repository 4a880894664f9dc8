use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use nhl_comparables::features::{FeatureTable, extract_features};
use nhl_comparables::matcher::{build_window_indices, find_comparables};
use nhl_comparables::neighbors::NeighborIndex;
use nhl_comparables::season_table::{PlayerSeasonRecord, SeasonTable};
use nhl_comparables::windows::build_windows;

fn synthetic_record(idx: u32, season: &str) -> PlayerSeasonRecord {
    let gp = 60 + (idx % 23);
    let goals = (idx % 45) as i32;
    let assists = ((idx * 7) % 55) as i32;
    let points = goals + assists;
    PlayerSeasonRecord {
        rank: idx,
        player: format!("Skater {idx}"),
        season: season.to_string(),
        team: "TST".to_string(),
        shoots: "L".to_string(),
        position: (if idx % 3 == 0 { "D" } else { "C" }).to_string(),
        games_played: gp,
        goals,
        assists,
        points,
        plus_minus: (idx % 30) as i32 - 15,
        penalty_minutes: (idx % 60) as i32,
        points_per_game: points as f64 / gp as f64,
        ev_goals: goals * 2 / 3,
        ev_points: points * 2 / 3,
        pp_goals: goals / 4,
        pp_points: points / 4,
        sh_goals: 0,
        sh_points: 0,
        ot_goals: 0,
        gw_goals: (idx % 5) as i32,
        shots: 90 + ((idx * 11) % 220) as i32,
        shooting_pct: format!("{:.1}", 5.0 + (idx % 90) as f64 / 10.0),
        avg_toi: format!("{}:{:02}", 12 + idx % 12, (idx * 13) % 60),
        faceoff_pct: "50.0".to_string(),
    }
}

fn synthetic_tables(seasons: usize, players: u32) -> Vec<FeatureTable> {
    (0..seasons)
        .map(|year| {
            let label = format!("{}-{:02}", 2010 + year, (2011 + year) % 100);
            let records = (1..=players)
                .map(|idx| synthetic_record(idx, &label))
                .collect();
            let table = SeasonTable::from_records(label, records);
            extract_features(&table).expect("synthetic rows are well formed")
        })
        .collect()
}

fn bench_window_build(c: &mut Criterion) {
    let tables = synthetic_tables(6, 600);
    c.bench_function("window_build", |b| {
        b.iter(|| {
            let windows = build_windows(black_box(&tables), 3);
            black_box(windows.len());
        })
    });
}

fn bench_comparables_query(c: &mut Criterion) {
    let tables = synthetic_tables(6, 600);
    let windows = build_windows(&tables, 3);
    let indices = build_window_indices(&windows).expect("finite synthetic vectors");
    let query = windows.last().unwrap().vectors()[0].clone();

    c.bench_function("comparables_query", |b| {
        b.iter(|| {
            let matched = find_comparables(
                black_box(&indices),
                black_box(&windows),
                black_box(&query),
                3,
            );
            black_box(matched.len());
        })
    });
}

fn bench_neighbor_fit(c: &mut Criterion) {
    let tables = synthetic_tables(3, 600);
    let windows = build_windows(&tables, 3);
    let vectors = windows[0].vectors().to_vec();

    c.bench_function("neighbor_fit", |b| {
        b.iter(|| {
            let index = NeighborIndex::fit(black_box(vectors.clone())).unwrap();
            black_box(index.len());
        })
    });
}

criterion_group!(
    pipeline,
    bench_window_build,
    bench_comparables_query,
    bench_neighbor_fit
);
criterion_main!(pipeline);
