//! Benchmarks for filtering, searching and sorting large grids.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_guard::core::{CellValue, Column, ColumnType, RowSnapshot, RowStore};
use grid_guard::filter::{AdvancedFilter, FilterOperator, LogicalOperator};
use grid_guard::pipeline::ViewPipeline;
use grid_guard::search::{SearchEngine, SearchOptions, SearchStrategy};
use grid_guard::sort::{SortDirection, SortEngine};
use std::hint::black_box;

/// Creates a customer grid with `rows` rows
fn create_test_grid(rows: usize) -> RowSnapshot {
    let mut store = RowStore::new(vec![
        Column::text("Name"),
        Column::text("City"),
        Column::integer("Age"),
        Column::new("Balance", ColumnType::Decimal),
    ])
    .unwrap();

    let cities = ["Lyon", "Oslo", "Porto", "Quito", "Osaka"];
    for i in 0..rows {
        let name = if i % 25 == 0 {
            String::new()
        } else {
            format!("customer_{i}")
        };
        store
            .push_row([
                ("Name", CellValue::from(name)),
                ("City", CellValue::from(cities[i % cities.len()])),
                ("Age", CellValue::from((18 + i % 60) as i64)),
                ("Balance", CellValue::from((i as f64) * 3.25 % 1000.0)),
            ])
            .unwrap();
    }
    store.snapshot()
}

fn benchmark_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for rows in [1_000, 10_000, 100_000] {
        let snapshot = create_test_grid(rows);
        let mut view = ViewPipeline::new();
        view.filters_mut()
            .add(AdvancedFilter::new("Age", FilterOperator::Between, "30").with_second_value("50"));
        view.filters_mut().add(
            AdvancedFilter::new("City", FilterOperator::In, "Oslo, Osaka")
                .with_logical_operator(LogicalOperator::Or),
        );

        group.bench_with_input(BenchmarkId::new("between_or_in", rows), &snapshot, |b, snapshot| {
            b.iter(|| black_box(view.apply(snapshot)))
        });
    }

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let snapshot = create_test_grid(10_000);

    let strategies = [
        ("exact", vec![SearchStrategy::Exact]),
        ("case_insensitive", vec![SearchStrategy::CaseInsensitive]),
        ("fuzzy", vec![SearchStrategy::Fuzzy]),
    ];
    for (label, strategy) in strategies {
        let engine = SearchEngine::new(SearchOptions::default().with_strategies(strategy));
        group.bench_function(label, |b| {
            b.iter(|| black_box(engine.search(&snapshot, black_box("osl"))))
        });
    }

    group.finish();
}

fn benchmark_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");

    for rows in [1_000, 10_000, 100_000] {
        let snapshot = create_test_grid(rows);
        let indices = snapshot.row_indices();
        let mut sort = SortEngine::new();
        sort.add_column("City", SortDirection::Ascending);
        sort.add_column("Balance", SortDirection::Descending);

        group.bench_with_input(BenchmarkId::new("two_columns", rows), &indices, |b, indices| {
            b.iter(|| black_box(sort.sort(&snapshot, indices)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_filters, benchmark_search, benchmark_sort);
criterion_main!(benches);
