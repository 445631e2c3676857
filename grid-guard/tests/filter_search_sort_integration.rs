//! Filtering, searching and sorting a product table together.

use grid_guard::core::{CellValue, Column, ColumnType, RowSnapshot, RowStore};
use grid_guard::filter::{AdvancedFilter, FilterOperator, LogicalOperator, MultiColumnFilterSet};
use grid_guard::pipeline::ViewPipeline;
use grid_guard::search::{highlight, SearchEngine, SearchOptions, SearchStrategy};
use grid_guard::sort::{SortDirection, SortEngine, SortSpec};

fn products() -> RowSnapshot {
    let mut store = RowStore::new(vec![
        Column::text("Name"),
        Column::text("Category"),
        Column::new("Price", ColumnType::Decimal),
        Column::integer("Stock"),
    ])
    .unwrap();
    let rows = [
        ("Wireless Mouse", "Electronics", CellValue::from(25.5), 10),
        ("Mouse Pad", "Accessories", CellValue::from(8), 0),
        ("Keyboard", "Electronics", CellValue::from(45), 5),
        ("USB Cable", "", CellValue::from("n/a"), 100),
        ("Monitor", "Electronics", CellValue::from(199.99), 2),
    ];
    for (name, category, price, stock) in rows {
        store
            .push_row([
                ("Name", CellValue::from(name)),
                ("Category", CellValue::from(category)),
                ("Price", price),
                ("Stock", CellValue::from(stock)),
            ])
            .unwrap();
    }
    store.snapshot()
}

#[test]
fn test_filters_fold_left_to_right() {
    let set = MultiColumnFilterSet::new()
        .with_filter(AdvancedFilter::new("Category", FilterOperator::Equals, "electronics"))
        .with_filter(AdvancedFilter::new("Price", FilterOperator::LessThan, "50"))
        .with_filter(
            AdvancedFilter::new("Stock", FilterOperator::GreaterThan, "50")
                .with_logical_operator(LogicalOperator::Or),
        );
    assert_eq!(set.apply_all(&products()), vec![0, 2, 3]);
}

#[test]
fn test_range_filters_fail_closed_on_non_numbers() {
    let snapshot = products();
    let between = MultiColumnFilterSet::new().with_filter(
        AdvancedFilter::new("Price", FilterOperator::Between, "10").with_second_value("50"),
    );
    assert_eq!(between.apply_all(&snapshot), vec![0, 2]);

    let outside = MultiColumnFilterSet::new().with_filter(
        AdvancedFilter::new("Price", FilterOperator::NotBetween, "10").with_second_value("50"),
    );
    assert_eq!(outside.apply_all(&snapshot), vec![1, 4]);
}

#[test]
fn test_in_list_and_disabled_filters() {
    let snapshot = products();
    let mut set = MultiColumnFilterSet::new()
        .with_filter(AdvancedFilter::new("Category", FilterOperator::In, "Accessories, electronics"))
        .with_filter(AdvancedFilter::new("Stock", FilterOperator::IsEmpty, "").disabled());
    assert_eq!(set.apply_all(&snapshot), vec![0, 1, 2, 4]);

    set.filters_mut()[1].set_enabled(true);
    assert!(set.apply_all(&snapshot).is_empty());
}

#[test]
fn test_scoped_search_and_highlight() {
    let snapshot = products();
    let engine = SearchEngine::new(SearchOptions::default().with_scope("Name"));
    let results = engine.search(&snapshot, "mouse");

    let rows: Vec<usize> = results.iter().map(|r| r.row_index).collect();
    assert_eq!(rows, vec![0, 1]);
    assert!(results.iter().all(|r| (r.relevance_score() - 0.8).abs() < 1e-9));

    let pad = &results[1];
    assert_eq!(
        highlight("Mouse Pad", pad.matches_in("Name"), "<mark>", "</mark>"),
        "<mark>Mouse</mark> Pad"
    );
}

#[test]
fn test_regex_search_respects_max_results() {
    let snapshot = products();
    let options = SearchOptions::default()
        .with_strategies([SearchStrategy::Regex])
        .with_scope("Name")
        .with_max_results(1);
    let results = SearchEngine::new(options).search(&snapshot, "^M");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].row_index, 1);
}

#[test]
fn test_sort_puts_unparseable_prices_after_numbers() {
    let snapshot = products();
    let mut sort = SortEngine::new();
    sort.add(SortSpec::descending("Price"));
    assert_eq!(sort.sort(&snapshot, &snapshot.row_indices()), vec![4, 2, 0, 1, 3]);
}

#[test]
fn test_pipeline_filters_searches_and_sorts() {
    let snapshot = products();
    let mut view = ViewPipeline::new();
    view.filters_mut()
        .add(AdvancedFilter::new("Category", FilterOperator::Equals, "Electronics"));
    view.set_search(
        "o",
        SearchOptions::default()
            .with_strategies([SearchStrategy::CaseInsensitive])
            .with_scope("Name"),
    );
    view.sort_mut().add_column("Stock", SortDirection::Ascending);

    let result = view.apply(&snapshot);
    assert_eq!(result.row_indices, vec![4, 2, 0]);
    assert_eq!(result.search_results.len(), 3);
    assert!(result.search_result(3).is_none());
}

#[test]
fn test_rows_are_addressed_by_row_index() {
    use grid_guard::core::Row;

    let snapshot = RowSnapshot::new(
        vec![Column::text("Name")],
        vec![
            Row::new(5).with_value("Name", "Ann"),
            Row::new(6).with_value("Name", "Bob"),
        ],
    );
    let results = SearchEngine::new(SearchOptions::default()).search(&snapshot, "Bob");
    let rows: Vec<usize> = results.iter().map(|r| r.row_index).collect();
    assert_eq!(rows, vec![6]);

    let mut sort = SortEngine::new();
    sort.add(SortSpec::descending("Name"));
    assert_eq!(sort.sort(&snapshot, &snapshot.row_indices()), vec![6, 5]);

    let set = MultiColumnFilterSet::new()
        .with_filter(AdvancedFilter::new("Name", FilterOperator::StartsWith, "a"));
    assert_eq!(set.apply_all(&snapshot), vec![5]);
}
