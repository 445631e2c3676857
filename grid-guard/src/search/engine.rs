use std::cmp::Ordering;

use tracing::{debug, instrument};

use super::strategy::CompiledQuery;
use super::{SearchOptions, SearchResult};
use crate::core::{Row, RowSnapshot};

/// Scans rows for a search term and ranks them by relevance.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::{Column, Row, RowSnapshot};
/// use grid_guard::search::{SearchEngine, SearchOptions};
///
/// let snapshot = RowSnapshot::new(
///     vec![Column::text("Name"), Column::text("City")],
///     vec![
///         Row::new(0).with_value("Name", "Ann").with_value("City", "Annecy"),
///         Row::new(1).with_value("Name", "Bob").with_value("City", "Paris"),
///         Row::new(2).with_value("Name", "Joanne").with_value("City", "Lyon"),
///     ],
/// );
///
/// let results = SearchEngine::new(SearchOptions::default()).search(&snapshot, "ann");
/// let rows: Vec<usize> = results.iter().map(|r| r.row_index).collect();
/// assert_eq!(rows, vec![0, 2]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SearchOptions) {
        self.options = options;
    }

    /// Searches every row of the snapshot.
    pub fn search(&self, snapshot: &RowSnapshot, term: &str) -> Vec<SearchResult> {
        self.search_rows(snapshot, &snapshot.row_indices(), term)
    }

    /// Searches the given rows only. Results are ordered by relevance, then
    /// by row index; rows without matches are left out. An empty term
    /// matches nothing.
    #[instrument(level = "debug", skip(self, snapshot, rows), fields(rows.candidates = rows.len()))]
    pub fn search_rows(&self, snapshot: &RowSnapshot, rows: &[usize], term: &str) -> Vec<SearchResult> {
        if term.is_empty() {
            return Vec::new();
        }
        let query = CompiledQuery::new(term, &self.options);
        let columns = self.options.columns(snapshot);

        let mut results: Vec<SearchResult> = rows
            .iter()
            .filter_map(|&index| snapshot.get(index))
            .filter_map(|row| self.search_row(&query, &columns, row))
            .filter(|result| result.relevance_score() >= self.options.min_score())
            .collect();

        results.sort_by(|a, b| {
            b.relevance_score()
                .partial_cmp(&a.relevance_score())
                .unwrap_or(Ordering::Equal)
                .then(a.row_index.cmp(&b.row_index))
        });
        if let Some(max) = self.options.max_results() {
            results.truncate(max);
        }
        debug!(results = results.len(), "Search finished");
        results
    }

    fn search_row(
        &self,
        query: &CompiledQuery,
        columns: &[crate::core::ColumnName],
        row: &Row,
    ) -> Option<SearchResult> {
        let mut result = SearchResult::new(row.row_index());
        for column in columns {
            let text = row.get_by_name(column).as_text();
            for found in query.find(column, &text) {
                result.add_match(found);
            }
        }
        result.has_matches().then_some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;
    use crate::search::{MatchType, SearchStrategy};

    fn people() -> RowSnapshot {
        RowSnapshot::new(
            vec![Column::text("Name"), Column::text("City"), Column::special("Alert")],
            vec![
                Row::new(0).with_value("Name", "Bob").with_value("City", "Boston"),
                Row::new(1).with_value("Name", "Anna").with_value("City", "Annapolis"),
                Row::new(2).with_value("Name", "ann").with_value("City", "Rome"),
                Row::new(3).with_value("Name", "Dan").with_value("City", "Oslo").with_value("Alert", "ann"),
            ],
        )
    }

    #[test]
    fn test_empty_term_matches_nothing() {
        assert!(SearchEngine::default().search(&people(), "").is_empty());
    }

    #[test]
    fn test_results_ordered_by_relevance_then_row() {
        let engine = SearchEngine::new(SearchOptions::default());
        let results = engine.search(&people(), "ann");
        let rows: Vec<usize> = results.iter().map(|r| r.row_index).collect();
        // Row 2 is a full-cell exact match; row 1 matches in two columns.
        assert_eq!(rows, vec![2, 1]);
        assert_eq!(results[0].relevance_score(), 1.0);
        assert!(results[1].relevance_score() > 0.8);
    }

    #[test]
    fn test_special_columns_are_not_searched() {
        let results = SearchEngine::default().search(&people(), "ann");
        assert!(results.iter().all(|r| r.row_index != 3));
    }

    #[test]
    fn test_scope_and_limits() {
        let options = SearchOptions::default()
            .with_scope("City")
            .with_strategies([SearchStrategy::CaseInsensitive]);
        let results = SearchEngine::new(options.clone()).search(&people(), "o");
        let rows: Vec<usize> = results.iter().map(|r| r.row_index).collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
        assert!(results
            .iter()
            .flat_map(|r| r.matches())
            .all(|m| m.column.matches("City") && m.match_type == MatchType::CaseInsensitive));

        let limited = SearchEngine::new(options.with_max_results(2)).search(&people(), "o");
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_min_score() {
        let options = SearchOptions::default().with_min_score(0.85);
        let results = SearchEngine::new(options).search(&people(), "ann");
        assert_eq!(results.len(), 2);

        let options = SearchOptions::default()
            .with_scope("Name")
            .with_min_score(0.85);
        let results = SearchEngine::new(options).search(&people(), "ann");
        assert_eq!(results.iter().map(|r| r.row_index).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_search_rows_restricts_candidates() {
        let results = SearchEngine::default().search_rows(&people(), &[0, 1], "ann");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].row_index, 1);
    }
}
