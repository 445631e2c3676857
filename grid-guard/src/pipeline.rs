//! The grid view: filter, then search, then sort.
//!
//! [`ViewPipeline::apply`] recomputes the visible row order from a
//! [`RowSnapshot`] in three stages:
//!
//! ```text
//! all rows ──► MultiColumnFilterSet ──► SearchEngine ──► SortEngine ──► ViewResult
//!              (skipped if inactive)   (skipped if no    (relevance order
//!                                       search term)      kept if unsorted)
//! ```

use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::RowSnapshot;
use crate::filter::MultiColumnFilterSet;
use crate::search::{SearchEngine, SearchOptions, SearchResult};
use crate::sort::SortEngine;

/// Rows to display, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewResult {
    pub row_indices: Vec<usize>,
    /// Per-row matches when a search is active, ordered by relevance.
    pub search_results: Vec<SearchResult>,
}

impl ViewResult {
    pub fn len(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_indices.is_empty()
    }

    pub fn search_result(&self, row_index: usize) -> Option<&SearchResult> {
        self.search_results.iter().find(|r| r.row_index == row_index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewPipeline {
    filters: MultiColumnFilterSet,
    search: Option<(String, SearchEngine)>,
    sort: SortEngine,
}

impl ViewPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &MultiColumnFilterSet {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut MultiColumnFilterSet {
        &mut self.filters
    }

    /// Sets the search term. An empty term clears the search.
    pub fn set_search(&mut self, term: impl Into<String>, options: SearchOptions) {
        let term = term.into();
        self.search = if term.is_empty() {
            None
        } else {
            Some((term, SearchEngine::new(options)))
        };
    }

    pub fn clear_search(&mut self) {
        self.search = None;
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_ref().map(|(term, _)| term.as_str())
    }

    pub fn sort(&self) -> &SortEngine {
        &self.sort
    }

    pub fn sort_mut(&mut self) -> &mut SortEngine {
        &mut self.sort
    }

    #[instrument(level = "debug", skip_all, fields(rows.total = snapshot.len()))]
    pub fn apply(&self, snapshot: &RowSnapshot) -> ViewResult {
        let mut rows = if self.filters.is_active() {
            self.filters.apply_all(snapshot)
        } else {
            snapshot.row_indices()
        };

        let search_results = match &self.search {
            Some((term, engine)) => {
                let results = engine.search_rows(snapshot, &rows, term);
                rows = results.iter().map(|r| r.row_index).collect();
                results
            }
            None => Vec::new(),
        };

        if !self.sort.is_empty() {
            rows = self.sort.sort(snapshot, &rows);
        }

        debug!(rows.visible = rows.len(), "View recomputed");
        ViewResult {
            row_indices: rows,
            search_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, Row};
    use crate::filter::{AdvancedFilter, FilterOperator};
    use crate::sort::SortDirection;

    fn people() -> RowSnapshot {
        RowSnapshot::new(
            vec![Column::text("Name"), Column::integer("Age")],
            vec![
                Row::new(0).with_value("Name", "Anna").with_value("Age", 34),
                Row::new(1).with_value("Name", "Bob").with_value("Age", 17),
                Row::new(2).with_value("Name", "Hannah").with_value("Age", 52),
                Row::new(3).with_value("Name", "Dan").with_value("Age", 25),
            ],
        )
    }

    #[test]
    fn test_empty_pipeline_shows_every_row() {
        let view = ViewPipeline::new().apply(&people());
        assert_eq!(view.row_indices, vec![0, 1, 2, 3]);
        assert!(view.search_results.is_empty());
    }

    #[test]
    fn test_search_narrows_filtered_rows() {
        let mut pipeline = ViewPipeline::new();
        pipeline
            .filters_mut()
            .add(AdvancedFilter::new("Age", FilterOperator::GreaterThan, "20"));
        pipeline.set_search("an", SearchOptions::default());

        let view = pipeline.apply(&people());
        let mut rows = view.row_indices.clone();
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 2, 3]);
        assert!(view.search_result(1).is_none());
        assert!(view.search_result(2).is_some_and(|r| r.has_matches()));
    }

    #[test]
    fn test_sort_overrides_relevance_order() {
        let mut pipeline = ViewPipeline::new();
        pipeline.set_search("an", SearchOptions::default());
        pipeline.sort_mut().add_column("Age", SortDirection::Descending);
        assert_eq!(pipeline.apply(&people()).row_indices, vec![2, 0, 3]);
    }

    #[test]
    fn test_empty_term_clears_search() {
        let mut pipeline = ViewPipeline::new();
        pipeline.set_search("bob", SearchOptions::default());
        assert_eq!(pipeline.apply(&people()).row_indices, vec![1]);
        pipeline.set_search("", SearchOptions::default());
        assert_eq!(pipeline.search_term(), None);
        assert_eq!(pipeline.apply(&people()).len(), 4);
    }
}
