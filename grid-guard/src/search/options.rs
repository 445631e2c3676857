use serde::{Deserialize, Serialize};

use crate::core::{ColumnName, RowSnapshot};

/// A way of finding the search term in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Case-sensitive substring; a cell equal to the term is an exact match
    Exact,
    /// Substring ignoring case
    CaseInsensitive,
    /// The term is a regular expression
    Regex,
    /// Approximate match within `fuzzy_tolerance`
    Fuzzy,
    /// The term as a whole word, ignoring case
    WholeWord,
}

/// A column taking part in a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchScope {
    pub column: ColumnName,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SearchScope {
    pub fn new(column: impl Into<ColumnName>) -> Self {
        Self {
            column: column.into(),
            enabled: true,
        }
    }
}

/// Options for [`SearchEngine`](super::SearchEngine).
///
/// # Examples
///
/// ```rust
/// use grid_guard::search::{SearchOptions, SearchStrategy};
///
/// let options = SearchOptions::default()
///     .with_strategies([SearchStrategy::Exact, SearchStrategy::Fuzzy])
///     .with_fuzzy_tolerance(0.25)
///     .with_scope("Name")
///     .with_max_results(50);
/// assert_eq!(options.strategies().len(), 2);
/// assert_eq!(options.fuzzy_tolerance(), 0.25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    strategies: Vec<SearchStrategy>,
    fuzzy_tolerance: f64,
    scopes: Vec<SearchScope>,
    case_sensitive: bool,
    whole_word: bool,
    max_results: Option<usize>,
    min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            strategies: vec![SearchStrategy::Exact, SearchStrategy::CaseInsensitive],
            fuzzy_tolerance: 0.2,
            scopes: Vec::new(),
            case_sensitive: false,
            whole_word: false,
            max_results: None,
            min_score: 0.0,
        }
    }
}

impl SearchOptions {
    /// Replaces the strategies; duplicates are dropped.
    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = SearchStrategy>) -> Self {
        self.strategies.clear();
        for strategy in strategies {
            if !self.strategies.contains(&strategy) {
                self.strategies.push(strategy);
            }
        }
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        if !self.strategies.contains(&strategy) {
            self.strategies.push(strategy);
        }
        self
    }

    /// Sets the fuzzy tolerance, clamped to `[0, 1]`. A tolerance of `t`
    /// accepts windows with similarity of at least `1 - t`.
    pub fn with_fuzzy_tolerance(mut self, tolerance: f64) -> Self {
        self.fuzzy_tolerance = if tolerance.is_nan() {
            0.0
        } else {
            tolerance.clamp(0.0, 1.0)
        };
        self
    }

    /// Adds an enabled column to search. With no scopes every visible data
    /// column is searched.
    pub fn with_scope(mut self, column: impl Into<ColumnName>) -> Self {
        self.scopes.push(SearchScope::new(column));
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = SearchScope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    /// Makes `Regex`, `Fuzzy` and `WholeWord` matching case-sensitive.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Keeps substring matches only where they start and end on a word
    /// boundary.
    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Drops results whose relevance is below `min_score`.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn strategies(&self) -> &[SearchStrategy] {
        &self.strategies
    }

    pub fn fuzzy_tolerance(&self) -> f64 {
        self.fuzzy_tolerance
    }

    pub fn scopes(&self) -> &[SearchScope] {
        &self.scopes
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn is_whole_word(&self) -> bool {
        self.whole_word
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// The columns a search over `snapshot` visits, in column order when no
    /// scopes are set and in scope order otherwise.
    pub fn columns(&self, snapshot: &RowSnapshot) -> Vec<ColumnName> {
        if self.scopes.is_empty() {
            return snapshot
                .data_columns()
                .filter(|c| c.is_visible())
                .map(|c| c.name().clone())
                .collect();
        }
        let mut columns: Vec<ColumnName> = Vec::new();
        for scope in self.scopes.iter().filter(|s| s.enabled) {
            if !columns.contains(&scope.column) {
                columns.push(scope.column.clone());
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;

    #[test]
    fn test_default_columns_skip_hidden_and_special() {
        let snapshot = RowSnapshot::new(
            vec![
                Column::text("Name"),
                Column::text("Notes").with_visible(false),
                Column::special("Delete"),
                Column::integer("Age"),
            ],
            vec![],
        );
        let columns = SearchOptions::default().columns(&snapshot);
        assert_eq!(columns, vec![ColumnName::new("Name"), ColumnName::new("Age")]);
    }

    #[test]
    fn test_scopes_override_columns() {
        let snapshot = RowSnapshot::new(vec![Column::text("Name"), Column::text("City")], vec![]);
        let options = SearchOptions::default().with_scopes([
            SearchScope::new("City"),
            SearchScope {
                column: ColumnName::new("Name"),
                enabled: false,
            },
        ]);
        assert_eq!(options.columns(&snapshot), vec![ColumnName::new("City")]);
    }

    #[test]
    fn test_tolerance_is_clamped() {
        assert_eq!(SearchOptions::default().with_fuzzy_tolerance(3.0).fuzzy_tolerance(), 1.0);
        assert_eq!(SearchOptions::default().with_fuzzy_tolerance(-1.0).fuzzy_tolerance(), 0.0);
    }

    #[test]
    fn test_strategies_deduplicated() {
        let options = SearchOptions::default()
            .with_strategies([SearchStrategy::Regex, SearchStrategy::Regex])
            .with_strategy(SearchStrategy::Regex);
        assert_eq!(options.strategies(), &[SearchStrategy::Regex]);
    }
}
