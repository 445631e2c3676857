//! Search matches and per-row results.

use serde::{Deserialize, Serialize};

use crate::core::ColumnName;

/// Weight of the exact group (`Exact`, `Partial`, `CaseInsensitive`).
pub const EXACT_WEIGHT: f64 = 1.0;
/// Weight of the regex group.
pub const REGEX_WEIGHT: f64 = 0.8;
/// Weight of the fuzzy group.
pub const FUZZY_WEIGHT: f64 = 0.6;
/// Multiplier applied when matches span more than one column.
pub const MULTI_COLUMN_BONUS: f64 = 1.1;
/// Score given to non-exact matches that do not compute their own.
pub const DEFAULT_MATCH_SCORE: f64 = 0.8;

/// How a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Regex,
    Partial,
    CaseInsensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreGroup {
    Exact,
    Regex,
    Fuzzy,
}

impl MatchType {
    fn group(&self) -> ScoreGroup {
        match self {
            MatchType::Exact | MatchType::Partial | MatchType::CaseInsensitive => ScoreGroup::Exact,
            MatchType::Regex => ScoreGroup::Regex,
            MatchType::Fuzzy => ScoreGroup::Fuzzy,
        }
    }
}

/// One hit of the search term inside a cell.
///
/// `start_position` and `length` are byte offsets into the cell's text so
/// they can slice it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub column: ColumnName,
    pub search_term: String,
    pub matched_text: String,
    pub start_position: usize,
    pub length: usize,
    pub match_type: MatchType,
    pub match_score: f64,
}

impl SearchMatch {
    pub fn end_position(&self) -> usize {
        self.start_position + self.length
    }

    pub fn span(&self) -> HighlightSpan {
        HighlightSpan {
            column: self.column.clone(),
            start_position: self.start_position,
            length: self.length,
        }
    }
}

/// A region of a cell to render highlighted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub column: ColumnName,
    pub start_position: usize,
    pub length: usize,
}

/// All matches of one row with the relevance derived from them.
///
/// The score is recomputed on every [`add_match`](Self::add_match), so it
/// always reflects the current matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub row_index: usize,
    matches: Vec<SearchMatch>,
    relevance_score: f64,
}

impl SearchResult {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            matches: Vec::new(),
            relevance_score: 0.0,
        }
    }

    pub fn add_match(&mut self, search_match: SearchMatch) {
        self.matches.push(search_match);
        self.relevance_score = relevance(&self.matches);
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// Matches inside one column (case-insensitive name).
    pub fn matches_in<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a SearchMatch> + 'a {
        self.matches.iter().filter(move |m| m.column.matches(column))
    }

    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Distinct columns with at least one match, first match first.
    pub fn columns(&self) -> Vec<&ColumnName> {
        let mut columns: Vec<&ColumnName> = Vec::new();
        for m in &self.matches {
            if !columns.contains(&&m.column) {
                columns.push(&m.column);
            }
        }
        columns
    }

    pub fn highlight_spans(&self) -> Vec<HighlightSpan> {
        self.matches.iter().map(SearchMatch::span).collect()
    }
}

/// Relevance of a set of matches in `[0, 1]`.
///
/// Matches are grouped (exact, regex, fuzzy), each present group
/// contributes its mean score weighted by the group weight, and the
/// weighted average is taken over present groups only. Matches in more
/// than one column multiply the result by [`MULTI_COLUMN_BONUS`] before
/// clamping.
///
/// ```rust
/// use grid_guard::core::ColumnName;
/// use grid_guard::search::{relevance, MatchType, SearchMatch};
///
/// let hit = |column: &str, match_type, match_score| SearchMatch {
///     column: ColumnName::new(column),
///     search_term: "ann".into(),
///     matched_text: "Ann".into(),
///     start_position: 0,
///     length: 3,
///     match_type,
///     match_score,
/// };
///
/// assert_eq!(relevance(&[hit("Name", MatchType::Exact, 1.0)]), 1.0);
/// let mixed = relevance(&[hit("Name", MatchType::Exact, 1.0), hit("Name", MatchType::Fuzzy, 0.5)]);
/// assert!((mixed - (1.0 + 0.6 * 0.5) / 1.6).abs() < 1e-9);
/// ```
pub fn relevance(matches: &[SearchMatch]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }

    let groups = [
        (ScoreGroup::Exact, EXACT_WEIGHT),
        (ScoreGroup::Regex, REGEX_WEIGHT),
        (ScoreGroup::Fuzzy, FUZZY_WEIGHT),
    ];
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (group, weight) in groups {
        let scores: Vec<f64> = matches
            .iter()
            .filter(|m| m.match_type.group() == group)
            .map(|m| m.match_score)
            .collect();
        if scores.is_empty() {
            continue;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        numerator += weight * mean;
        denominator += weight;
    }

    let mut score = numerator / denominator;
    let first_column = &matches[0].column;
    if matches.iter().any(|m| &m.column != first_column) {
        score *= MULTI_COLUMN_BONUS;
    }
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(column: &str, match_type: MatchType, match_score: f64) -> SearchMatch {
        SearchMatch {
            column: ColumnName::new(column),
            search_term: "x".to_string(),
            matched_text: "x".to_string(),
            start_position: 0,
            length: 1,
            match_type,
            match_score,
        }
    }

    #[test]
    fn test_single_exact_match_scores_one() {
        assert_eq!(relevance(&[hit("Name", MatchType::Exact, 1.0)]), 1.0);
        assert_eq!(relevance(&[]), 0.0);
    }

    #[test]
    fn test_partial_and_case_insensitive_share_exact_group() {
        let score = relevance(&[
            hit("Name", MatchType::Partial, 0.8),
            hit("Name", MatchType::CaseInsensitive, 0.6),
        ]);
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_over_present_groups() {
        let score = relevance(&[
            hit("Name", MatchType::Regex, 0.8),
            hit("Name", MatchType::Fuzzy, 0.5),
        ]);
        let expected = (0.8 * 0.8 + 0.6 * 0.5) / (0.8 + 0.6);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_multi_column_bonus_and_clamp() {
        let one_column = relevance(&[
            hit("Name", MatchType::Partial, 0.8),
            hit("Name", MatchType::Partial, 0.8),
        ]);
        let two_columns = relevance(&[
            hit("Name", MatchType::Partial, 0.8),
            hit("City", MatchType::Partial, 0.8),
        ]);
        assert!((one_column - 0.8).abs() < 1e-9);
        assert!((two_columns - 0.88).abs() < 1e-9);

        let capped = relevance(&[
            hit("Name", MatchType::Exact, 1.0),
            hit("City", MatchType::Exact, 1.0),
        ]);
        assert_eq!(capped, 1.0);
    }

    #[test]
    fn test_result_recomputes_on_add() {
        let mut result = SearchResult::new(4);
        assert_eq!(result.relevance_score(), 0.0);
        result.add_match(hit("Name", MatchType::Fuzzy, 0.9));
        assert!((result.relevance_score() - 0.9).abs() < 1e-9);
        result.add_match(hit("City", MatchType::Exact, 1.0));
        assert_eq!(result.columns().len(), 2);
        let expected = ((1.0 + 0.6 * 0.9) / 1.6 * 1.1_f64).min(1.0);
        assert!((result.relevance_score() - expected).abs() < 1e-9);
        assert_eq!(result.matches_in("name").count(), 1);
    }
}
