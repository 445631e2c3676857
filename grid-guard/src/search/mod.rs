//! Multi-strategy text search.
//!
//! [`SearchEngine`] runs each configured [`SearchStrategy`] over the
//! searched columns of every row, collects [`SearchMatch`]es into one
//! [`SearchResult`] per row and ranks the rows by [`relevance`].
//! [`highlight`] renders the matches back into the cell text.

mod engine;
mod highlight;
mod matches;
mod options;
mod strategy;

pub use engine::SearchEngine;
pub use highlight::highlight;
pub use matches::{
    relevance, HighlightSpan, MatchType, SearchMatch, SearchResult, DEFAULT_MATCH_SCORE,
    EXACT_WEIGHT, FUZZY_WEIGHT, MULTI_COLUMN_BONUS, REGEX_WEIGHT,
};
pub use options::{SearchOptions, SearchScope, SearchStrategy};
