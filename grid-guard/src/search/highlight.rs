//! Inline highlighting of search matches.

use super::SearchMatch;

/// Wraps each match in `value` with `open` and `close`.
///
/// Matches are applied from the highest start position down, so inserting
/// markup never moves a match that is still to be applied. A match that
/// overlaps one already applied, or that does not fall on character
/// boundaries of `value`, is skipped.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::{Column, Row, RowSnapshot};
/// use grid_guard::search::{highlight, SearchEngine, SearchOptions};
///
/// let snapshot = RowSnapshot::new(
///     vec![Column::text("Name")],
///     vec![Row::new(0).with_value("Name", "Anna and Hannah")],
/// );
/// let results = SearchEngine::new(SearchOptions::default()).search(&snapshot, "an");
/// let marked = highlight("Anna and Hannah", results[0].matches(), "<b>", "</b>");
/// assert_eq!(marked, "<b>An</b>na <b>an</b>d H<b>an</b>nah");
/// ```
pub fn highlight<'a, I>(value: &str, matches: I, open: &str, close: &str) -> String
where
    I: IntoIterator<Item = &'a SearchMatch>,
{
    let mut spans: Vec<(usize, usize)> = matches
        .into_iter()
        .map(|m| (m.start_position, m.end_position()))
        .filter(|&(start, end)| {
            start < end
                && end <= value.len()
                && value.is_char_boundary(start)
                && value.is_char_boundary(end)
        })
        .collect();
    spans.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

    let mut out = value.to_string();
    let mut applied_from = value.len();
    for (start, end) in spans {
        if end > applied_from {
            continue;
        }
        out.insert_str(end, close);
        out.insert_str(start, open);
        applied_from = start;
    }
    out
}
