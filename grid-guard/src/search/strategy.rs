//! Per-strategy matching of one cell.

use rapidfuzz::distance::levenshtein;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::matches::DEFAULT_MATCH_SCORE;
use super::{MatchType, SearchMatch, SearchOptions, SearchStrategy};
use crate::core::ColumnName;

enum Matcher {
    Exact,
    Pattern {
        regex: Regex,
        match_type: MatchType,
    },
    WholeWord(Regex),
    Fuzzy {
        min_similarity: f64,
    },
}

/// A search term compiled against a set of options.
pub(crate) struct CompiledQuery {
    term: String,
    folded_term: String,
    case_sensitive: bool,
    whole_word: bool,
    matchers: Vec<Matcher>,
}

impl CompiledQuery {
    /// Compiles the term for each strategy. A strategy whose pattern does
    /// not compile contributes no matches.
    pub(crate) fn new(term: &str, options: &SearchOptions) -> Self {
        let case_sensitive = options.is_case_sensitive();
        let mut matchers = Vec::new();
        for strategy in options.strategies() {
            let matcher = match strategy {
                SearchStrategy::Exact => Some(Matcher::Exact),
                SearchStrategy::CaseInsensitive => build(&regex::escape(term), false)
                    .map(|regex| Matcher::Pattern {
                        regex,
                        match_type: MatchType::CaseInsensitive,
                    }),
                SearchStrategy::Regex => build(term, case_sensitive).map(|regex| Matcher::Pattern {
                    regex,
                    match_type: MatchType::Regex,
                }),
                SearchStrategy::WholeWord => {
                    build(&format!(r"\b{}\b", regex::escape(term)), case_sensitive)
                        .map(Matcher::WholeWord)
                }
                SearchStrategy::Fuzzy => Some(Matcher::Fuzzy {
                    min_similarity: 1.0 - options.fuzzy_tolerance(),
                }),
            };
            if let Some(matcher) = matcher {
                matchers.push(matcher);
            }
        }
        Self {
            term: term.to_string(),
            folded_term: if case_sensitive {
                term.to_string()
            } else {
                term.to_lowercase()
            },
            case_sensitive,
            whole_word: options.is_whole_word(),
            matchers,
        }
    }

    /// Every distinct match in `text`. When two strategies hit the same span
    /// the higher score is kept.
    pub(crate) fn find(&self, column: &ColumnName, text: &str) -> Vec<SearchMatch> {
        let mut found: Vec<SearchMatch> = Vec::new();
        if text.is_empty() {
            return found;
        }
        for matcher in &self.matchers {
            for candidate in self.run(matcher, column, text) {
                if self.whole_word && !on_word_boundaries(text, &candidate) {
                    continue;
                }
                match found
                    .iter_mut()
                    .find(|m| m.start_position == candidate.start_position && m.length == candidate.length)
                {
                    Some(existing) if existing.match_score < candidate.match_score => *existing = candidate,
                    Some(_) => {}
                    None => found.push(candidate),
                }
            }
        }
        found
    }

    fn run(&self, matcher: &Matcher, column: &ColumnName, text: &str) -> Vec<SearchMatch> {
        match matcher {
            Matcher::Exact => text
                .match_indices(self.term.as_str())
                .map(|(start, matched)| {
                    let (match_type, score) = if matched.len() == text.len() {
                        (MatchType::Exact, 1.0)
                    } else {
                        (MatchType::Partial, DEFAULT_MATCH_SCORE)
                    };
                    self.hit(column, text, start, matched.len(), match_type, score)
                })
                .collect(),
            Matcher::Pattern { regex, match_type } => regex
                .find_iter(text)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| self.hit(column, text, m.start(), m.len(), *match_type, DEFAULT_MATCH_SCORE))
                .collect(),
            Matcher::WholeWord(regex) => regex
                .find_iter(text)
                .map(|m| {
                    let (match_type, score) = if m.as_str() == self.term {
                        (MatchType::Exact, 1.0)
                    } else {
                        (MatchType::CaseInsensitive, DEFAULT_MATCH_SCORE)
                    };
                    self.hit(column, text, m.start(), m.len(), match_type, score)
                })
                .collect(),
            Matcher::Fuzzy { min_similarity } => self
                .best_window(text)
                .filter(|(_, _, similarity)| *similarity >= *min_similarity)
                .map(|(start, len, similarity)| {
                    self.hit(column, text, start, len, MatchType::Fuzzy, similarity)
                })
                .into_iter()
                .collect(),
        }
    }

    /// The window of `text` (as many characters as the term) most similar
    /// to the term, as `(byte start, byte length, similarity)`. The first
    /// window wins ties.
    fn best_window(&self, text: &str) -> Option<(usize, usize, f64)> {
        let width = self.term.chars().count();
        if width == 0 {
            return None;
        }
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = bounds.len() - 1;
        let width = width.min(char_count);

        let mut best: Option<(usize, usize, f64)> = None;
        for first in 0..=(char_count - width) {
            let (start, end) = (bounds[first], bounds[first + width]);
            let window = &text[start..end];
            let similarity = if self.case_sensitive {
                levenshtein::normalized_similarity(window.chars(), self.folded_term.chars())
            } else {
                levenshtein::normalized_similarity(
                    window.to_lowercase().chars(),
                    self.folded_term.chars(),
                )
            };
            if best.map_or(true, |(_, _, s)| similarity > s) {
                best = Some((start, end - start, similarity));
            }
        }
        best
    }

    fn hit(
        &self,
        column: &ColumnName,
        text: &str,
        start: usize,
        length: usize,
        match_type: MatchType,
        match_score: f64,
    ) -> SearchMatch {
        SearchMatch {
            column: column.clone(),
            search_term: self.term.clone(),
            matched_text: text[start..start + length].to_string(),
            start_position: start,
            length,
            match_type,
            match_score,
        }
    }
}

fn build(pattern: &str, case_sensitive: bool) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| debug!(error = %e, "Search pattern does not compile, strategy skipped"))
        .ok()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn on_word_boundaries(text: &str, m: &SearchMatch) -> bool {
    let before = text[..m.start_position].chars().next_back();
    let after = text[m.end_position()..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}
