//! Include/exclude matching policy on top of ripgrep's regex matcher.
//!
//! Every keyword compiles to its own [`RegexMatcher`] so that AND semantics can check each
//! one separately. Case folding, whole-word and literal escaping are applied uniformly
//! through the builder.

use crate::error::{Result, RlsiftError};
use crate::search::criteria::SearchCriteria;
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use std::ops::Range;

/// Compiled, immutable form of a [`SearchCriteria`]; shared read-only by all workers
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    include: Vec<RegexMatcher>,
    exclude: Vec<RegexMatcher>,
    require_all_includes: bool,
}

impl CompiledMatcher {
    /// Compile every non-empty keyword
    ///
    /// Fails with [`RlsiftError::EmptyCriteria`] when nothing is left to match, and with
    /// [`RlsiftError::InvalidPattern`] for the first keyword that does not compile.
    pub fn compile(criteria: &SearchCriteria) -> Result<Self> {
        criteria.validate()?;

        let mut builder = RegexMatcherBuilder::new();
        builder
            .case_insensitive(!criteria.case_sensitive)
            .fixed_strings(!criteria.regex)
            .word(criteria.whole_word);

        let build = |keyword: &str| {
            builder
                .build(keyword)
                .map_err(|e| RlsiftError::invalid_pattern(keyword, e.to_string()))
        };

        let include = criteria
            .effective_include()
            .map(build)
            .collect::<Result<Vec<_>>>()?;
        let exclude = criteria
            .effective_exclude()
            .map(build)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include,
            exclude,
            require_all_includes: criteria.require_all_includes,
        })
    }

    /// Byte spans of the include keywords in `line`, or `None` if the line is rejected
    ///
    /// - any exclude match rejects the line before includes are looked at
    /// - no include keywords: the line matches with no spans
    /// - AND: every include must match; spans of all of them are returned
    /// - OR: at least one include must match; spans of every matching one are returned
    /// - an empty line never matches
    ///
    /// Spans are sorted by position; overlapping spans from different keywords are kept
    /// as separate entries.
    pub fn match_line(&self, line: &str) -> Option<Vec<Range<usize>>> {
        if line.is_empty() {
            return None;
        }
        let haystack = line.as_bytes();

        if self.exclude.iter().any(|m| is_match(m, haystack)) {
            return None;
        }
        if self.include.is_empty() {
            return Some(Vec::new());
        }

        let mut spans = Vec::new();
        let mut matched_any = false;
        for matcher in &self.include {
            if collect_spans(matcher, haystack, &mut spans) {
                matched_any = true;
            } else if self.require_all_includes {
                return None;
            }
        }

        if !matched_any {
            return None;
        }
        spans.sort_by_key(|span| (span.start, span.end));
        Some(spans)
    }

    /// Whether `line` would produce a match
    pub fn is_match(&self, line: &str) -> bool {
        self.match_line(line).is_some()
    }

    pub fn has_includes(&self) -> bool {
        !self.include.is_empty()
    }
}

fn is_match(matcher: &RegexMatcher, haystack: &[u8]) -> bool {
    // RegexMatcher's error type is uninhabited
    matcher.is_match(haystack).unwrap_or(false)
}

/// Append the non-empty match spans of `matcher`; true if it matched at all
fn collect_spans(matcher: &RegexMatcher, haystack: &[u8], spans: &mut Vec<Range<usize>>) -> bool {
    let mut found = false;
    let _ = matcher.find_iter(haystack, |m| {
        found = true;
        if !m.is_empty() {
            spans.push(m.start()..m.end());
        }
        true
    });
    found
}
