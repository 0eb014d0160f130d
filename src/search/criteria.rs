//! What to look for: keyword sets, matching flags and run bounds.

use crate::error::{Result, RlsiftError};
use std::fmt;

/// Result cap used by [`SearchCriteria::realtime`]
pub const REALTIME_RESULT_CAP: usize = 500;
/// Default result cap used by [`SearchCriteria::preview`]
pub const PREVIEW_RESULT_CAP: usize = 200;

/// How much of the file a run is allowed to look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// Scan every chunk
    Exhaustive,
    /// Stop at `cap` hits and/or scan only an evenly spread `sampling_ratio` of chunks
    Preview {
        cap: Option<usize>,
        sampling_ratio: Option<f64>,
    },
}

/// Parameters of one search invocation
///
/// Defaults follow the usual log-viewer behaviour: literal, case-insensitive keywords,
/// every include required.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    /// A line must contain these (all of them, or any, see `require_all_includes`)
    pub include: Vec<String>,
    /// A line containing any of these is rejected
    pub exclude: Vec<String>,
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Treat keywords as regular expressions instead of literals
    pub regex: bool,
    /// AND semantics for includes when true, OR when false
    pub require_all_includes: bool,
    /// Stop once this many hits have been produced
    pub result_cap: Option<usize>,
    /// Fraction of chunks to scan, in `(0, 1]`
    pub sampling_ratio: Option<f64>,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            case_sensitive: false,
            whole_word: false,
            regex: false,
            require_all_includes: true,
            result_cap: None,
            sampling_ratio: None,
        }
    }
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Low-latency settings for search-as-you-type
    pub fn realtime() -> Self {
        Self {
            result_cap: Some(REALTIME_RESULT_CAP),
            ..Self::default()
        }
    }

    /// Bounded preview; `cap` of `None` uses [`PREVIEW_RESULT_CAP`]
    pub fn preview(cap: Option<usize>) -> Self {
        Self {
            result_cap: Some(cap.unwrap_or(PREVIEW_RESULT_CAP)),
            ..Self::default()
        }
    }

    pub fn include<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn whole_word(mut self, yes: bool) -> Self {
        self.whole_word = yes;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.regex = yes;
        self
    }

    pub fn require_all_includes(mut self, yes: bool) -> Self {
        self.require_all_includes = yes;
        self
    }

    pub fn result_cap(mut self, cap: Option<usize>) -> Self {
        self.result_cap = cap;
        self
    }

    pub fn sampling_ratio(mut self, ratio: Option<f64>) -> Self {
        self.sampling_ratio = ratio;
        self
    }

    /// Exhaustive unless a cap or a sampling ratio bounds the run
    pub fn mode(&self) -> SearchMode {
        match (self.result_cap, self.sampling_ratio) {
            (None, None) => SearchMode::Exhaustive,
            (cap, sampling_ratio) => SearchMode::Preview {
                cap,
                sampling_ratio,
            },
        }
    }

    /// Include keywords with empty strings dropped
    pub fn effective_include(&self) -> impl Iterator<Item = &str> {
        self.include
            .iter()
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }

    /// Exclude keywords with empty strings dropped
    pub fn effective_exclude(&self) -> impl Iterator<Item = &str> {
        self.exclude
            .iter()
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }

    /// Reject criteria that cannot start a run
    pub fn validate(&self) -> Result<()> {
        if self.effective_include().next().is_none() && self.effective_exclude().next().is_none()
        {
            return Err(RlsiftError::EmptyCriteria);
        }
        if let Some(ratio) = self.sampling_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(RlsiftError::invalid_state(format!(
                    "sampling ratio must be in (0, 1], got {}",
                    ratio
                )));
            }
        }
        Ok(())
    }

    /// Human-readable logic expression, e.g. `(ERROR AND timeout) AND NOT (DEBUG) [ignore case]`
    pub fn describe(&self) -> String {
        let join = if self.require_all_includes {
            " AND "
        } else {
            " OR "
        };
        let include: Vec<&str> = self.effective_include().collect();
        let exclude: Vec<&str> = self.effective_exclude().collect();

        let mut text = String::new();
        if !include.is_empty() {
            text.push_str(&format!("({})", include.join(join)));
        }
        if !exclude.is_empty() {
            if !text.is_empty() {
                text.push_str(" AND ");
            }
            text.push_str(&format!("NOT ({})", exclude.join(" OR ")));
        }
        if text.is_empty() {
            text.push_str("(nothing)");
        }

        let mut flags = Vec::new();
        if !self.case_sensitive {
            flags.push("ignore case");
        }
        if self.whole_word {
            flags.push("whole word");
        }
        if self.regex {
            flags.push("regex");
        }
        if !flags.is_empty() {
            text.push_str(&format!(" [{}]", flags.join(", ")));
        }
        text
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let criteria = SearchCriteria::default();
        assert!(!criteria.case_sensitive);
        assert!(!criteria.whole_word);
        assert!(!criteria.regex);
        assert!(criteria.require_all_includes);
        assert_eq!(criteria.mode(), SearchMode::Exhaustive);
    }

    #[test]
    fn test_presets_are_preview_mode() {
        assert_eq!(
            SearchCriteria::realtime().mode(),
            SearchMode::Preview {
                cap: Some(500),
                sampling_ratio: None
            }
        );
        assert_eq!(SearchCriteria::preview(None).result_cap, Some(200));
        assert_eq!(SearchCriteria::preview(Some(10)).result_cap, Some(10));
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            SearchCriteria::new().validate(),
            Err(RlsiftError::EmptyCriteria)
        ));
        assert!(matches!(
            SearchCriteria::new().include(["", ""]).validate(),
            Err(RlsiftError::EmptyCriteria)
        ));
        assert!(SearchCriteria::new().exclude(["DEBUG"]).validate().is_ok());

        let sampled = SearchCriteria::new().include(["x"]);
        assert!(sampled.clone().sampling_ratio(Some(0.5)).validate().is_ok());
        assert!(sampled.clone().sampling_ratio(Some(1.0)).validate().is_ok());
        assert!(sampled.clone().sampling_ratio(Some(0.0)).validate().is_err());
        assert!(sampled.sampling_ratio(Some(f64::NAN)).validate().is_err());
    }

    #[test]
    fn test_describe() {
        let criteria = SearchCriteria::new()
            .include(["ERROR", "timeout"])
            .exclude(["DEBUG"]);
        assert_eq!(
            criteria.describe(),
            "(ERROR AND timeout) AND NOT (DEBUG) [ignore case]"
        );

        let criteria = SearchCriteria::new()
            .include(["a", "b"])
            .require_all_includes(false)
            .case_sensitive(true)
            .whole_word(true);
        assert_eq!(criteria.to_string(), "(a OR b) [whole word]");

        let criteria = SearchCriteria::new()
            .exclude(["x", "y"])
            .case_sensitive(true)
            .regex(true);
        assert_eq!(criteria.describe(), "NOT (x OR y) [regex]");
    }
}
