// * Filter configuration supplied by the consumer
// * Replaced wholesale on every settings change; validated here, never during scanning

use crate::config::constants::RATING_UNFILTERED;
use crate::corpus::GuideId;
use chrono::Duration;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// * Upper bound on the compiled ignore pattern
const IGNORE_PATTERN_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid ignore keyword '{keyword}': {reason}")]
    InvalidKeyword { keyword: String, reason: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Minimum rating {0} is outside 1..=5")]
    RatingOutOfRange(i32),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Display-time filter, distinct from the aggregation recency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOption {
    #[default]
    All,
    Today,
    ThisWeek,
}

impl TimeOption {
    /// Maximum article age, None when unbounded
    pub fn max_age(self) -> Option<Duration> {
        match self {
            TimeOption::All => None,
            TimeOption::Today => Some(Duration::hours(24)),
            TimeOption::ThisWeek => Some(Duration::hours(7 * 24)),
        }
    }
}

impl std::str::FromStr for TimeOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TimeOption::All),
            "today" => Ok(TimeOption::Today),
            "week" | "this_week" | "this-week" => Ok(TimeOption::ThisWeek),
            other => Err(format!("unknown time option '{}'", other)),
        }
    }
}

/// Settings deciding which clusters and articles are visible.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub ignore_pattern: Option<Regex>,
    pub suppress_self_references: bool,
    pub suppress_single_source: bool,
    /// None means every guide
    pub target_guide: Option<GuideId>,
    pub min_rating: i32,
    pub unread_only: bool,
    pub time_option: TimeOption,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_pattern: None,
            suppress_self_references: false,
            suppress_single_source: false,
            target_guide: None,
            min_rating: RATING_UNFILTERED,
            unread_only: false,
            time_option: TimeOption::All,
        }
    }
}

impl FilterConfig {
    /// Compiles ignore keywords; blank text clears the pattern.
    pub fn with_ignore_keywords(mut self, keywords: &str) -> Result<Self, ConfigError> {
        self.ignore_pattern = compile_keywords(keywords)?;
        Ok(self)
    }

    pub fn with_min_rating(mut self, rating: i32) -> Result<Self, ConfigError> {
        if !(1..=5).contains(&rating) {
            return Err(ConfigError::RatingOutOfRange(rating));
        }
        self.min_rating = rating;
        Ok(self)
    }

    /// Empty guide id means no restriction.
    pub fn with_target_guide(mut self, guide: &str) -> Self {
        let guide = guide.trim();
        self.target_guide = (!guide.is_empty()).then(|| guide.to_string());
        self
    }

    pub fn with_time_option(mut self, option: TimeOption) -> Self {
        self.time_option = option;
        self
    }

    pub fn unread_only(mut self, on: bool) -> Self {
        self.unread_only = on;
        self
    }

    pub fn suppress_self_references(mut self, on: bool) -> Self {
        self.suppress_self_references = on;
        self
    }

    pub fn suppress_single_source(mut self, on: bool) -> Self {
        self.suppress_single_source = on;
        self
    }

    pub fn is_ignored(&self, url: &str) -> bool {
        self.ignore_pattern
            .as_ref()
            .map(|p| p.is_match(url))
            .unwrap_or(false)
    }
}

/// Compiles keyword text into a case-insensitive substring pattern.
///
/// Keywords are separated by commas or newlines. `*` matches any run of
/// characters; everything else matches literally. Returns `None` when the text
/// holds no keywords.
pub fn compile_keywords(text: &str) -> Result<Option<Regex>, ConfigError> {
    let mut alternatives = Vec::new();

    for raw in text.split([',', '\n', '\r']) {
        let keyword = raw.trim();
        if keyword.is_empty() {
            continue;
        }
        if keyword.chars().all(|c| c == '*') {
            return Err(ConfigError::InvalidKeyword {
                keyword: keyword.to_string(),
                reason: "wildcard alone would ignore every link".to_string(),
            });
        }

        let escaped: Vec<String> = keyword.split('*').map(regex::escape).collect();
        alternatives.push(escaped.join(".*"));
    }

    if alternatives.is_empty() {
        return Ok(None);
    }

    let pattern = alternatives.join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .size_limit(IGNORE_PATTERN_SIZE_LIMIT)
        .build()
        .map(Some)
        .map_err(|source| ConfigError::InvalidPattern { pattern, source })
}
