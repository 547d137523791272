//! Profanity filtering for review text.
//!
//! Matches whole words case-insensitively and masks each matched character
//! with `*`. The filter is built once at startup; a deployment that turns it
//! off gets [`ProfanityFilter::Unconfigured`] and review text is stored as
//! submitted.

use regex::Regex;
use thiserror::Error;

use crate::config::ProfanityConfig;

/// Words filtered by default.
const DEFAULT_WORDS: &[&str] = &[
    "arse", "arsehole", "ass", "asshole", "bastard", "bitch", "bollocks", "bullshit", "crap",
    "damn", "dick", "douche", "fuck", "fucker", "fucking", "motherfucker", "piss", "prick",
    "shit", "shitty", "slut", "twat", "wanker", "whore",
];

/// Errors from building or applying a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// No filter is configured for this deployment.
    #[error("text filter is not configured")]
    Unavailable,

    /// The word list produced an invalid pattern.
    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A compiled whole-word filter.
#[derive(Debug, Clone)]
pub struct WordFilter {
    pattern: Regex,
}

impl WordFilter {
    /// Build a filter from a word list.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Pattern`] if the pattern fails to compile, or
    /// [`FilterError::Unavailable`] if the list is empty.
    pub fn new<I, S>(words: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect();

        if alternatives.is_empty() {
            return Err(FilterError::Unavailable);
        }

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))?;
        Ok(Self { pattern })
    }

    /// Replace every listed word with asterisks of the same length.
    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                "*".repeat(caps[0].chars().count())
            })
            .into_owned()
    }
}

/// Text filter collaborator injected through application state.
#[derive(Debug, Clone)]
pub enum ProfanityFilter {
    Enabled(WordFilter),
    Unconfigured,
}

impl ProfanityFilter {
    /// Build the filter described by configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Pattern`] if the configured words cannot be compiled.
    pub fn from_config(config: &ProfanityConfig) -> Result<Self, FilterError> {
        if !config.enabled {
            return Ok(Self::Unconfigured);
        }
        let words = DEFAULT_WORDS
            .iter()
            .copied()
            .chain(config.extra_words.iter().map(String::as_str));
        Ok(Self::Enabled(WordFilter::new(words)?))
    }

    /// Filter a piece of text.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Unavailable`] when no filter is configured.
    pub fn filter(&self, text: &str) -> Result<String, FilterError> {
        match self {
            Self::Enabled(filter) => Ok(filter.clean(text)),
            Self::Unconfigured => Err(FilterError::Unavailable),
        }
    }
}

/// Filter text, falling back to the original when the filter is unavailable.
///
/// Returns the text to store and whether the filter actually ran.
pub fn filter_or_pass_through(filter: &ProfanityFilter, text: &str) -> (String, bool) {
    match filter.filter(text) {
        Ok(cleaned) => (cleaned, true),
        Err(FilterError::Unavailable) => {
            tracing::debug!("Text filter unavailable, storing text unfiltered");
            (text.to_owned(), false)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Text filter failed, storing text unfiltered");
            (text.to_owned(), false)
        }
    }
}
