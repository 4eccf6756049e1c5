//! Post content filtering.
//!
//! A banned-word matcher applied to post bodies before storage. The list
//! is the built-in defaults plus whatever the operator adds in config;
//! matching is ASCII case-insensitive substring search.

use aho_corasick::AhoCorasick;
use tracing::warn;

/// Built-in banned phrases, always active.
const DEFAULT_BANNED_WORDS: &[&str] = &[
    "free money",
    "click here",
    "limited time offer",
    "act now",
    "crypto giveaway",
    "buy followers",
    "casino bonus",
    "miracle cure",
];

/// Content filter result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Content is acceptable.
    Clean,
    /// Content matched a banned phrase.
    Blocked { pattern: String },
}

/// Banned-word filter for post bodies.
pub struct ContentFilter {
    /// Aho-Corasick automaton for O(N) phrase matching
    matcher: AhoCorasick,
    /// Patterns by automaton index, for reporting which phrase hit
    patterns: Vec<String>,
}

impl ContentFilter {
    /// Build a filter from the built-in list plus `extra_words`.
    pub fn new(extra_words: &[String]) -> Self {
        let mut patterns: Vec<String> = DEFAULT_BANNED_WORDS
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
        for word in extra_words {
            let word = word.to_lowercase();
            if !word.is_empty() && !patterns.contains(&word) {
                patterns.push(word);
            }
        }

        let matcher = match AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&patterns)
        {
            Ok(matcher) => matcher,
            Err(err) => {
                warn!(error = ?err, "Failed to build banned-word matcher; keyword filtering disabled");
                let empty: Vec<String> = Vec::new();
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(&empty)
                    .expect("building empty Aho-Corasick should not fail")
            }
        };

        Self { matcher, patterns }
    }

    /// Check a post body.
    pub fn check(&self, text: &str) -> FilterVerdict {
        if let Some(mat) = self.matcher.find(text) {
            let pattern = self.patterns[mat.pattern().as_usize()].clone();
            return FilterVerdict::Blocked { pattern };
        }
        FilterVerdict::Clean
    }
}
