//! Intent rule data and match results.
//!
//! The rule table is plain data so it can be loaded from configuration and
//! inspected in tests. Compilation and evaluation live in
//! `ragline-tools::intent`.

use serde::{Deserialize, Serialize};

/// One row of the ordered intent table.
///
/// A rule fires when the lower-cased query contains any of `keywords` or
/// matches any of `patterns` (regular expressions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    /// Tool to route to when the rule fires
    pub tool: String,

    /// Confidence attached to a match, in [0, 1]
    pub confidence: f32,

    /// Case-insensitive substrings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Regular expressions, matched against the lower-cased query
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl IntentRule {
    /// The built-in table: weather first, then math.
    pub fn defaults() -> Vec<IntentRule> {
        vec![
            IntentRule {
                tool: "weather".into(),
                confidence: 0.9,
                keywords: vec!["weather".into(), "temperature".into(), "forecast".into()],
                patterns: vec![],
            },
            IntentRule {
                tool: "math".into(),
                confidence: 0.8,
                keywords: vec!["calculate".into(), "math".into(), "equation".into()],
                patterns: vec![r"\d+\s*[-+*/^()]\s*\d+".into()],
            },
        ]
    }
}

/// The routing decision for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMatch {
    pub tool_name: String,
    pub confidence: f32,
}

impl IntentMatch {
    /// Whether this match clears an acceptance threshold (strictly greater).
    pub fn accepted(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}
