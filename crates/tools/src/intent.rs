//! Intent routing: maps a query to at most one tool.
//!
//! Rules are evaluated in table order; the first rule whose keyword or
//! pattern fires wins. Keywords are matched as case-insensitive substrings,
//! patterns against the lower-cased query.

use ragline_core::error::ToolError;
use ragline_core::intent::{IntentMatch, IntentRule};
use regex_lite::Regex;
use tracing::debug;

struct CompiledRule {
    tool: String,
    confidence: f32,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl CompiledRule {
    fn fires(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
            || self.patterns.iter().any(|p| p.is_match(lowered))
    }
}

pub struct IntentRouter {
    rules: Vec<CompiledRule>,
}

impl IntentRouter {
    /// Compile a rule table. Fails on an invalid pattern.
    pub fn new(rules: &[IntentRule]) -> Result<Self, ToolError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).map_err(|e| ToolError::InvalidRule {
                            tool_name: rule.tool.clone(),
                            reason: format!("pattern {p:?}: {e}"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledRule {
                    tool: rule.tool.clone(),
                    confidence: rule.confidence,
                    keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        Ok(Self { rules })
    }

    /// Router over the built-in weather/math table.
    pub fn with_defaults() -> Result<Self, ToolError> {
        Self::new(&IntentRule::defaults())
    }

    /// The first matching rule's tool and confidence, if any.
    pub fn match_query(&self, query: &str) -> Option<IntentMatch> {
        let lowered = query.to_lowercase();
        let matched = self.rules.iter().find(|r| r.fires(&lowered))?;
        debug!(tool = %matched.tool, confidence = matched.confidence, "Intent matched");
        Some(IntentMatch {
            tool_name: matched.tool.clone(),
            confidence: matched.confidence,
        })
    }

    /// Tool names in rule order.
    pub fn tools(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.tool.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> IntentRouter {
        IntentRouter::with_defaults().unwrap()
    }

    #[test]
    fn weather_query() {
        let m = router().match_query("what is the weather in Paris").unwrap();
        assert_eq!(m.tool_name, "weather");
        assert_eq!(m.confidence, 0.9);
    }

    #[test]
    fn arithmetic_query() {
        let m = router().match_query("2 + 2 * 5").unwrap();
        assert_eq!(m.tool_name, "math");
        assert_eq!(m.confidence, 0.8);
    }

    #[test]
    fn small_talk_has_no_intent() {
        assert!(router().match_query("hello there").is_none());
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(router().match_query("CALCULATE my taxes").unwrap().tool_name, "math");
        assert_eq!(router().match_query("Forecast?").unwrap().tool_name, "weather");
    }

    #[test]
    fn first_rule_wins() {
        let m = router().match_query("calculate the temperature 20 * 2").unwrap();
        assert_eq!(m.tool_name, "weather");
    }

    #[test]
    fn custom_table() {
        let rules = vec![IntentRule {
            tool: "stocks".into(),
            confidence: 0.75,
            keywords: vec!["Ticker".into()],
            patterns: vec![r"\$[a-z]{1,5}\b".into()],
        }];
        let r = IntentRouter::new(&rules).unwrap();
        assert_eq!(r.match_query("price of $AAPL").unwrap().tool_name, "stocks");
        assert_eq!(r.match_query("ticker for apple").unwrap().tool_name, "stocks");
        assert!(r.match_query("2 + 2").is_none());
        assert_eq!(r.tools(), vec!["stocks"]);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let rules = vec![IntentRule {
            tool: "broken".into(),
            confidence: 0.5,
            keywords: vec![],
            patterns: vec!["(unclosed".into()],
        }];
        assert!(matches!(
            IntentRouter::new(&rules),
            Err(ToolError::InvalidRule { .. })
        ));
    }
}
