use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a total is divided among participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStrategy {
    /// Everyone owes the same amount; leftover cents are distributed.
    Equal,
    /// Each participant supplies the amount they owe.
    Exact,
    /// Each participant supplies a percentage of the total.
    Percentage,
}

impl SplitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitStrategy::Equal => "EQUAL",
            SplitStrategy::Exact => "EXACT",
            SplitStrategy::Percentage => "PERCENTAGE",
        }
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown split strategy `{0}`: expected EQUAL, EXACT or PERCENTAGE")]
pub struct ParseStrategyError(String);

impl FromStr for SplitStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(SplitStrategy::Equal),
            "EXACT" => Ok(SplitStrategy::Exact),
            "PERCENTAGE" | "PERCENT" => Ok(SplitStrategy::Percentage),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("equal".parse::<SplitStrategy>(), Ok(SplitStrategy::Equal));
        assert_eq!(" Exact ".parse::<SplitStrategy>(), Ok(SplitStrategy::Exact));
        assert_eq!("PERCENTAGE".parse::<SplitStrategy>(), Ok(SplitStrategy::Percentage));
    }

    #[test]
    fn test_parse_unknown() {
        let err = "shares".parse::<SplitStrategy>().unwrap_err();
        assert!(err.to_string().contains("shares"));
    }

    #[test]
    fn test_serde_uses_upper_case_tags() {
        assert_eq!(
            serde_json::to_string(&SplitStrategy::Percentage).unwrap(),
            "\"PERCENTAGE\""
        );
        let s: SplitStrategy = serde_json::from_str("\"EXACT\"").unwrap();
        assert_eq!(s, SplitStrategy::Exact);
    }
}
