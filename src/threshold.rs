//! Fixed-vs-percent threshold parsing, shared by the trend and profit
//! evaluators: a bare number is an absolute threshold, a string ending in
//! `%` is relative. Any value that fails to parse falls back to `0.0` fixed
//! rather than erroring, so a bad config value degrades instead of crashing
//! the worker.

use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Fixed(f64),
    Percent(f64),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Fixed(0.0)
    }
}

impl Threshold {
    /// Parse a config value. `"2.5%"` -> `Percent(0.025)`; `"150"` or a bare
    /// number -> `Fixed(150.0)`. Anything unparseable defaults to
    /// `Fixed(0.0)`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(pct) = trimmed.strip_suffix('%') {
            match pct.trim().parse::<f64>() {
                Ok(v) => Threshold::Percent(v / 100.0),
                Err(_) => Threshold::Fixed(0.0),
            }
        } else {
            match trimmed.parse::<f64>() {
                Ok(v) => Threshold::Fixed(v),
                Err(_) => Threshold::Fixed(0.0),
            }
        }
    }

    /// Evaluate against an absolute delta and a relative fraction, e.g.
    /// `absolute_trend` / `relative_trend`, or `sales - cogs` / `margin`.
    pub fn accepts(&self, absolute: f64, relative: f64) -> bool {
        match self {
            Threshold::Fixed(t) => absolute > *t,
            Threshold::Percent(t) => relative > *t,
        }
    }

    /// Same as `accepts` but with `>=` comparator, used by the profit
    /// evaluator's margin check.
    pub fn accepts_inclusive(&self, absolute: f64, relative: f64) -> bool {
        match self {
            Threshold::Fixed(t) => absolute >= *t,
            Threshold::Percent(t) => relative >= *t,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Fixed(v) => write!(f, "{v}"),
            Threshold::Percent(v) => write!(f, "{}%", v * 100.0),
        }
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Threshold::Fixed(n),
            Raw::Str(s) => Threshold::parse(&s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_number() {
        assert_eq!(Threshold::parse("150"), Threshold::Fixed(150.0));
        assert_eq!(Threshold::parse("-3.5"), Threshold::Fixed(-3.5));
    }

    #[test]
    fn parses_percent() {
        assert_eq!(Threshold::parse("1%"), Threshold::Percent(0.01));
        assert_eq!(Threshold::parse("2.5%"), Threshold::Percent(0.025));
    }

    #[test]
    fn falls_back_to_zero_fixed_on_garbage() {
        assert_eq!(Threshold::parse("banana"), Threshold::Fixed(0.0));
        assert_eq!(Threshold::parse("banana%"), Threshold::Fixed(0.0));
        assert_eq!(Threshold::parse(""), Threshold::Fixed(0.0));
    }

    #[test]
    fn accepts_fixed_vs_percent() {
        let fixed = Threshold::Fixed(10.0);
        assert!(fixed.accepts(10.1, 0.0));
        assert!(!fixed.accepts(9.9, 999.0));

        let pct = Threshold::Percent(0.01);
        assert!(pct.accepts(0.0, 0.011));
        assert!(!pct.accepts(999.0, 0.009));
    }
}
