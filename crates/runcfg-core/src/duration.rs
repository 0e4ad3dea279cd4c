//! Duration literals: `100ba`, `1ep`, `2_000sp`, `10000tok`, `0.5dur`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::document::Node;
use crate::error::{Error, Result};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9][0-9_]*(?:\.[0-9]+)?)([a-z]+)$").expect("valid duration regex")
});

/// Unit of a duration literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    /// `ep`: full passes over the training data.
    Epoch,
    /// `ba`: optimizer steps.
    Batch,
    /// `sp`: training samples.
    Sample,
    /// `tok`: training tokens.
    Token,
    /// `dur`: fraction of `max_duration`.
    Fraction,
}

impl DurationUnit {
    /// All units, in suffix order.
    pub const ALL: [DurationUnit; 5] = [
        DurationUnit::Epoch,
        DurationUnit::Batch,
        DurationUnit::Sample,
        DurationUnit::Token,
        DurationUnit::Fraction,
    ];

    /// Literal suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            DurationUnit::Epoch => "ep",
            DurationUnit::Batch => "ba",
            DurationUnit::Sample => "sp",
            DurationUnit::Token => "tok",
            DurationUnit::Fraction => "dur",
        }
    }

    /// Whether the count must be a whole number.
    pub fn is_integral(self) -> bool {
        !matches!(self, DurationUnit::Fraction)
    }
}

impl FromStr for DurationUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DurationUnit::ALL
            .into_iter()
            .find(|u| u.suffix() == s)
            .ok_or_else(|| {
                Error::invalid_duration(s, "unknown unit (expected ep, ba, sp, tok or dur)")
            })
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A parsed duration literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration {
    amount: Amount,
    unit: DurationUnit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Amount {
    Count(u64),
    Fraction(f64),
}

impl Duration {
    /// A whole-number duration.
    ///
    /// For [`DurationUnit::Fraction`] the count is taken as the fraction;
    /// prefer [`Duration::fraction`], which checks the range.
    pub fn new(count: u64, unit: DurationUnit) -> Self {
        let amount = if unit.is_integral() {
            Amount::Count(count)
        } else {
            Amount::Fraction(count as f64)
        };
        Self { amount, unit }
    }

    /// A fraction of `max_duration`, in `(0, 1]`.
    pub fn fraction(value: f64) -> Result<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self {
                amount: Amount::Fraction(value),
                unit: DurationUnit::Fraction,
            })
        } else {
            Err(Error::invalid_duration(
                format!("{value}dur"),
                "fraction must be in (0, 1]",
            ))
        }
    }

    /// Numeric part. Counts above 2^53 lose precision; use
    /// [`Duration::count`] for those.
    pub fn value(&self) -> f64 {
        match self.amount {
            Amount::Count(n) => n as f64,
            Amount::Fraction(f) => f,
        }
    }

    /// Unit part.
    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Whole-number count for integral units.
    pub fn count(&self) -> Option<u64> {
        match self.amount {
            Amount::Count(n) => Some(n),
            Amount::Fraction(_) => None,
        }
    }

    /// Interpret a document node as a duration.
    ///
    /// Strings must be literals; a bare non-negative integer counts epochs.
    pub fn from_node(node: &Node) -> Result<Self> {
        match node {
            Node::String(s) => s.parse(),
            Node::Int(i) if *i >= 0 => Ok(Self::new(*i as u64, DurationUnit::Epoch)),
            Node::Int(i) => Err(Error::invalid_duration(i.to_string(), "must not be negative")),
            other => Err(Error::invalid_duration(
                other.scalar_text().unwrap_or_else(|| other.kind().to_string()),
                format!("expected a duration literal, found {}", other.kind()),
            )),
        }
    }
}

impl FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let caps = DURATION_RE.captures(text).ok_or_else(|| {
            Error::invalid_duration(s, "expected <number><unit>, e.g. 100ba or 1ep")
        })?;
        let unit: DurationUnit = caps[2]
            .parse()
            .map_err(|_| Error::invalid_duration(s, format!("unknown unit '{}'", &caps[2])))?;
        let digits = caps[1].replace('_', "");

        if unit.is_integral() {
            let count: u64 = digits.parse().map_err(|_| {
                Error::invalid_duration(s, format!("'{}' requires a whole number", unit))
            })?;
            Ok(Self::new(count, unit))
        } else {
            let value: f64 = digits
                .parse()
                .map_err(|_| Error::invalid_duration(s, "invalid number"))?;
            Self::fraction(value).map_err(|_| Error::invalid_duration(s, "fraction must be in (0, 1]"))
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.amount {
            Amount::Count(n) => write!(f, "{n}{}", self.unit),
            Amount::Fraction(v) => write!(f, "{v}{}", self.unit),
        }
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
