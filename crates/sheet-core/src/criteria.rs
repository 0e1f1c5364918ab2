//! Comparison vocabulary for prerequisite leaves.
//!
//! Prerequisites compare numbers (attribute values, skill levels, spell
//! counts) and names (skill/advantage/spell names, colleges). The criteria
//! types here pair a compare mode with a qualifier and render themselves as
//! the phrases used in reason text.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a numeric qualifier is compared against an observed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NumericCompare {
    Is,
    AtLeast,
    AtMost,
}

/// A numeric comparison, e.g. "at least 12".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericCriteria {
    pub compare: NumericCompare,
    pub qualifier: f64,
}

impl NumericCriteria {
    pub fn new(compare: NumericCompare, qualifier: f64) -> Self {
        Self { compare, qualifier }
    }

    pub fn at_least(qualifier: f64) -> Self {
        Self::new(NumericCompare::AtLeast, qualifier)
    }

    pub fn at_most(qualifier: f64) -> Self {
        Self::new(NumericCompare::AtMost, qualifier)
    }

    pub fn exactly(qualifier: f64) -> Self {
        Self::new(NumericCompare::Is, qualifier)
    }

    pub fn matches(&self, value: f64) -> bool {
        match self.compare {
            NumericCompare::Is => value == self.qualifier,
            NumericCompare::AtLeast => value >= self.qualifier,
            NumericCompare::AtMost => value <= self.qualifier,
        }
    }
}

impl fmt::Display for NumericCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phrase = match self.compare {
            NumericCompare::Is => "is",
            NumericCompare::AtLeast => "is at least",
            NumericCompare::AtMost => "is at most",
        };
        if self.qualifier.fract() == 0.0 {
            write!(f, "{} {}", phrase, self.qualifier as i64)
        } else {
            write!(f, "{} {}", phrase, self.qualifier)
        }
    }
}

/// How a string qualifier is compared against an observed name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StringCompare {
    Any,
    Is,
    IsNot,
    Contains,
    StartsWith,
}

/// A name comparison, e.g. `is "Broadsword"`. Comparison is case-insensitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StringCriteria {
    pub compare: StringCompare,
    pub qualifier: String,
}

impl StringCriteria {
    pub fn new(compare: StringCompare, qualifier: impl Into<String>) -> Self {
        Self {
            compare,
            qualifier: qualifier.into(),
        }
    }

    pub fn is(qualifier: impl Into<String>) -> Self {
        Self::new(StringCompare::Is, qualifier)
    }

    pub fn any() -> Self {
        Self::new(StringCompare::Any, "")
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        let qualifier = self.qualifier.to_lowercase();
        match self.compare {
            StringCompare::Any => true,
            StringCompare::Is => value == qualifier,
            StringCompare::IsNot => value != qualifier,
            StringCompare::Contains => value.contains(&qualifier),
            StringCompare::StartsWith => value.starts_with(&qualifier),
        }
    }
}

impl fmt::Display for StringCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compare {
            StringCompare::Any => write!(f, "is anything"),
            StringCompare::Is => write!(f, "is \"{}\"", self.qualifier),
            StringCompare::IsNot => write!(f, "is not \"{}\"", self.qualifier),
            StringCompare::Contains => write!(f, "contains \"{}\"", self.qualifier),
            StringCompare::StartsWith => write!(f, "starts with \"{}\"", self.qualifier),
        }
    }
}
