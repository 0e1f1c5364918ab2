//! Rule-modifying feature contributions.
//!
//! A [`Feature`] is a named bonus a row grants toward some attribute, skill,
//! or reaction. The key identifies what it affects; the [`LeveledAmount`]
//! carries the magnitude and whether it scales with the owning row's levels.

use serde::{Deserialize, Serialize};

/// A magnitude that may scale with a level count supplied at aggregation time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeveledAmount {
    /// Base amount of the bonus.
    pub amount: f64,
    /// Whether the amount is multiplied by the owning row's level count.
    pub per_level: bool,
}

impl LeveledAmount {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            per_level: false,
        }
    }

    pub fn per_level(amount: f64) -> Self {
        Self {
            amount,
            per_level: true,
        }
    }

    /// Effective amount for the given level count.
    ///
    /// Non-leveled amounts ignore the level count entirely. Leveled amounts
    /// at level 0 fall back to the base amount, so a feature on a row that
    /// tracks no levels still contributes its face value.
    pub fn scaled(&self, levels: i32) -> f64 {
        if self.per_level && levels > 0 {
            self.amount * f64::from(levels)
        } else {
            self.amount
        }
    }
}

/// A named rule effect contributed by a row toward some attribute or skill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// What the feature affects, e.g. `attribute.dx` or `skill.broadsword`.
    /// Matching is case-insensitive; see [`crate::feature_map::FeatureMap`].
    pub key: String,
    pub amount: LeveledAmount,
}

impl Feature {
    pub fn new(key: impl Into<String>, amount: LeveledAmount) -> Self {
        Self {
            key: key.into(),
            amount,
        }
    }

    /// Flat bonus that does not scale with levels.
    pub fn flat(key: impl Into<String>, amount: f64) -> Self {
        Self::new(key, LeveledAmount::new(amount))
    }

    /// Bonus that scales with the owning row's level count.
    pub fn leveled(key: impl Into<String>, amount: f64) -> Self {
        Self::new(key, LeveledAmount::per_level(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_amount_ignores_levels() {
        let amount = LeveledAmount::new(3.0);
        assert_eq!(amount.scaled(0), 3.0);
        assert_eq!(amount.scaled(5), 3.0);
    }

    #[test]
    fn leveled_amount_scales() {
        let amount = LeveledAmount::per_level(2.0);
        assert_eq!(amount.scaled(3), 6.0);
    }

    #[test]
    fn leveled_amount_at_level_zero_is_base() {
        let amount = LeveledAmount::per_level(2.0);
        assert_eq!(amount.scaled(0), 2.0);
    }
}
