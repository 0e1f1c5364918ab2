//! List rows and their per-kind payloads.
//!
//! The original editor modeled rows as a subclass hierarchy; here the set of
//! kinds is closed, so [`RowKind`] is a tagged variant and dispatch is
//! pattern matching. Every row shares the same contract with the consistency
//! engine: it may own features, it may own a prerequisite tree, and it
//! carries the engine-owned `(satisfied, reason)` verdict pair.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::feature::Feature;
use crate::prereq::PrereqList;

static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a row within a character, used to address verdicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl RowId {
    /// Allocates a fresh process-unique id.
    pub fn next() -> Self {
        Self(NEXT_ROW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Self-control roll attached to a disadvantage, keyed by target number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfControlRoll {
    #[default]
    NoneRequired,
    Cr6,
    Cr9,
    Cr12,
    Cr15,
}

impl SelfControlRoll {
    /// Reaction adjustment for this roll. Rarer rolls weigh heavier.
    pub fn reaction_penalty(self) -> i32 {
        match self {
            SelfControlRoll::NoneRequired => 0,
            SelfControlRoll::Cr6 => -4,
            SelfControlRoll::Cr9 => -3,
            SelfControlRoll::Cr12 => -2,
            SelfControlRoll::Cr15 => -1,
        }
    }
}

/// How a self-control roll adjusts the rest of the character.
///
/// Only two of the adjustments exert rule effects; the others are purely
/// descriptive and contribute nothing to the feature map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrAdjustment {
    #[default]
    None,
    ActionPenalty,
    ReactionPenalty,
    FrightCheckPenalty,
    FrightCheckBonus,
    MinorCostOfLiving,
    MajorCostOfLiving,
}

impl CrAdjustment {
    /// Features this adjustment contributes for the given roll.
    pub fn features(self, cr: SelfControlRoll) -> Vec<Feature> {
        if cr == SelfControlRoll::NoneRequired {
            return Vec::new();
        }
        match self {
            CrAdjustment::ReactionPenalty => {
                vec![Feature::flat("reaction", f64::from(cr.reaction_penalty()))]
            }
            CrAdjustment::MajorCostOfLiving => {
                vec![Feature::flat(
                    "skill.merchant",
                    f64::from(cr.reaction_penalty()),
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// A sub-component of an advantage or piece of equipment that conditionally
/// contributes its own features when enabled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub enabled: bool,
    /// Level count applied to this modifier's own leveled features. The
    /// owning row's levels are never used for modifier features.
    pub levels: i32,
    pub features: Vec<Feature>,
}

impl Modifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            levels: 0,
            features: Vec::new(),
        }
    }

    pub fn with_levels(mut self, levels: i32) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// What a technique falls back to when it has no points of its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultKind {
    /// Defaults to a skill; validity requires that skill to exist with points.
    Skill,
    /// Defaults directly to an attribute; always considered valid.
    Attribute,
}

/// The default a technique is built on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechniqueDefault {
    pub kind: DefaultKind,
    pub name: String,
    pub specialization: String,
    pub modifier: i32,
}

impl TechniqueDefault {
    pub fn skill(name: impl Into<String>, modifier: i32) -> Self {
        Self {
            kind: DefaultKind::Skill,
            name: name.into(),
            specialization: String::new(),
            modifier,
        }
    }

    /// Full name including specialization, as rendered in reason text.
    pub fn full_name(&self) -> String {
        if self.specialization.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.specialization)
        }
    }
}

/// Per-kind payload of a row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Advantage {
        levels: i32,
        cr: SelfControlRoll,
        cr_adj: CrAdjustment,
        modifiers: Vec<Modifier>,
    },
    Skill {
        points: i32,
        level: i32,
        specialization: String,
    },
    Technique {
        points: i32,
        level: i32,
        default: TechniqueDefault,
    },
    Spell {
        points: i32,
        college: String,
    },
    Equipment {
        equipped: bool,
        quantity: i32,
        modifiers: Vec<Modifier>,
    },
}

/// Any list entry: advantage, skill, technique, spell, or equipment item.
///
/// `satisfied` and `reason` are derived fields owned exclusively by the
/// consistency engine; no other component writes them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub name: String,
    pub features: Vec<Feature>,
    pub prereqs: Option<PrereqList>,
    pub children: Vec<Row>,
    pub satisfied: bool,
    pub reason: String,
    pub kind: RowKind,
}

impl Row {
    pub fn new(name: impl Into<String>, kind: RowKind) -> Self {
        Self {
            id: RowId::next(),
            name: name.into(),
            features: Vec::new(),
            prereqs: None,
            children: Vec::new(),
            satisfied: true,
            reason: String::new(),
            kind,
        }
    }

    pub fn advantage(name: impl Into<String>, levels: i32) -> Self {
        Self::new(
            name,
            RowKind::Advantage {
                levels,
                cr: SelfControlRoll::NoneRequired,
                cr_adj: CrAdjustment::None,
                modifiers: Vec::new(),
            },
        )
    }

    pub fn skill(name: impl Into<String>, points: i32, level: i32) -> Self {
        Self::new(
            name,
            RowKind::Skill {
                points,
                level,
                specialization: String::new(),
            },
        )
    }

    pub fn technique(name: impl Into<String>, points: i32, default: TechniqueDefault) -> Self {
        Self::new(
            name,
            RowKind::Technique {
                points,
                level: 0,
                default,
            },
        )
    }

    pub fn spell(name: impl Into<String>, points: i32, college: impl Into<String>) -> Self {
        Self::new(
            name,
            RowKind::Spell {
                points,
                college: college.into(),
            },
        )
    }

    pub fn equipment(name: impl Into<String>, quantity: i32, equipped: bool) -> Self {
        Self::new(
            name,
            RowKind::Equipment {
                equipped,
                quantity,
                modifiers: Vec::new(),
            },
        )
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_prereqs(mut self, prereqs: PrereqList) -> Self {
        self.prereqs = Some(prereqs);
        self
    }

    pub fn with_children(mut self, children: Vec<Row>) -> Self {
        self.children = children;
        self
    }

    /// Level count used to scale this row's own leveled features.
    /// Only advantages track levels; every other kind scales at 0.
    pub fn feature_levels(&self) -> i32 {
        match &self.kind {
            RowKind::Advantage { levels, .. } => *levels,
            _ => 0,
        }
    }

    /// Points invested, for kinds that track them.
    pub fn points(&self) -> i32 {
        match &self.kind {
            RowKind::Skill { points, .. }
            | RowKind::Technique { points, .. }
            | RowKind::Spell { points, .. } => *points,
            _ => 0,
        }
    }

    /// Engine-published verdict for this row.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Engine-published explanation; empty while the row is satisfied.
    pub fn reason_text(&self) -> &str {
        &self.reason
    }
}

/// Depth-first iterator over a row collection, including nested children.
pub fn walk(rows: &[Row]) -> RowIter<'_> {
    RowIter {
        stack: rows.iter().rev().collect(),
    }
}

pub struct RowIter<'a> {
    stack: Vec<&'a Row>,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = &'a Row;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.stack.pop()?;
        self.stack.extend(row.children.iter().rev());
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_visits_children_depth_first() {
        let rows = vec![
            Row::advantage("A", 0).with_children(vec![
                Row::advantage("A1", 0),
                Row::advantage("A2", 0).with_children(vec![Row::advantage("A2a", 0)]),
            ]),
            Row::advantage("B", 0),
        ];
        let names: Vec<_> = walk(&rows).map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["A", "A1", "A2", "A2a", "B"]);
    }

    #[test]
    fn cr_adjustment_reaction_features() {
        let features = CrAdjustment::ReactionPenalty.features(SelfControlRoll::Cr9);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].key, "reaction");
        assert_eq!(features[0].amount.scaled(0), -3.0);
    }

    #[test]
    fn cr_adjustment_without_roll_contributes_nothing() {
        assert!(CrAdjustment::ReactionPenalty
            .features(SelfControlRoll::NoneRequired)
            .is_empty());
        assert!(CrAdjustment::ActionPenalty
            .features(SelfControlRoll::Cr12)
            .is_empty());
    }
}
