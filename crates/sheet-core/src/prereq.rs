//! Prerequisite trees.
//!
//! A prerequisite tree is a boolean expression attached to a row: leaves
//! test the character, the feature map, or the requesting row, and
//! [`PrereqList`] combines them with all-of / any-of semantics. Evaluation
//! is pure given `(character, feature map, requesting row)` and appends a
//! bullet line to the reason buffer for every failed branch.
//!
//! The node set is closed, so the tree is a plain enum rather than trait
//! objects; nested lists give arbitrary and/or structure.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::character::{AttributeId, Character};
use crate::criteria::{NumericCriteria, StringCriteria};
use crate::feature_map::FeatureMap;
use crate::row::{Row, RowKind};

/// Everything a prerequisite may consult during evaluation.
pub struct PrereqContext<'a> {
    pub character: &'a Character,
    pub map: &'a FeatureMap,
    /// The row being validated. Excluded from searches so a row never
    /// satisfies its own prerequisite, and consulted directly by
    /// container-scoped leaves.
    pub row: &'a Row,
}

/// Which aspect of the character's spells a spell prerequisite counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellPrereqKind {
    /// Spells whose name matches.
    Name(StringCriteria),
    /// Any spell at all.
    Any,
    /// Spells belonging to a matching college.
    College(StringCriteria),
    /// The number of distinct colleges the character has spells in.
    CollegeCount,
}

/// A single prerequisite node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prereq {
    /// Nested combinator.
    List(PrereqList),
    /// Attribute value comparison, optionally summed with a second attribute.
    Attribute {
        has: bool,
        which: AttributeId,
        combined_with: Option<AttributeId>,
        qualifier: NumericCriteria,
    },
    /// Presence (or absence) of an advantage by name, optionally at a level.
    Advantage {
        has: bool,
        name: StringCriteria,
        levels: Option<NumericCriteria>,
    },
    /// Presence of a skill by name/specialization at a level.
    Skill {
        has: bool,
        name: StringCriteria,
        specialization: StringCriteria,
        level: NumericCriteria,
    },
    /// Count of known spells matching a sub-criterion.
    Spell {
        has: bool,
        kind: SpellPrereqKind,
        quantity: NumericCriteria,
    },
    /// Total quantity of items contained in the requesting equipment row.
    ContainedQuantity {
        has: bool,
        qualifier: NumericCriteria,
    },
    /// Aggregated feature-map total for a key.
    ContainsFeature {
        key: String,
        total: NumericCriteria,
    },
}

/// A prerequisite list: all-of or any-of over child nodes, optionally gated
/// on the character's tech level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrereqList {
    /// Whether every child must be met, or any one of them suffices.
    pub all: bool,
    /// When present and the character's TL does not match, the whole list
    /// is considered satisfied without evaluating children.
    pub when_tech_level: Option<NumericCriteria>,
    pub prereqs: Vec<Prereq>,
}

impl PrereqList {
    pub fn all_of(prereqs: Vec<Prereq>) -> Self {
        Self {
            all: true,
            when_tech_level: None,
            prereqs,
        }
    }

    pub fn any_of(prereqs: Vec<Prereq>) -> Self {
        Self {
            all: false,
            when_tech_level: None,
            prereqs,
        }
    }

    pub fn when_tech_level(mut self, criteria: NumericCriteria) -> Self {
        self.when_tech_level = Some(criteria);
        self
    }

    /// Evaluates the list, appending failure reasons to `buf` when the
    /// aggregate is unsatisfied. Reasons from satisfied evaluations are
    /// discarded, matching the any-of semantics.
    pub fn satisfied(&self, ctx: &PrereqContext<'_>, buf: &mut String, prefix: &str) -> bool {
        if let Some(when_tl) = &self.when_tech_level {
            if !when_tl.matches(f64::from(ctx.character.tech_level)) {
                return true;
            }
        }

        let mut local = String::new();
        let mut satisfied_count = 0;
        for prereq in &self.prereqs {
            if prereq.satisfied(ctx, &mut local, prefix) {
                satisfied_count += 1;
            }
        }

        let satisfied =
            satisfied_count == self.prereqs.len() || (!self.all && satisfied_count > 0);
        if !satisfied {
            let heading = if self.all {
                "Requires all of:"
            } else {
                "Requires at least one of:"
            };
            let _ = write!(buf, "{prefix}{heading}\n<ul>{local}</ul>");
        }
        satisfied
    }
}

fn has_text(has: bool) -> &'static str {
    if has {
        "Has"
    } else {
        "Does not have"
    }
}

impl Prereq {
    /// Evaluates this node. Appends one bullet line to `buf` on failure.
    pub fn satisfied(&self, ctx: &PrereqContext<'_>, buf: &mut String, prefix: &str) -> bool {
        match self {
            Prereq::List(list) => list.satisfied(ctx, buf, prefix),
            Prereq::Attribute {
                has,
                which,
                combined_with,
                qualifier,
            } => {
                let mut value = attribute_with_bonuses(ctx, *which);
                let mut label = which.to_string();
                if let Some(second) = combined_with {
                    value += attribute_with_bonuses(ctx, *second);
                    label = format!("{label}+{second}");
                }
                let satisfied = *has == qualifier.matches(value);
                if !satisfied {
                    let _ = write!(
                        buf,
                        "{prefix}{} {} which {}\n",
                        has_text(*has),
                        label,
                        qualifier
                    );
                }
                satisfied
            }
            Prereq::Advantage { has, name, levels } => {
                let mut found = false;
                for row in ctx.character.advantages_iter() {
                    if row.id == ctx.row.id || !name.matches(&row.name) {
                        continue;
                    }
                    let level_ok = match (levels, &row.kind) {
                        (Some(criteria), RowKind::Advantage { levels, .. }) => {
                            criteria.matches(f64::from(*levels))
                        }
                        _ => true,
                    };
                    if level_ok {
                        found = true;
                        break;
                    }
                }
                let satisfied = *has == found;
                if !satisfied {
                    let _ = write!(
                        buf,
                        "{prefix}{} an advantage whose name {}",
                        has_text(*has),
                        name
                    );
                    if let Some(criteria) = levels {
                        let _ = write!(buf, " and whose level {criteria}");
                    }
                    buf.push('\n');
                }
                satisfied
            }
            Prereq::Skill {
                has,
                name,
                specialization,
                level,
            } => {
                let mut found = false;
                for row in ctx.character.skills_iter() {
                    if row.id == ctx.row.id || !name.matches(&row.name) {
                        continue;
                    }
                    let (base_level, spec) = match &row.kind {
                        RowKind::Skill {
                            level,
                            specialization,
                            ..
                        } => (*level, specialization.as_str()),
                        RowKind::Technique { level, .. } => (*level, ""),
                        _ => continue,
                    };
                    if !specialization.matches(spec) {
                        continue;
                    }
                    let effective = f64::from(base_level)
                        + ctx.map.total(&format!("skill.{}", row.name.to_lowercase()));
                    if level.matches(effective) {
                        found = true;
                        break;
                    }
                }
                let satisfied = *has == found;
                if !satisfied {
                    let _ = write!(
                        buf,
                        "{prefix}{} a skill whose name {} and whose level {}\n",
                        has_text(*has),
                        name,
                        level
                    );
                }
                satisfied
            }
            Prereq::Spell {
                has,
                kind,
                quantity,
            } => {
                let count = match kind {
                    SpellPrereqKind::CollegeCount => ctx.character.college_count(),
                    _ => {
                        let mut count = 0;
                        for row in ctx.character.spells_iter() {
                            if row.id == ctx.row.id || row.points() < 1 {
                                continue;
                            }
                            let matched = match (kind, &row.kind) {
                                (SpellPrereqKind::Name(criteria), _) => criteria.matches(&row.name),
                                (SpellPrereqKind::Any, _) => true,
                                (
                                    SpellPrereqKind::College(criteria),
                                    RowKind::Spell { college, .. },
                                ) => criteria.matches(college),
                                _ => false,
                            };
                            if matched {
                                count += 1;
                            }
                        }
                        count
                    }
                };
                let satisfied = *has == quantity.matches(count as f64);
                if !satisfied {
                    let what = match kind {
                        SpellPrereqKind::Name(criteria) => {
                            format!("spell(s) whose name {criteria}")
                        }
                        SpellPrereqKind::Any => "spell(s) of any kind".to_string(),
                        SpellPrereqKind::College(criteria) => {
                            format!("spell(s) whose college {criteria}")
                        }
                        SpellPrereqKind::CollegeCount => {
                            "college(s) of spells".to_string()
                        }
                    };
                    let _ = write!(
                        buf,
                        "{prefix}{} a spell count which {} for {}\n",
                        has_text(*has),
                        quantity,
                        what
                    );
                }
                satisfied
            }
            Prereq::ContainedQuantity { has, qualifier } => {
                let total: i32 = ctx
                    .row
                    .children
                    .iter()
                    .map(|child| match &child.kind {
                        RowKind::Equipment { quantity, .. } => *quantity,
                        _ => 0,
                    })
                    .sum();
                let satisfied = *has == qualifier.matches(f64::from(total));
                if !satisfied {
                    let _ = write!(
                        buf,
                        "{prefix}{} a contained quantity which {}\n",
                        has_text(*has),
                        qualifier
                    );
                }
                satisfied
            }
            Prereq::ContainsFeature { key, total } => {
                let satisfied = ctx.map.contains(key) && total.matches(ctx.map.total(key));
                if !satisfied {
                    let _ = write!(
                        buf,
                        "{prefix}Requires a feature \"{}\" whose total {}\n",
                        key, total
                    );
                }
                satisfied
            }
        }
    }
}

/// Base attribute plus the bonuses the freshly built map grants it.
fn attribute_with_bonuses(ctx: &PrereqContext<'_>, id: AttributeId) -> f64 {
    f64::from(ctx.character.base_attribute(id)) + ctx.map.total(&id.feature_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::feature_map::build_feature_map;

    fn ctx<'a>(character: &'a Character, map: &'a FeatureMap, row: &'a Row) -> PrereqContext<'a> {
        PrereqContext {
            character,
            map,
            row,
        }
    }

    fn attribute_at_least(which: AttributeId, value: f64) -> Prereq {
        Prereq::Attribute {
            has: true,
            which,
            combined_with: None,
            qualifier: NumericCriteria::at_least(value),
        }
    }

    #[test]
    fn attribute_prereq_names_attribute_in_reason() {
        let mut character = Character::new("Test");
        character.set_base_attribute(AttributeId::Dx, 10);
        let map = FeatureMap::default();
        let row = Row::skill("Broadsword", 1, 10);

        let prereq = attribute_at_least(AttributeId::Dx, 12.0);
        let mut buf = String::new();
        assert!(!prereq.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
        assert!(buf.contains("DX"));
        assert!(buf.contains("is at least 12"));
    }

    #[test]
    fn attribute_prereq_sees_feature_bonuses() {
        let mut character = Character::new("Test");
        character.set_base_attribute(AttributeId::St, 10);
        character.advantages =
            vec![Row::advantage("Lifting ST", 2)
                .with_features(vec![Feature::leveled("attribute.st", 1.0)])];
        let map = build_feature_map(&character);
        let row = Row::skill("Forced Entry", 1, 10);

        let prereq = attribute_at_least(AttributeId::St, 12.0);
        let mut buf = String::new();
        assert!(prereq.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
    }

    #[test]
    fn any_of_list_needs_only_one_branch() {
        let character = Character::new("Test");
        let map = FeatureMap::default();
        let row = Row::skill("Test", 1, 10);

        let list = PrereqList::any_of(vec![
            attribute_at_least(AttributeId::St, 20.0),
            attribute_at_least(AttributeId::Dx, 5.0),
        ]);
        let mut buf = String::new();
        assert!(list.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
        assert!(buf.is_empty());
    }

    #[test]
    fn all_of_list_reports_each_failed_branch() {
        let character = Character::new("Test");
        let map = FeatureMap::default();
        let row = Row::skill("Test", 1, 10);

        let list = PrereqList::all_of(vec![
            attribute_at_least(AttributeId::St, 20.0),
            attribute_at_least(AttributeId::Iq, 20.0),
        ]);
        let mut buf = String::new();
        assert!(!list.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
        assert!(buf.contains("Requires all of:"));
        assert!(buf.contains("ST"));
        assert!(buf.contains("IQ"));
    }

    #[test]
    fn when_tech_level_gate_auto_satisfies() {
        let mut character = Character::new("Test");
        character.tech_level = 3;
        let map = FeatureMap::default();
        let row = Row::skill("Test", 1, 10);

        let list = PrereqList::all_of(vec![attribute_at_least(AttributeId::St, 20.0)])
            .when_tech_level(NumericCriteria::at_least(8.0));
        let mut buf = String::new();
        assert!(list.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
    }

    #[test]
    fn advantage_prereq_excludes_requesting_row() {
        let mut character = Character::new("Test");
        let advantage = Row::advantage("Magery", 1);
        let advantage_id = advantage.id;
        character.advantages = vec![advantage];
        let map = FeatureMap::default();

        let prereq = Prereq::Advantage {
            has: true,
            name: StringCriteria::is("Magery"),
            levels: None,
        };

        // Another row sees the advantage.
        let other = Row::spell("Fireball", 1, "Fire");
        let mut buf = String::new();
        assert!(prereq.satisfied(&ctx(&character, &map, &other), &mut buf, "<li>"));

        // The advantage itself does not.
        let own = character.row(advantage_id).unwrap().clone();
        let mut buf = String::new();
        assert!(!prereq.satisfied(&ctx(&character, &map, &own), &mut buf, "<li>"));
    }

    #[test]
    fn spell_prereq_counts_only_pointed_spells() {
        let mut character = Character::new("Test");
        character.spells = vec![
            Row::spell("Fireball", 1, "Fire"),
            Row::spell("Ignite Fire", 0, "Fire"),
        ];
        let map = FeatureMap::default();
        let row = Row::spell("Explosive Fireball", 1, "Fire");

        let prereq = Prereq::Spell {
            has: true,
            kind: SpellPrereqKind::Any,
            quantity: NumericCriteria::at_least(2.0),
        };
        let mut buf = String::new();
        assert!(!prereq.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
        assert!(buf.contains("spell"));
    }

    #[test]
    fn contains_feature_names_unresolved_key() {
        let character = Character::new("Test");
        let map = FeatureMap::default();
        let row = Row::skill("Test", 1, 10);

        let prereq = Prereq::ContainsFeature {
            key: "attribute.magery".to_string(),
            total: NumericCriteria::at_least(1.0),
        };
        let mut buf = String::new();
        assert!(!prereq.satisfied(&ctx(&character, &map, &row), &mut buf, "<li>"));
        assert!(buf.contains("attribute.magery"));
    }

    #[test]
    fn prereq_trees_round_trip_through_json() {
        let list = PrereqList::any_of(vec![
            attribute_at_least(AttributeId::Will, 13.0),
            Prereq::Advantage {
                has: true,
                name: StringCriteria::is("Magery"),
                levels: Some(NumericCriteria::at_least(2.0)),
            },
            Prereq::List(PrereqList::all_of(vec![Prereq::Spell {
                has: true,
                kind: SpellPrereqKind::College(StringCriteria::is("Fire")),
                quantity: NumericCriteria::at_least(3.0),
            }])),
        ]);
        let json = serde_json::to_string(&list).unwrap();
        let back: PrereqList = serde_json::from_str(&json).unwrap();
        assert_eq!(list, back);
    }

    #[test]
    fn contained_quantity_checks_children() {
        let character = Character::new("Test");
        let map = FeatureMap::default();
        let quiver = Row::equipment("Quiver", 1, true)
            .with_children(vec![Row::equipment("Arrow", 12, true)]);

        let prereq = Prereq::ContainedQuantity {
            has: true,
            qualifier: NumericCriteria::at_least(10.0),
        };
        let mut buf = String::new();
        assert!(prereq.satisfied(&ctx(&character, &map, &quiver), &mut buf, "<li>"));
    }
}
