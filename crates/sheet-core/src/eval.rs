//! Per-row prerequisite evaluation and verdict application.
//!
//! [`evaluate_row`] produces a [`Verdict`] for one row: the generic
//! prerequisite tree, plus the technique-specific default check for
//! technique rows (a technique with a satisfied tree can still be invalid
//! when its default skill is missing). [`apply_verdicts`] writes buffered
//! verdicts back onto the character and reports whether anything visibly
//! changed, which is what drives the repaint decision.

use std::fmt::Write as _;

use crate::character::Character;
use crate::feature_map::FeatureMap;
use crate::prereq::PrereqContext;
use crate::row::{DefaultKind, Row, RowId, RowKind, TechniqueDefault};

/// Outcome of evaluating one row against a single edit generation.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub row: RowId,
    pub satisfied: bool,
    /// Rendered explanation; empty when satisfied.
    pub reason: String,
}

const BULLET: &str = "<li>";

/// Evaluates a row's prerequisite tree against the character and the freshly
/// built feature map. Rows without a tree are satisfied; technique rows get
/// their default-skill check ANDed in.
pub fn evaluate_row(character: &Character, map: &FeatureMap, row: &Row) -> Verdict {
    let mut buf = String::new();
    let ctx = PrereqContext {
        character,
        map,
        row,
    };

    let mut satisfied = match &row.prereqs {
        Some(list) => list.satisfied(&ctx, &mut buf, BULLET),
        None => true,
    };
    if satisfied {
        if let RowKind::Technique { default, .. } = &row.kind {
            satisfied = technique_satisfied(character, row, default, &mut buf);
        }
    }

    let reason = if satisfied {
        String::new()
    } else {
        format!("<html><body>Reason:<ul>{buf}</ul></body></html>")
    };
    Verdict {
        row: row.id,
        satisfied,
        reason,
    }
}

/// A technique is valid only when its skill-based default resolves to a
/// skill the character has actually put points into. Attribute-based
/// defaults always resolve.
fn technique_satisfied(
    character: &Character,
    row: &Row,
    default: &TechniqueDefault,
    buf: &mut String,
) -> bool {
    if default.kind != DefaultKind::Skill {
        return true;
    }
    let skill = character.best_skill_named(&default.name, &default.specialization, Some(row.id));
    let satisfied = match skill {
        Some(skill) => matches!(skill.kind, RowKind::Technique { .. }) || skill.points() > 0,
        None => false,
    };
    if !satisfied {
        match skill {
            None => {
                let _ = write!(
                    buf,
                    "{BULLET}Requires a skill named {}\n",
                    default.full_name()
                );
            }
            Some(_) => {
                let _ = write!(
                    buf,
                    "{BULLET}Requires at least 1 point in the skill named {}\n",
                    default.full_name()
                );
            }
        }
    }
    satisfied
}

/// Evaluates every row in validation order: advantages, skills, spells,
/// equipment. Unequipped and zero-quantity equipment is still evaluated;
/// the equip gate applies only to feature aggregation.
pub fn evaluate_all(character: &Character, map: &FeatureMap) -> Vec<Verdict> {
    character
        .all_rows()
        .map(|row| evaluate_row(character, map, row))
        .collect()
}

/// Writes verdicts back onto the character's rows. Rows that vanished since
/// the verdicts were computed are skipped. Returns whether any `satisfied`
/// flag actually changed, so callers can avoid repainting when nothing
/// visible moved.
pub fn apply_verdicts(character: &mut Character, verdicts: &[Verdict]) -> bool {
    let mut changed = false;
    for verdict in verdicts {
        if let Some(row) = character.row_mut(verdict.row) {
            if row.satisfied != verdict.satisfied {
                row.satisfied = verdict.satisfied;
                changed = true;
            }
            row.reason = verdict.reason.clone();
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::AttributeId;
    use crate::criteria::NumericCriteria;
    use crate::feature::Feature;
    use crate::feature_map::build_feature_map;
    use crate::prereq::{Prereq, PrereqList};
    use crate::row::TechniqueDefault;

    fn dx_at_least(value: f64) -> PrereqList {
        PrereqList::all_of(vec![Prereq::Attribute {
            has: true,
            which: AttributeId::Dx,
            combined_with: None,
            qualifier: NumericCriteria::at_least(value),
        }])
    }

    #[test]
    fn broadsword_scenario() {
        let mut character = Character::new("Test");
        character.set_base_attribute(AttributeId::Dx, 10);
        character.advantages = vec![Row::advantage("Weapon Master", 0)];
        character.skills = vec![Row::skill("Broadsword", 4, 12).with_prereqs(dx_at_least(12.0))];

        let map = build_feature_map(&character);
        let verdicts = evaluate_all(&character, &map);
        let changed = apply_verdicts(&mut character, &verdicts);
        assert!(changed);
        let broadsword = &character.skills[0];
        assert!(!broadsword.is_satisfied());
        assert!(broadsword.reason_text().contains("DX"));

        character.set_base_attribute(AttributeId::Dx, 12);
        let map = build_feature_map(&character);
        let verdicts = evaluate_all(&character, &map);
        let changed = apply_verdicts(&mut character, &verdicts);
        assert!(changed);
        let broadsword = &character.skills[0];
        assert!(broadsword.is_satisfied());
        assert!(broadsword.reason_text().is_empty());
    }

    #[test]
    fn rows_without_trees_are_satisfied() {
        let mut character = Character::new("Test");
        character.advantages = vec![Row::advantage("Luck", 0)];
        let map = build_feature_map(&character);
        let verdict = evaluate_row(&character, &map, &character.advantages[0]);
        assert!(verdict.satisfied);
        assert!(verdict.reason.is_empty());
    }

    #[test]
    fn technique_requires_its_default_skill() {
        let mut character = Character::new("Test");
        character.skills = vec![Row::technique(
            "Disarming",
            2,
            TechniqueDefault::skill("Broadsword", -4),
        )];
        let map = build_feature_map(&character);

        let verdicts = evaluate_all(&character, &map);
        apply_verdicts(&mut character, &verdicts);
        let technique = &character.skills[0];
        assert!(!technique.is_satisfied());
        assert!(technique.reason_text().contains("Requires a skill named Broadsword"));

        // Adding the skill without points still fails, with a different reason.
        character.skills.push(Row::skill("Broadsword", 0, 10));
        let verdicts = evaluate_all(&character, &map);
        apply_verdicts(&mut character, &verdicts);
        let technique = &character.skills[0];
        assert!(!technique.is_satisfied());
        assert!(technique.reason_text().contains("at least 1 point"));

        // With points the technique resolves.
        character.skills[1] = Row::skill("Broadsword", 2, 10);
        let verdicts = evaluate_all(&character, &map);
        apply_verdicts(&mut character, &verdicts);
        assert!(character.skills[0].is_satisfied());
    }

    #[test]
    fn unequipped_equipment_is_still_evaluated() {
        let mut character = Character::new("Test");
        character.equipment = vec![Row::equipment("Power Armor", 1, false)
            .with_prereqs(dx_at_least(14.0))
            .with_features(vec![Feature::flat("attribute.st", 5.0)])];

        let map = build_feature_map(&character);
        assert!(map.is_empty());

        let verdicts = evaluate_all(&character, &map);
        apply_verdicts(&mut character, &verdicts);
        assert!(!character.equipment[0].is_satisfied());
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut character = Character::new("Test");
        character.set_base_attribute(AttributeId::Dx, 10);
        character.skills = vec![Row::skill("Broadsword", 4, 12).with_prereqs(dx_at_least(12.0))];

        let map = build_feature_map(&character);
        let first = evaluate_all(&character, &map);
        let second = evaluate_all(&character, &map);
        assert_eq!(first, second);

        // Applying identical verdicts a second time reports no change.
        assert!(apply_verdicts(&mut character, &first));
        assert!(!apply_verdicts(&mut character, &second));
    }

    #[test]
    fn verdicts_for_vanished_rows_are_skipped() {
        let mut character = Character::new("Test");
        character.skills = vec![Row::skill("Broadsword", 4, 12).with_prereqs(dx_at_least(12.0))];
        let map = build_feature_map(&character);
        let verdicts = evaluate_all(&character, &map);

        character.skills.clear();
        assert!(!apply_verdicts(&mut character, &verdicts));
    }
}
