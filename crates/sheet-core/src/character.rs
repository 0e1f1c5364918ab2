//! The character aggregate root.
//!
//! A character owns its attribute values and the four ordered row
//! collections the consistency engine walks: advantages, skills (including
//! techniques), spells, and equipment. It also holds the last feature map
//! the engine published, which backs the derived attribute accessors used
//! by the rendering layer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::feature_map::FeatureMap;
use crate::row::{walk, Row, RowId, RowKind};

static NEXT_CHARACTER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an open character document. One engine runs per character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u64);

impl CharacterId {
    pub fn next() -> Self {
        Self(NEXT_CHARACTER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The fixed attribute set prerequisites can reference.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AttributeId {
    St,
    Dx,
    Iq,
    Ht,
    Will,
    Per,
}

impl AttributeId {
    /// Feature-map key this attribute's bonuses are filed under.
    pub fn feature_key(self) -> String {
        format!("attribute.{}", self.to_string().to_lowercase())
    }
}

/// Aggregate root for one open character document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    attributes: BTreeMap<AttributeId, i32>,
    pub tech_level: i32,
    pub advantages: Vec<Row>,
    pub skills: Vec<Row>,
    pub spells: Vec<Row>,
    pub equipment: Vec<Row>,
    feature_map: FeatureMap,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        for id in [
            AttributeId::St,
            AttributeId::Dx,
            AttributeId::Iq,
            AttributeId::Ht,
            AttributeId::Will,
            AttributeId::Per,
        ] {
            attributes.insert(id, 10);
        }
        Self {
            id: CharacterId::next(),
            name: name.into(),
            attributes,
            tech_level: 3,
            advantages: Vec::new(),
            skills: Vec::new(),
            spells: Vec::new(),
            equipment: Vec::new(),
            feature_map: FeatureMap::default(),
        }
    }

    /// Attribute value before feature bonuses.
    pub fn base_attribute(&self, id: AttributeId) -> i32 {
        self.attributes.get(&id).copied().unwrap_or(10)
    }

    pub fn set_base_attribute(&mut self, id: AttributeId, value: i32) {
        self.attributes.insert(id, value);
    }

    /// Attribute value including bonuses from the last published feature map.
    pub fn attribute_value(&self, id: AttributeId) -> i32 {
        self.base_attribute(id) + self.feature_map.total(&id.feature_key()) as i32
    }

    /// The feature map published by the last completed validation pass.
    pub fn feature_map(&self) -> &FeatureMap {
        &self.feature_map
    }

    /// Replaces the published feature map. Called only by the engine at the
    /// end of a clean pass; the map is rebuilt from scratch, never patched.
    pub fn set_feature_map(&mut self, map: FeatureMap) {
        self.feature_map = map;
    }

    /// All skill rows, including techniques and nested children.
    pub fn skills_iter(&self) -> impl Iterator<Item = &Row> {
        walk(&self.skills)
    }

    pub fn advantages_iter(&self) -> impl Iterator<Item = &Row> {
        walk(&self.advantages)
    }

    pub fn spells_iter(&self) -> impl Iterator<Item = &Row> {
        walk(&self.spells)
    }

    pub fn equipment_iter(&self) -> impl Iterator<Item = &Row> {
        walk(&self.equipment)
    }

    /// Highest-level skill matching the given name and, when non-empty,
    /// specialization. `exclude` keeps a skill from satisfying its own
    /// prerequisite.
    pub fn best_skill_named(
        &self,
        name: &str,
        specialization: &str,
        exclude: Option<RowId>,
    ) -> Option<&Row> {
        let mut best: Option<(&Row, i32)> = None;
        for row in self.skills_iter() {
            if Some(row.id) == exclude || !row.name.eq_ignore_ascii_case(name) {
                continue;
            }
            let level = match &row.kind {
                RowKind::Skill {
                    level,
                    specialization: spec,
                    ..
                } => {
                    if !specialization.is_empty() && !spec.eq_ignore_ascii_case(specialization) {
                        continue;
                    }
                    *level
                }
                RowKind::Technique { level, .. } => *level,
                _ => continue,
            };
            match best {
                Some((_, best_level)) if level <= best_level => {}
                _ => best = Some((row, level)),
            }
        }
        best.map(|(row, _)| row)
    }

    /// Number of distinct colleges among spells with points invested.
    pub fn college_count(&self) -> usize {
        let mut colleges: Vec<String> = Vec::new();
        for row in self.spells_iter() {
            if let RowKind::Spell { points, college } = &row.kind {
                if *points > 0 && !college.is_empty() {
                    let lowered = college.to_lowercase();
                    if !colleges.contains(&lowered) {
                        colleges.push(lowered);
                    }
                }
            }
        }
        colleges.len()
    }

    /// Finds a row anywhere in the four collections.
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.all_rows().find(|row| row.id == id)
    }

    /// Mutable lookup used by the engine to store verdicts.
    pub fn row_mut(&mut self, id: RowId) -> Option<&mut Row> {
        fn find_in(rows: &mut [Row], id: RowId) -> Option<&mut Row> {
            for row in rows {
                if row.id == id {
                    return Some(row);
                }
                if let Some(found) = find_in(&mut row.children, id) {
                    return Some(found);
                }
            }
            None
        }
        find_in(&mut self.advantages, id)
            .or_else(|| find_in(&mut self.skills, id))
            .or_else(|| find_in(&mut self.spells, id))
            .or_else(|| find_in(&mut self.equipment, id))
    }

    /// Every row in validation order: advantages, skills, spells, equipment.
    pub fn all_rows(&self) -> impl Iterator<Item = &Row> {
        self.advantages_iter()
            .chain(self.skills_iter())
            .chain(self.spells_iter())
            .chain(self.equipment_iter())
    }
}
