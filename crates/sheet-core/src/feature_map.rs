//! Aggregation of active features into a key-indexed lookup.
//!
//! [`build_feature_map`] walks all rows of a character and produces the
//! [`FeatureMap`] the prerequisite evaluator and the derived attribute
//! accessors consume. The map is rebuilt from scratch on every validation
//! pass; it is never incrementally patched, so a published map always
//! reflects a single edit generation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::feature::Feature;
use crate::row::{walk, Row, RowKind};

/// One scaled contribution toward a feature key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Effective amount after level scaling.
    pub amount: f64,
    /// Name of the contributing row, for diagnostics and tooltips.
    pub source: String,
}

/// All currently-active features across a character's rows, keyed by the
/// attribute or skill they affect. Keys are case-insensitive: they are
/// lower-cased on insertion and lookup, and later entries append rather
/// than overwrite, so every contribution to a key remains visible for
/// downstream summation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMap {
    buckets: HashMap<String, Vec<Contribution>>,
}

impl FeatureMap {
    fn normalize(key: &str) -> String {
        key.to_lowercase()
    }

    /// Appends a feature scaled by the given level count.
    pub fn add(&mut self, feature: &Feature, levels: i32, source: &str) {
        self.buckets
            .entry(Self::normalize(&feature.key))
            .or_default()
            .push(Contribution {
                amount: feature.amount.scaled(levels),
                source: source.to_string(),
            });
    }

    /// Contributions filed under the given key, in insertion order.
    pub fn get(&self, key: &str) -> &[Contribution] {
        self.buckets
            .get(&Self::normalize(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of all contributions for the key; 0 when absent.
    pub fn total(&self, key: &str) -> f64 {
        self.get(key).iter().map(|c| c.amount).sum()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.buckets.contains_key(&Self::normalize(key))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Builds the feature map for the character's current row collections.
///
/// Pure function of the character: iterates advantages, skills, spells, and
/// equipment in order, applying the gating and scaling rules per kind.
/// Order does not affect correctness since buckets append.
pub fn build_feature_map(character: &Character) -> FeatureMap {
    let mut map = FeatureMap::default();
    collect(&mut map, walk(&character.advantages));
    collect(&mut map, walk(&character.skills));
    collect(&mut map, walk(&character.spells));
    collect(&mut map, walk(&character.equipment));
    map
}

fn collect<'a>(map: &mut FeatureMap, rows: impl Iterator<Item = &'a Row>) {
    for row in rows {
        collect_row(map, row);
    }
}

/// Folds a single row (not its children) into the map. The engine worker
/// uses this directly so it can interleave staleness checks between rows.
pub fn collect_row(map: &mut FeatureMap, row: &Row) {
    if let RowKind::Equipment {
        equipped, quantity, ..
    } = &row.kind
    {
        // Unequipped or absent equipment exerts no rule effect.
        if !*equipped || *quantity < 1 {
            return;
        }
    }

    let levels = row.feature_levels();
    for feature in &row.features {
        map.add(feature, levels, &row.name);
    }

    match &row.kind {
        RowKind::Advantage {
            cr,
            cr_adj,
            modifiers,
            ..
        } => {
            for feature in cr_adj.features(*cr) {
                map.add(&feature, 0, &row.name);
            }
            for modifier in modifiers {
                if modifier.enabled {
                    for feature in &modifier.features {
                        map.add(feature, modifier.levels, &row.name);
                    }
                }
            }
        }
        RowKind::Equipment { modifiers, .. } => {
            for modifier in modifiers {
                if modifier.enabled {
                    for feature in &modifier.features {
                        map.add(feature, 0, &row.name);
                    }
                }
            }
        }
        _ => {}
    }
}
