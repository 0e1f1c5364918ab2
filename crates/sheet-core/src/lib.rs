//! Character data model and rule evaluation for the sheet editor.
//!
//! This crate is the pure, synchronous half of the consistency engine: it
//! knows how to aggregate rule-modifying features into a lookup keyed by the
//! attribute they affect, and how to evaluate every row's prerequisite tree
//! against the character plus that lookup. It performs no I/O and owns no
//! threads; the background scheduling lives in the `engine` crate.
//!
//! Modules are organized by responsibility:
//! - [`character`] hosts the aggregate root and lookup helpers
//! - [`row`] defines the closed row variant and its per-kind payloads
//! - [`feature`] and [`feature_map`] cover bonus contributions and aggregation
//! - [`criteria`] is the comparison vocabulary used by prerequisite leaves
//! - [`prereq`] evaluates prerequisite trees and collects failure reasons
//! - [`eval`] ties the above into per-row verdicts

pub mod character;
pub mod criteria;
pub mod eval;
pub mod feature;
pub mod feature_map;
pub mod prereq;
pub mod row;

pub use character::{AttributeId, Character, CharacterId};
pub use criteria::{NumericCompare, NumericCriteria, StringCompare, StringCriteria};
pub use eval::{apply_verdicts, evaluate_all, evaluate_row, Verdict};
pub use feature::{Feature, LeveledAmount};
pub use feature_map::{build_feature_map, collect_row, Contribution, FeatureMap};
pub use prereq::{Prereq, PrereqContext, PrereqList, SpellPrereqKind};
pub use row::{
    walk, CrAdjustment, DefaultKind, Modifier, Row, RowId, RowKind, SelfControlRoll,
    TechniqueDefault,
};
