//! Raw input records, as handed over by the file readers in `io`.
//!
//! These types are the canonical serde representation of the input data. They are only
//! interpreted (and validated) when building a `Problem` via `Problem::new()`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete input of one optimization run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RawInput {
    pub constraints: RawConstraints,
    #[serde(default)]
    pub rules: Vec<RawRule>,
    pub students: Vec<RawStudent>,
}

/// Size limits of the classrooms to be created
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawConstraints {
    /// Maximum number of students per classroom
    pub class_size: usize,
    /// Maximum number of classrooms
    pub max_classes: usize,
    /// Minimum number of classrooms, defaults to 1
    #[serde(default)]
    pub min_classes: Option<usize>,
}

/// A placement rule record. `rule` is the key of the rule kind (see `rules::RULE_KINDS`).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawRule {
    pub rule: String,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub attributes: Option<RawAttributes>,
    #[serde(default)]
    pub students: Option<Vec<String>>,
}

/// Selection of attributes a rule works on
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawAttributes {
    /// Options chosen by students, regardless of the level
    #[serde(default)]
    pub options: Vec<String>,
    /// Specific levels of an option
    #[serde(default)]
    pub levels: BTreeMap<String, Vec<i32>>,
    #[serde(default)]
    pub genders: Vec<String>,
    /// Names of boolean extras, selecting all students having the extra set to `true`
    #[serde(default)]
    pub extras: Vec<String>,
}

/// A student record
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawStudent {
    pub id: String,
    pub gender: String,
    /// Chosen options with the student's level in each of them
    #[serde(default)]
    pub levels: BTreeMap<String, i32>,
    /// Signed affinity to other students (by id): positive = wants to be together, negative =
    /// wants to be apart. The absolute value is the weight of the relationship.
    #[serde(default)]
    pub relationships: BTreeMap<String, i32>,
    #[serde(default)]
    pub extras: BTreeMap<String, bool>,
}
