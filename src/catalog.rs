//! The attribute catalog: the enumerable set of student traits the rules are working on.
//!
//! The catalog is built once from the attribute selections of all rules and the student records.
//! Only attributes referenced by any rule are part of it; all other student data (e.g. levels of
//! options no rule cares about) are ignored by the optimization.

use crate::input::{RawAttributes, RawStudent};
use crate::{InputError, StudentIndex, MAX_LEVEL};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Index of an attribute in the `Catalog`
pub type AttributeId = usize;

/// Identity of an attribute: its kind and discriminator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKey {
    /// The student has chosen the option (with any level)
    Option(String),
    /// The student has chosen the option with exactly this level
    Level(String, i32),
    Gender(String),
    /// The student has the boolean extra set to `true`
    Extra(String),
    /// The student is involved in any relationship (as origin or as target)
    Relationship,
}

impl AttributeKey {
    /// Expand a rule's attribute selection into attribute keys, in a stable order.
    pub fn from_selection(selection: &RawAttributes) -> Vec<AttributeKey> {
        let mut keys = Vec::new();
        keys.extend(selection.options.iter().cloned().map(AttributeKey::Option));
        for (option, levels) in selection.levels.iter() {
            keys.extend(
                levels
                    .iter()
                    .map(|level| AttributeKey::Level(option.clone(), *level)),
            );
        }
        keys.extend(selection.genders.iter().cloned().map(AttributeKey::Gender));
        keys.extend(selection.extras.iter().cloned().map(AttributeKey::Extra));
        let mut seen = HashSet::new();
        keys.retain(|k| seen.insert(k.clone()));
        keys
    }

    /// Get the level of a student for this attribute, if the student has the attribute.
    ///
    /// Options and specific levels yield the student's level in that option, all other kinds are
    /// synthetic attributes at `MAX_LEVEL`. `Relationship` can not be decided from a single record
    /// and is handled by `Catalog::build()`.
    fn level_of(&self, student: &RawStudent) -> Option<i32> {
        match self {
            AttributeKey::Option(option) => student.levels.get(option).copied(),
            AttributeKey::Level(option, level) => student
                .levels
                .get(option)
                .filter(|l| *l == level)
                .copied(),
            AttributeKey::Gender(gender) => {
                if student.gender == *gender {
                    Some(MAX_LEVEL)
                } else {
                    None
                }
            }
            AttributeKey::Extra(extra) => match student.extras.get(extra) {
                Some(true) => Some(MAX_LEVEL),
                _ => None,
            },
            AttributeKey::Relationship => None,
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKey::Option(option) => write!(f, "{}", option),
            AttributeKey::Level(option, level) => write!(f, "{}={}", option, level),
            AttributeKey::Gender(gender) => write!(f, "{}", gender),
            AttributeKey::Extra(extra) => write!(f, "+{}", extra),
            AttributeKey::Relationship => write!(f, "related"),
        }
    }
}

/// A catalog entry: the attribute's identity and the students possessing it
#[derive(Debug, Clone)]
pub struct Attribute {
    pub key: AttributeKey,
    /// Indexes of the students having this attribute, in ascending order
    students: Vec<StudentIndex>,
    /// Level of each student in `students` (same order)
    levels: Vec<i32>,
}

impl Attribute {
    /// Total population count of the attribute
    pub fn count(&self) -> usize {
        self.students.len()
    }

    pub fn students(&self) -> &[StudentIndex] {
        &self.students
    }
}

/// The immutable set of attributes referenced by the rules of one run
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    attributes: Vec<Attribute>,
    index: HashMap<AttributeKey, AttributeId>,
}

impl Catalog {
    /// Build the catalog from the attribute keys referenced by the rules and the student records.
    ///
    /// `ids` maps student ids to student indexes; it is used to resolve relationship targets.
    ///
    /// # Errors
    ///
    /// Fails with `InputError::UnknownAttribute` if a referenced attribute is not possessed by any
    /// student, since it most probably is a typo in the rule definition.
    pub fn build<I>(
        keys: I,
        students: &[RawStudent],
        ids: &HashMap<String, StudentIndex>,
    ) -> Result<Catalog, InputError>
    where
        I: IntoIterator<Item = AttributeKey>,
    {
        let mut catalog = Catalog::default();
        let mut related: Option<HashSet<StudentIndex>> = None;

        for key in keys {
            if catalog.index.contains_key(&key) {
                continue;
            }
            let (members, levels): (Vec<StudentIndex>, Vec<i32>) = if key
                == AttributeKey::Relationship
            {
                let related =
                    related.get_or_insert_with(|| related_students(students, ids));
                let mut members: Vec<StudentIndex> = related.iter().copied().collect();
                members.sort_unstable();
                let levels = vec![MAX_LEVEL; members.len()];
                (members, levels)
            } else {
                students
                    .iter()
                    .enumerate()
                    .filter_map(|(i, s)| key.level_of(s).map(|level| (i, level)))
                    .unzip()
            };

            // The relationship tag may legitimately be empty (rules without any relationship to
            // consider are simply satisfied).
            if members.is_empty() && key != AttributeKey::Relationship {
                return Err(InputError::UnknownAttribute(key.to_string()));
            }

            catalog.index.insert(key.clone(), catalog.attributes.len());
            catalog.attributes.push(Attribute {
                key,
                students: members,
                levels,
            });
        }

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, attribute: AttributeId) -> &Attribute {
        &self.attributes[attribute]
    }

    pub fn lookup(&self, key: &AttributeKey) -> Option<AttributeId> {
        self.index.get(key).copied()
    }

    /// Total population count of an attribute
    pub fn count(&self, attribute: AttributeId) -> usize {
        self.attributes[attribute].count()
    }

    /// Students possessing an attribute
    pub fn students_with(&self, attribute: AttributeId) -> &[StudentIndex] {
        self.attributes[attribute].students()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeId, &Attribute)> {
        self.attributes.iter().enumerate()
    }

    /// Collect the attributes (with levels) of one student, ordered by attribute id.
    pub(crate) fn attributes_of(&self, student: StudentIndex) -> Vec<(AttributeId, i32)> {
        self.attributes
            .iter()
            .enumerate()
            .filter_map(|(id, a)| {
                a.students
                    .binary_search(&student)
                    .ok()
                    .map(|pos| (id, a.levels[pos]))
            })
            .collect()
    }
}

/// Find all students taking part in a relationship, either by declaring it or by being its target.
fn related_students(
    students: &[RawStudent],
    ids: &HashMap<String, StudentIndex>,
) -> HashSet<StudentIndex> {
    let mut result = HashSet::new();
    for (i, s) in students.iter().enumerate() {
        for (other, weight) in s.relationships.iter() {
            if *weight == 0 {
                continue;
            }
            result.insert(i);
            if let Some(j) = ids.get(other) {
                result.insert(*j);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{AttributeKey, Catalog};
    use crate::input::{RawAttributes, RawStudent};
    use crate::{InputError, MAX_LEVEL};
    use std::collections::HashMap;

    fn students() -> Vec<RawStudent> {
        let mut anna = RawStudent {
            id: "anna".into(),
            gender: "F".into(),
            ..Default::default()
        };
        anna.levels.insert("german".into(), 3);
        anna.extras.insert("bus".into(), true);
        anna.relationships.insert("carl".into(), -2);
        let mut bert = RawStudent {
            id: "bert".into(),
            gender: "M".into(),
            ..Default::default()
        };
        bert.levels.insert("german".into(), 1);
        bert.extras.insert("bus".into(), false);
        let carl = RawStudent {
            id: "carl".into(),
            gender: "M".into(),
            ..Default::default()
        };
        vec![anna, bert, carl]
    }

    fn ids(students: &[RawStudent]) -> HashMap<String, usize> {
        students
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect()
    }

    #[test]
    fn expand_selection() {
        let mut selection = RawAttributes::default();
        selection.options.push("german".into());
        selection.levels.insert("latin".into(), vec![2, 3]);
        selection.genders.push("F".into());
        selection.extras.push("bus".into());
        assert_eq!(
            AttributeKey::from_selection(&selection),
            vec![
                AttributeKey::Option("german".into()),
                AttributeKey::Level("latin".into(), 2),
                AttributeKey::Level("latin".into(), 3),
                AttributeKey::Gender("F".into()),
                AttributeKey::Extra("bus".into()),
            ]
        );
    }

    #[test]
    fn build_catalog() {
        let students = students();
        let catalog = Catalog::build(
            vec![
                AttributeKey::Option("german".into()),
                AttributeKey::Level("german".into(), 1),
                AttributeKey::Gender("M".into()),
                AttributeKey::Extra("bus".into()),
                AttributeKey::Relationship,
                AttributeKey::Gender("M".into()),
            ],
            &students,
            &ids(&students),
        )
        .unwrap();

        assert_eq!(catalog.len(), 5);
        let german = catalog
            .lookup(&AttributeKey::Option("german".into()))
            .unwrap();
        assert_eq!(catalog.count(german), 2);
        assert_eq!(catalog.students_with(german), &[0, 1]);
        let male = catalog.lookup(&AttributeKey::Gender("M".into())).unwrap();
        assert_eq!(catalog.students_with(male), &[1, 2]);
        let bus = catalog.lookup(&AttributeKey::Extra("bus".into())).unwrap();
        assert_eq!(catalog.students_with(bus), &[0]);
        let related = catalog.lookup(&AttributeKey::Relationship).unwrap();
        assert_eq!(catalog.students_with(related), &[0, 2]);

        assert_eq!(
            catalog.attributes_of(0),
            vec![(german, 3), (bus, MAX_LEVEL), (related, MAX_LEVEL)]
        );
        assert_eq!(catalog.attributes_of(1), vec![(german, 1), (1, 1), (male, MAX_LEVEL)]);
    }

    #[test]
    fn unknown_attribute() {
        let students = students();
        let result = Catalog::build(
            vec![AttributeKey::Option("greek".into())],
            &students,
            &ids(&students),
        );
        match result {
            Err(InputError::UnknownAttribute(name)) => assert_eq!(name, "greek"),
            x => panic!("Expected UnknownAttribute error, got {:?}", x),
        }
    }
}
