pub mod catalog;
pub mod classroom;
pub mod configuration;
pub mod input;
pub mod io;
pub mod optimizer;
pub mod rules;
pub mod util;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use catalog::{AttributeId, AttributeKey, Catalog};
use input::{RawConstraints, RawInput, RawStudent};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use rules::{Requirement, Rule, RuleKind};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Lowest level of a student in an option
pub const MIN_LEVEL: i32 = 0;
/// Highest level of a student in an option. Synthetic attributes (gender, extras) are at this
/// level.
pub const MAX_LEVEL: i32 = 5;
/// Priority of rules without explicit priority
pub const DEFAULT_PRIORITY: f64 = 1.0;

/// Index of a Student in the `Problem`'s list of students
pub type StudentIndex = usize;
/// Index of a Classroom in a `Configuration`
pub type ClassroomIndex = usize;

/// Representation of a student's data
#[derive(Debug, Clone)]
pub struct Student {
    /// id/index of the Student in the list of students
    pub index: StudentIndex,
    /// The student's unique id from the input data
    pub id: String,
    pub gender: String,
    /// Catalog attributes of the student with the student's level in each of them, ordered by
    /// attribute id
    attributes: Vec<(AttributeId, i32)>,
    /// Related students by signed relationship weight (positive = wants together, negative =
    /// wants apart)
    relationships: BTreeMap<i32, Vec<StudentIndex>>,
}

impl Student {
    /// Ids of the catalog attributes, the student possesses
    pub fn attributes(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.attributes.iter().map(|(a, _)| *a)
    }

    pub fn has_attribute(&self, attribute: AttributeId) -> bool {
        self.level(attribute).is_some()
    }

    /// The student's level for an attribute, if the student has the attribute.
    pub fn level(&self, attribute: AttributeId) -> Option<i32> {
        self.attributes
            .binary_search_by_key(&attribute, |(a, _)| *a)
            .ok()
            .map(|pos| self.attributes[pos].1)
    }

    pub fn relationships(&self) -> &BTreeMap<i32, Vec<StudentIndex>> {
        &self.relationships
    }
}

/// Size limits for the classrooms
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    /// Maximum number of students per classroom
    pub class_size: usize,
    /// Maximum number of classrooms
    pub max_classes: usize,
    /// Minimum number of classrooms
    pub min_classes: usize,
}

impl Constraints {
    fn from_raw(raw: &RawConstraints) -> Result<Self, InputError> {
        let min_classes = raw.min_classes.unwrap_or(1).max(1);
        if raw.class_size == 0 {
            return Err(InputError::InvalidConstraints(
                "class_size must be greater than 0".to_owned(),
            ));
        }
        if raw.max_classes == 0 {
            return Err(InputError::InvalidConstraints(
                "max_classes must be greater than 0".to_owned(),
            ));
        }
        if min_classes > raw.max_classes {
            return Err(InputError::InvalidConstraints(format!(
                "min_classes ({}) is greater than max_classes ({})",
                min_classes, raw.max_classes
            )));
        }
        Ok(Constraints {
            class_size: raw.class_size,
            max_classes: raw.max_classes,
            min_classes,
        })
    }

    /// Number of classrooms of the initial configuration
    pub fn initial_classes(&self, num_students: usize) -> usize {
        num_students.div_ceil(self.class_size).max(self.min_classes)
    }
}

/// Fatal errors in the input data, detected while building the `Problem`
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("Duplicate student id '{0}'")]
    DuplicateStudent(String),
    #[error("Unknown student '{reference}' referenced by {student}")]
    UnknownStudent { student: String, reference: String },
    #[error("Rule '{0}' requires attributes")]
    MissingAttributes(&'static str),
    #[error("Rule '{0}' requires a list of at least two students")]
    MissingStudents(&'static str),
    #[error("Attribute '{0}' is referenced by a rule but no student has it")]
    UnknownAttribute(String),
    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),
    #[error("Rules '{0}' and '{1}' can not be used together")]
    ConflictingRules(&'static str, &'static str),
    #[error("{students} students do not fit into the available {capacity} places")]
    Infeasible { students: usize, capacity: usize },
}

/// The complete, immutable definition of one optimization run: the students, the attribute
/// catalog, the rules in processing order and the classroom constraints.
///
/// It is built once from the raw input and shared (via `Arc`) by all configurations.
#[derive(Debug)]
pub struct Problem {
    pub students: Vec<Student>,
    pub catalog: Catalog,
    /// Rules, ordered by structural tier and (descending) priority
    pub rules: Vec<Rule>,
    pub constraints: Constraints,
}

impl Problem {
    /// Validate and interpret the raw input data.
    ///
    /// Unknown rule kinds are skipped with a warning. All other inconsistencies of the input are
    /// reported as `InputError`.
    pub fn new(input: RawInput) -> Result<Problem, InputError> {
        let RawInput {
            constraints,
            rules: raw_rules,
            students: raw_students,
        } = input;
        let constraints = Constraints::from_raw(&constraints)?;
        // An overflowing capacity is sufficient for any number of students
        if let Some(capacity) = constraints.class_size.checked_mul(constraints.max_classes) {
            if raw_students.len() > capacity {
                return Err(InputError::Infeasible {
                    students: raw_students.len(),
                    capacity,
                });
            }
        }

        let mut ids = HashMap::new();
        for (i, s) in raw_students.iter().enumerate() {
            if ids.insert(s.id.clone(), i).is_some() {
                return Err(InputError::DuplicateStudent(s.id.clone()));
            }
        }

        // Check rule definitions and collect the attributes to put into the catalog
        let mut definitions = Vec::new();
        let mut keys = Vec::new();
        for raw_rule in raw_rules.iter() {
            let info = match RuleKind::from_key(&raw_rule.rule) {
                Some(info) => info,
                None => {
                    warn!("Ignoring rule of unknown kind '{}'.", raw_rule.rule);
                    continue;
                }
            };
            let rule_keys = match info.attributes {
                Requirement::Unused => {
                    if raw_rule.attributes.is_some() {
                        warn!("Ignoring attributes of rule '{}'.", info.key);
                    }
                    Vec::new()
                }
                Requirement::Optional | Requirement::Required(_) => raw_rule
                    .attributes
                    .as_ref()
                    .map(AttributeKey::from_selection)
                    .unwrap_or_default(),
            };
            if let Requirement::Required(n) = info.attributes {
                if rule_keys.len() < n {
                    return Err(InputError::MissingAttributes(info.key));
                }
            }
            let rule_students = match info.students {
                Requirement::Unused => {
                    if raw_rule.students.is_some() {
                        warn!("Ignoring students of rule '{}'.", info.key);
                    }
                    None
                }
                Requirement::Optional | Requirement::Required(_) => {
                    resolve_students(info.key, raw_rule.students.as_deref(), &ids)?
                }
            };
            if let Requirement::Required(n) = info.students {
                if rule_students.as_ref().map_or(true, |s| s.len() < n) {
                    return Err(InputError::MissingStudents(info.key));
                }
            }
            if info.kind.uses_relationships() {
                keys.push(AttributeKey::Relationship);
            }
            keys.extend(rule_keys.iter().cloned());
            definitions.push((info, raw_rule.priority, rule_keys, rule_students));
        }
        check_conflicts(&definitions)?;

        let catalog = catalog::Catalog::build(keys, &raw_students, &ids)?;
        let students = raw_students
            .iter()
            .enumerate()
            .map(|(i, s)| build_student(i, s, &catalog, &ids))
            .collect::<Result<Vec<Student>, InputError>>()?;

        let mut rules: Vec<Rule> = definitions
            .into_iter()
            .map(|(info, priority, rule_keys, rule_students)| {
                let attributes = rule_keys
                    .iter()
                    .filter_map(|k| catalog.lookup(k))
                    .collect();
                Rule::new(
                    info.kind,
                    priority.unwrap_or(DEFAULT_PRIORITY),
                    attributes,
                    rule_students,
                    &catalog,
                )
            })
            .collect();
        rules.sort_by_key(|r| (r.kind().tier(), std::cmp::Reverse(OrderedFloat(r.priority()))));
        debug!(
            "Rules in processing order: {:?}",
            rules.iter().map(|r| r.kind().key()).collect::<Vec<_>>()
        );

        Ok(Problem {
            students,
            catalog,
            rules,
            constraints,
        })
    }

    pub fn student(&self, index: StudentIndex) -> &Student {
        &self.students[index]
    }
}

fn resolve_students(
    rule_key: &'static str,
    students: Option<&[String]>,
    ids: &HashMap<String, StudentIndex>,
) -> Result<Option<Vec<StudentIndex>>, InputError> {
    let students = match students {
        Some(s) => s,
        None => return Ok(None),
    };
    let mut result = Vec::with_capacity(students.len());
    for id in students {
        let index = ids.get(id).ok_or_else(|| InputError::UnknownStudent {
            student: id.clone(),
            reference: format!("rule '{}'", rule_key),
        })?;
        if !result.contains(index) {
            result.push(*index);
        }
    }
    Ok(Some(result))
}

type RuleDefinition = (
    &'static rules::RuleKindInfo,
    Option<f64>,
    Vec<AttributeKey>,
    Option<Vec<StudentIndex>>,
);

/// Reject rule sets with rule kinds that contradict each other by definition.
fn check_conflicts(definitions: &[RuleDefinition]) -> Result<(), InputError> {
    let has = |kind: RuleKind| definitions.iter().any(|(info, ..)| info.kind == kind);
    if has(RuleKind::MaximizeClassSize) && has(RuleKind::MaximizeClasses) {
        return Err(InputError::ConflictingRules(
            RuleKind::MaximizeClassSize.key(),
            RuleKind::MaximizeClasses.key(),
        ));
    }
    Ok(())
}

fn build_student(
    index: StudentIndex,
    raw: &RawStudent,
    catalog: &Catalog,
    ids: &HashMap<String, StudentIndex>,
) -> Result<Student, InputError> {
    let mut relationships: BTreeMap<i32, Vec<StudentIndex>> = BTreeMap::new();
    for (other, weight) in raw.relationships.iter() {
        let other_index = *ids.get(other).ok_or_else(|| InputError::UnknownStudent {
            student: raw.id.clone(),
            reference: other.clone(),
        })?;
        if *weight == 0 {
            continue;
        }
        if other_index == index {
            warn!("Ignoring relationship of student '{}' to itself.", raw.id);
            continue;
        }
        relationships.entry(*weight).or_default().push(other_index);
    }

    Ok(Student {
        index,
        id: raw.id.clone(),
        gender: raw.gender.clone(),
        attributes: catalog.attributes_of(index),
        relationships,
    })
}

/// Testing helper function to check the consistency of a configuration: Every student must be
/// placed in exactly one classroom, the placement index must match the classroom memberships and
/// all attribute counts of all classrooms must match the actual members.
#[cfg(test)]
pub(crate) fn assert_configuration_consistency(config: &configuration::Configuration) {
    let problem = config.problem();
    let mut seen = vec![0usize; problem.students.len()];
    for (c, classroom) in config.classrooms().iter().enumerate() {
        for s in classroom.students() {
            seen[*s] += 1;
            assert_eq!(
                config.classroom_of(*s),
                c,
                "Student {} is member of classroom {}, but placed in {}",
                s,
                c,
                config.classroom_of(*s)
            );
        }
        for (a, _attribute) in problem.catalog.iter() {
            let expected = classroom
                .students()
                .iter()
                .filter(|s| problem.students[**s].has_attribute(a))
                .count();
            assert_eq!(
                classroom.count(a),
                expected,
                "Wrong count of attribute {} in classroom {}",
                a,
                c
            );
        }
    }
    for (s, n) in seen.iter().enumerate() {
        assert_eq!(*n, 1, "Student {} is placed {} times", s, n);
    }
}
