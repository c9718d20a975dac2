//! Helpers for building problems in unit tests.

use crate::catalog::AttributeId;
use crate::input::{RawAttributes, RawConstraints, RawInput, RawRule, RawStudent};
use crate::{InputError, Problem, StudentIndex};
use std::sync::Arc;

pub(crate) struct StudentBuilder(RawStudent);

pub(crate) fn raw_student(id: &str, gender: &str) -> StudentBuilder {
    StudentBuilder(RawStudent {
        id: id.to_owned(),
        gender: gender.to_owned(),
        ..Default::default()
    })
}

impl StudentBuilder {
    pub fn level(mut self, option: &str, level: i32) -> Self {
        self.0.levels.insert(option.to_owned(), level);
        self
    }

    pub fn extra(mut self, extra: &str, value: bool) -> Self {
        self.0.extras.insert(extra.to_owned(), value);
        self
    }

    pub fn relationship(mut self, other: &str, weight: i32) -> Self {
        self.0.relationships.insert(other.to_owned(), weight);
        self
    }
}

pub(crate) struct RuleBuilder(RawRule);

impl RuleBuilder {
    fn attributes(&mut self) -> &mut RawAttributes {
        self.0.attributes.get_or_insert_with(RawAttributes::default)
    }

    pub fn option(mut self, option: &str) -> Self {
        self.attributes().options.push(option.to_owned());
        self
    }

    pub fn level(mut self, option: &str, level: i32) -> Self {
        self.attributes()
            .levels
            .entry(option.to_owned())
            .or_default()
            .push(level);
        self
    }

    pub fn gender(mut self, gender: &str) -> Self {
        self.attributes().genders.push(gender.to_owned());
        self
    }

    pub fn extra(mut self, extra: &str) -> Self {
        self.attributes().extras.push(extra.to_owned());
        self
    }

    pub fn priority(mut self, priority: f64) -> Self {
        self.0.priority = Some(priority);
        self
    }

    pub fn students(mut self, students: &[&str]) -> Self {
        self.0.students = Some(students.iter().map(|s| (*s).to_owned()).collect());
        self
    }
}

pub(crate) struct ProblemBuilder(RawInput);

impl ProblemBuilder {
    pub fn new(class_size: usize, max_classes: usize) -> Self {
        ProblemBuilder(RawInput {
            constraints: RawConstraints {
                class_size,
                max_classes,
                min_classes: None,
            },
            rules: Vec::new(),
            students: Vec::new(),
        })
    }

    pub fn min_classes(mut self, min_classes: usize) -> Self {
        self.0.constraints.min_classes = Some(min_classes);
        self
    }

    pub fn student(mut self, student: StudentBuilder) -> Self {
        self.0.students.push(student.0);
        self
    }

    /// Add `n` students without options, with ids `{prefix}{i}` and alternating gender
    pub fn anonymous_students(mut self, prefix: &str, n: usize) -> Self {
        for i in 0..n {
            let gender = if i % 2 == 0 { "F" } else { "M" };
            self.0
                .students
                .push(raw_student(&format!("{}{}", prefix, i), gender).0);
        }
        self
    }

    pub fn rule<F>(mut self, kind: &str, f: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        let rule = f(RuleBuilder(RawRule {
            rule: kind.to_owned(),
            ..Default::default()
        }));
        self.0.rules.push(rule.0);
        self
    }

    pub fn try_build(self) -> Result<Problem, InputError> {
        Problem::new(self.0)
    }

    pub fn build(self) -> Arc<Problem> {
        Arc::new(self.try_build().unwrap())
    }
}

impl Problem {
    /// Find a catalog attribute by its display name (e.g. "german", "german=3", "F", "+bus")
    pub(crate) fn attribute_by_name(&self, name: &str) -> AttributeId {
        self.catalog
            .iter()
            .find(|(_, a)| a.key.to_string() == name)
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("No attribute '{}' in catalog", name))
    }

    pub(crate) fn index_of(&self, id: &str) -> StudentIndex {
        self.students
            .iter()
            .position(|s| s.id == id)
            .unwrap_or_else(|| panic!("No student '{}'", id))
    }
}
