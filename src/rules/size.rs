use super::{classrooms_where, Evaluate, StudentValue};
use crate::configuration::Configuration;
use crate::{ClassroomIndex, Student};
use std::collections::BTreeSet;

/// Use as few classrooms as possible, i.e. fill up the classrooms to the size limit.
///
/// The configuration should consist of the minimum number of classrooms allowed by the size limit
/// and `min_classes`. For each classroom exceeding this number, the smallest classrooms are the
/// ones to be dissolved.
#[derive(Debug, Clone)]
pub struct MaximizeClassSize;

impl MaximizeClassSize {
    /// Get the classrooms which should be dissolved, smallest first
    pub fn surplus_classrooms(configuration: &Configuration) -> Vec<ClassroomIndex> {
        let problem = configuration.problem();
        let minimal = problem
            .constraints
            .initial_classes(problem.students.len());
        let surplus = configuration.len().saturating_sub(minimal);

        let mut classrooms: Vec<ClassroomIndex> = (0..configuration.len()).collect();
        classrooms.sort_by_key(|c| configuration.classroom(*c).len());
        classrooms.truncate(surplus);
        classrooms
    }
}

impl Evaluate for MaximizeClassSize {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        Self::surplus_classrooms(configuration)
            .iter()
            .map(|c| (configuration.classroom(*c).len() + 1) as f64)
            .sum()
    }

    /// Members of a surplus classroom are rated by the free places of their classroom: the
    /// emptier the classroom, the sooner it should be dissolved.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        let class_size = configuration.problem().constraints.class_size;
        let origin = configuration.classroom_of(student.index);
        let surplus = Self::surplus_classrooms(configuration);
        if !surplus.contains(&origin) {
            return StudentValue::satisfied();
        }
        let len = configuration.classroom(origin).len();
        let value = class_size.saturating_add(1).saturating_sub(len).max(1) as f64;
        StudentValue::new(value, surplus.into_iter().collect())
    }
}

/// Use as many classrooms as allowed by `max_classes`.
///
/// As long as classrooms may be added, every student is asked to move into a new classroom, so
/// all existing classrooms are unsuitable.
#[derive(Debug, Clone)]
pub struct MaximizeClasses;

impl Evaluate for MaximizeClasses {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        let max_classes = configuration.problem().constraints.max_classes;
        max_classes.saturating_sub(configuration.len()) as f64
    }

    /// Students of big classrooms are preferred for opening new classrooms. Once the maximum is
    /// reached, students should only move to classrooms which are not bigger than their own.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        let origin = configuration.classroom_of(student.index);
        let len = configuration.classroom(origin).len();
        if self.entry_value(configuration) > 0.0 {
            // A student alone in a classroom can not open another one
            let value = if len > 1 { len as f64 } else { 0.0 };
            let unsuitable: BTreeSet<ClassroomIndex> = (0..configuration.len()).collect();
            StudentValue::new(value, unsuitable)
        } else {
            StudentValue::new(
                0.0,
                classrooms_where(configuration, |c| configuration.classroom(c).len() >= len),
            )
        }
    }
}
