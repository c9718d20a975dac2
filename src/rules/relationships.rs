use super::{classrooms_where, Evaluate, StudentValue};
use crate::catalog::AttributeId;
use crate::configuration::Configuration;
use crate::{ClassroomIndex, Student, StudentIndex};

/// Restriction of a relationship rule to the declarations of some students
#[derive(Debug, Clone)]
struct Scope(Option<Vec<StudentIndex>>);

impl Scope {
    fn contains(&self, student: StudentIndex) -> bool {
        self.0.as_ref().map_or(true, |s| s.contains(&student))
    }
}

/// Partners of the student with positive (`positive == true`) or negative relationship weights
fn partners(student: &Student, positive: bool) -> impl Iterator<Item = (i32, StudentIndex)> + '_ {
    student
        .relationships()
        .iter()
        .filter(move |(weight, _)| (**weight > 0) == positive)
        .flat_map(|(weight, others)| others.iter().map(move |o| (*weight, *o)))
}

fn sum_over_scope<F>(configuration: &Configuration, scope: &Scope, f: F) -> f64
where
    F: Fn(&Student) -> f64,
{
    configuration
        .problem()
        .students
        .iter()
        .filter(|s| scope.contains(s.index))
        .map(f)
        .sum()
}

/// Place students together with the students they want to be with.
///
/// Each unmet relationship of a student counts with its weight.
#[derive(Debug, Clone)]
pub struct PositiveRelationships {
    related: Option<AttributeId>,
    scope: Scope,
}

impl PositiveRelationships {
    pub fn new(related: Option<AttributeId>, students: Option<Vec<StudentIndex>>) -> Self {
        PositiveRelationships {
            related,
            scope: Scope(students),
        }
    }

    fn unmet(&self, configuration: &Configuration, student: &Student) -> f64 {
        let origin = configuration.classroom_of(student.index);
        partners(student, true)
            .filter(|(_, other)| configuration.classroom_of(*other) != origin)
            .map(|(weight, _)| weight as f64)
            .sum()
    }
}

impl Evaluate for PositiveRelationships {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        sum_over_scope(configuration, &self.scope, |s| self.unmet(configuration, s))
    }

    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        if !self.scope.contains(student.index) || partners(student, true).next().is_none() {
            return StudentValue::satisfied();
        }
        let origin = configuration.classroom_of(student.index);
        let hosting: Vec<ClassroomIndex> = partners(student, true)
            .map(|(_, other)| configuration.classroom_of(other))
            .collect();
        StudentValue::new(
            self.unmet(configuration, student),
            classrooms_where(configuration, |c| c != origin && !hosting.contains(&c)),
        )
    }

    fn involves(&self, student: &Student) -> bool {
        self.related.map_or(false, |a| student.has_attribute(a))
    }
}

/// Keep students apart from the students they do not want to be with.
///
/// Each relationship met by sharing a classroom counts with the absolute value of its weight.
#[derive(Debug, Clone)]
pub struct NegativeRelationships {
    related: Option<AttributeId>,
    scope: Scope,
}

impl NegativeRelationships {
    pub fn new(related: Option<AttributeId>, students: Option<Vec<StudentIndex>>) -> Self {
        NegativeRelationships {
            related,
            scope: Scope(students),
        }
    }

    fn met(&self, configuration: &Configuration, student: &Student) -> f64 {
        let origin = configuration.classroom_of(student.index);
        partners(student, false)
            .filter(|(_, other)| configuration.classroom_of(*other) == origin)
            .map(|(weight, _)| weight.abs() as f64)
            .sum()
    }
}

impl Evaluate for NegativeRelationships {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        sum_over_scope(configuration, &self.scope, |s| self.met(configuration, s))
    }

    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        if !self.scope.contains(student.index) {
            return StudentValue::satisfied();
        }
        StudentValue::new(
            self.met(configuration, student),
            partners(student, false)
                .map(|(_, other)| configuration.classroom_of(other))
                .collect(),
        )
    }

    fn involves(&self, student: &Student) -> bool {
        self.related.map_or(false, |a| student.has_attribute(a))
    }
}

/// All listed students shall share one classroom.
#[derive(Debug, Clone)]
pub struct GroupStudents {
    students: Vec<StudentIndex>,
}

impl GroupStudents {
    pub fn new(students: Vec<StudentIndex>) -> Self {
        GroupStudents { students }
    }
}

impl Evaluate for GroupStudents {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        self.students
            .iter()
            .map(|s| self.student_value(configuration, configuration.problem().student(*s)).value)
            .sum()
    }

    /// Rated by the number of group members placed elsewhere. Classrooms without any other member
    /// are unsuitable.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        if !self.students.contains(&student.index) {
            return StudentValue::satisfied();
        }
        let origin = configuration.classroom_of(student.index);
        let others: Vec<ClassroomIndex> = self
            .students
            .iter()
            .filter(|s| **s != student.index)
            .map(|s| configuration.classroom_of(*s))
            .collect();
        let value = others.iter().filter(|c| **c != origin).count() as f64;
        StudentValue::new(
            value,
            classrooms_where(configuration, |c| c != origin && !others.contains(&c)),
        )
    }

    fn involves(&self, student: &Student) -> bool {
        self.students.contains(&student.index)
    }
}

/// All listed students shall be placed in distinct classrooms.
#[derive(Debug, Clone)]
pub struct SeparateStudents {
    students: Vec<StudentIndex>,
}

impl SeparateStudents {
    pub fn new(students: Vec<StudentIndex>) -> Self {
        SeparateStudents { students }
    }
}

impl Evaluate for SeparateStudents {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        self.students
            .iter()
            .map(|s| self.student_value(configuration, configuration.problem().student(*s)).value)
            .sum()
    }

    /// Rated by the number of listed students sharing the classroom. Classrooms hosting any of
    /// them are unsuitable.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        if !self.students.contains(&student.index) {
            return StudentValue::satisfied();
        }
        let origin = configuration.classroom_of(student.index);
        let others: Vec<ClassroomIndex> = self
            .students
            .iter()
            .filter(|s| **s != student.index)
            .map(|s| configuration.classroom_of(*s))
            .collect();
        let value = others.iter().filter(|c| **c == origin).count() as f64;
        StudentValue::new(value, others.into_iter().collect())
    }

    fn involves(&self, student: &Student) -> bool {
        self.students.contains(&student.index)
    }
}
