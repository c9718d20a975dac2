use crate::catalog::AttributeId;
use crate::{Student, StudentIndex};
use std::collections::HashMap;

/// A classroom: a bag of students with incrementally maintained attribute statistics.
///
/// For every catalog attribute, the number of members having the attribute and the sum of their
/// levels are kept in sync with the member list. Entries are dropped when they reach zero, so
/// `count()` of an absent attribute is 0.
#[derive(Debug, Clone, Default)]
pub struct Classroom {
    /// Indexes of the members in insertion order
    students: Vec<StudentIndex>,
    counts: HashMap<AttributeId, usize>,
    level_sums: HashMap<AttributeId, i64>,
}

impl Classroom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&mut self, student: &Student) {
        self.students.push(student.index);
        for attribute in student.attributes() {
            *self.counts.entry(attribute).or_insert(0) += 1;
            *self.level_sums.entry(attribute).or_insert(0) +=
                student.level(attribute).unwrap_or(0) as i64;
        }
    }

    /// Remove a member from the classroom.
    ///
    /// # Panics
    ///
    /// Panics if the student is not a member of this classroom.
    pub fn remove_student(&mut self, student: &Student) {
        let position = self
            .students
            .iter()
            .position(|s| *s == student.index)
            .unwrap_or_else(|| {
                panic!(
                    "Student '{}' is not a member of this classroom",
                    student.id
                )
            });
        self.students.remove(position);
        for attribute in student.attributes() {
            let count = self
                .counts
                .get_mut(&attribute)
                .expect("attribute counts out of sync with members");
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&attribute);
                self.level_sums.remove(&attribute);
            } else if let Some(sum) = self.level_sums.get_mut(&attribute) {
                *sum -= student.level(attribute).unwrap_or(0) as i64;
            }
        }
    }

    /// Number of members having the attribute
    pub fn count(&self, attribute: AttributeId) -> usize {
        self.counts.get(&attribute).copied().unwrap_or(0)
    }

    /// Sum of the members' levels in the attribute
    pub fn level_sum(&self, attribute: AttributeId) -> i64 {
        self.level_sums.get(&attribute).copied().unwrap_or(0)
    }

    /// Average level of the members having the attribute, or None if no member has it.
    pub fn average_level(&self, attribute: AttributeId) -> Option<f64> {
        match self.count(attribute) {
            0 => None,
            n => Some(self.level_sum(attribute) as f64 / n as f64),
        }
    }

    pub fn students(&self) -> &[StudentIndex] {
        &self.students
    }

    pub fn contains(&self, student: StudentIndex) -> bool {
        self.students.contains(&student)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Classroom;
    use crate::testing::{raw_student, ProblemBuilder};

    #[test]
    fn add_and_remove() {
        let problem = ProblemBuilder::new(10, 2)
            .student(raw_student("a", "F").level("german", 2))
            .student(raw_student("b", "M").level("german", 4))
            .student(raw_student("c", "M"))
            .rule("gather_attributes", |r| r.option("german").gender("M"))
            .build();
        let german = problem.attribute_by_name("german");
        let male = problem.attribute_by_name("M");

        let mut classroom = Classroom::new();
        for s in problem.students.iter() {
            classroom.add_student(s);
        }
        assert_eq!(classroom.len(), 3);
        assert_eq!(classroom.count(german), 2);
        assert_eq!(classroom.count(male), 2);
        assert_eq!(classroom.level_sum(german), 6);
        assert_eq!(classroom.average_level(german), Some(3.0));

        classroom.remove_student(&problem.students[1]);
        assert_eq!(classroom.students(), &[0, 2]);
        assert_eq!(classroom.count(german), 1);
        assert_eq!(classroom.count(male), 1);
        assert_eq!(classroom.average_level(german), Some(2.0));

        classroom.remove_student(&problem.students[0]);
        assert_eq!(classroom.count(german), 0);
        assert_eq!(classroom.average_level(german), None);
        assert!(!classroom.contains(0));
        assert!(classroom.contains(2));
    }

    #[test]
    #[should_panic(expected = "not a member")]
    fn remove_non_member() {
        let problem = ProblemBuilder::new(10, 2)
            .student(raw_student("a", "F"))
            .student(raw_student("b", "M"))
            .build();
        let mut classroom = Classroom::new();
        classroom.add_student(&problem.students[0]);
        classroom.remove_student(&problem.students[1]);
    }
}
