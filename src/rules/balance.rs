use super::{classrooms_where, Evaluate, StudentValue};
use crate::catalog::AttributeId;
use crate::configuration::Configuration;
use crate::util::{difference_to_goal, level_difference, same_direction};
use crate::{ClassroomIndex, Student};

/// Spread the students having an attribute evenly over the classrooms hosting the attribute.
///
/// The goal per hosting classroom is the attribute's population divided by the number of
/// classrooms hosting it. Without attributes, the classroom sizes are balanced over all
/// classrooms.
#[derive(Debug, Clone)]
pub struct BalanceCount {
    attributes: Vec<AttributeId>,
}

impl BalanceCount {
    pub fn new(attributes: Vec<AttributeId>) -> Self {
        BalanceCount { attributes }
    }

    /// The balanced quantities: each rule attribute, or the classroom size if there is none
    fn targets(&self) -> Vec<Option<AttributeId>> {
        if self.attributes.is_empty() {
            vec![None]
        } else {
            self.attributes.iter().copied().map(Some).collect()
        }
    }

    fn count(
        configuration: &Configuration,
        classroom: ClassroomIndex,
        target: Option<AttributeId>,
    ) -> usize {
        let classroom = configuration.classroom(classroom);
        match target {
            Some(a) => classroom.count(a),
            None => classroom.len(),
        }
    }

    /// Get the ideal count per hosting classroom
    pub fn goal(&self, configuration: &Configuration, target: Option<AttributeId>) -> f64 {
        let problem = configuration.problem();
        match target {
            Some(a) => {
                let hosting = configuration
                    .classrooms()
                    .iter()
                    .filter(|c| c.count(a) > 0)
                    .count();
                problem.catalog.count(a) as f64 / hosting.max(1) as f64
            }
            None => problem.students.len() as f64 / configuration.len().max(1) as f64,
        }
    }
}

impl Evaluate for BalanceCount {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        let mut value = 0.0;
        for target in self.targets() {
            let goal = self.goal(configuration, target);
            for c in 0..configuration.len() {
                let count = Self::count(configuration, c, target);
                // Classrooms without the attribute are not considered
                if count == 0 && target.is_some() {
                    continue;
                }
                value += difference_to_goal(count as f64, goal).abs();
            }
        }
        value
    }

    /// The student is blamed for the excess of each of its attributes in its classroom. Classrooms
    /// which would exceed the goal by receiving the student are unsuitable.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        let origin = configuration.classroom_of(student.index);
        let mut result = StudentValue::satisfied();
        for target in self.targets() {
            if let Some(a) = target {
                if !student.has_attribute(a) {
                    continue;
                }
            }
            let goal = self.goal(configuration, target);
            let diff = difference_to_goal(Self::count(configuration, origin, target) as f64, goal);
            if diff > 0.0 {
                result.value += diff;
            }
            result.unsuitable.extend(classrooms_where(configuration, |c| {
                c != origin
                    && difference_to_goal(Self::count(configuration, c, target) as f64 + 1.0, goal)
                        > 0.0
            }));
        }
        result
    }

    fn attributes(&self) -> &[AttributeId] {
        &self.attributes
    }
}

/// Balance the average level of an option in every classroom hosting the option.
///
/// The goal is the middle of the level range, with an accepted deviation of
/// `util::LEVEL_ACCURACY`.
#[derive(Debug, Clone)]
pub struct BalanceLevel {
    attributes: Vec<AttributeId>,
}

impl BalanceLevel {
    pub fn new(attributes: Vec<AttributeId>) -> Self {
        BalanceLevel { attributes }
    }

    /// Deviation of the classroom's average level from the accepted range (0 if the classroom
    /// does not host the attribute).
    fn classroom_difference(
        configuration: &Configuration,
        classroom: ClassroomIndex,
        attribute: AttributeId,
    ) -> f64 {
        configuration
            .classroom(classroom)
            .average_level(attribute)
            .map(level_difference)
            .unwrap_or(0.0)
    }
}

impl Evaluate for BalanceLevel {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        self.attributes
            .iter()
            .map(|a| {
                (0..configuration.len())
                    .map(|c| Self::classroom_difference(configuration, c, *a).abs())
                    .sum::<f64>()
            })
            .sum()
    }

    /// The student is only blamed if the own level pushes the classroom's average further into
    /// the direction it already deviates to. Unsuitable classrooms are those where the student
    /// would do so.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        let origin = configuration.classroom_of(student.index);
        let mut result = StudentValue::satisfied();
        for attribute in self.attributes.iter() {
            let level = match student.level(*attribute) {
                Some(l) => l,
                None => continue,
            };
            let student_diff = level_difference(level as f64);
            let class_diff = Self::classroom_difference(configuration, origin, *attribute);
            if same_direction(student_diff, class_diff) {
                result.value += student_diff.abs();
            }
            result.unsuitable.extend(classrooms_where(configuration, |c| {
                c != origin
                    && same_direction(
                        student_diff,
                        Self::classroom_difference(configuration, c, *attribute),
                    )
            }));
        }
        result
    }

    fn attributes(&self) -> &[AttributeId] {
        &self.attributes
    }

    fn uses_levels(&self) -> bool {
        true
    }
}

/// Equalize the counts of several attributes inside every classroom, e.g. for gender parity.
///
/// The goal of each attribute in a classroom is the average count of the rule's attributes in that
/// classroom. Classrooms without any of the attributes are not considered.
#[derive(Debug, Clone)]
pub struct BalanceClassCounts {
    attributes: Vec<AttributeId>,
}

impl BalanceClassCounts {
    pub fn new(attributes: Vec<AttributeId>) -> Self {
        BalanceClassCounts { attributes }
    }

    fn total(&self, configuration: &Configuration, classroom: ClassroomIndex) -> usize {
        let classroom = configuration.classroom(classroom);
        self.attributes.iter().map(|a| classroom.count(*a)).sum()
    }

    fn goal(&self, configuration: &Configuration, classroom: ClassroomIndex) -> f64 {
        self.total(configuration, classroom) as f64 / self.attributes.len() as f64
    }
}

impl Evaluate for BalanceClassCounts {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        let mut value = 0.0;
        for c in 0..configuration.len() {
            if self.total(configuration, c) == 0 {
                continue;
            }
            let goal = self.goal(configuration, c);
            let classroom = configuration.classroom(c);
            value += self
                .attributes
                .iter()
                .map(|a| difference_to_goal(classroom.count(*a) as f64, goal).abs())
                .sum::<f64>();
        }
        value
    }

    /// The student is blamed for each over-represented attribute of its own in its classroom.
    /// Unsuitable are the classrooms in which one of the student's attributes would become
    /// over-represented.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        let origin = configuration.classroom_of(student.index);
        let own: Vec<AttributeId> = self
            .attributes
            .iter()
            .copied()
            .filter(|a| student.has_attribute(*a))
            .collect();
        if own.is_empty() {
            return StudentValue::satisfied();
        }

        let goal = self.goal(configuration, origin);
        let classroom = configuration.classroom(origin);
        let value = own
            .iter()
            .map(|a| difference_to_goal(classroom.count(*a) as f64, goal).max(0.0))
            .sum();

        let unsuitable = classrooms_where(configuration, |c| {
            if c == origin {
                return false;
            }
            let classroom = configuration.classroom(c);
            let goal = (self.total(configuration, c) + own.len()) as f64
                / self.attributes.len() as f64;
            own.iter()
                .any(|a| difference_to_goal(classroom.count(*a) as f64 + 1.0, goal) > 0.0)
        });
        StudentValue::new(value, unsuitable)
    }

    fn attributes(&self) -> &[AttributeId] {
        &self.attributes
    }
}
