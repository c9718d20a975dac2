use super::{classrooms_where, Evaluate, StudentValue};
use crate::catalog::AttributeId;
use crate::configuration::Configuration;
use crate::{ClassroomIndex, Student};

/// Gather the students having an attribute in as few classrooms as possible.
///
/// For every attribute, the minimum number of classrooms needed to hold all of its students is
/// `ceil(count / class_size)`. These are the classrooms with the most occurrences of the
/// attribute; all other classrooms are "excluded" and each occurrence in them is a misplacement.
///
/// With full classrooms, the search can stall above zero: moving a misplaced student evicts
/// another one, which at best leaves the value unchanged.
#[derive(Debug, Clone)]
pub struct GatherAttributes {
    attributes: Vec<AttributeId>,
}

impl GatherAttributes {
    pub fn new(attributes: Vec<AttributeId>) -> Self {
        GatherAttributes { attributes }
    }

    /// Get the classrooms which should not contain the attribute, together with the number of
    /// their members having it.
    pub fn excluded_classrooms(
        &self,
        configuration: &Configuration,
        attribute: AttributeId,
    ) -> Vec<(ClassroomIndex, usize)> {
        let problem = configuration.problem();
        let needed = problem
            .catalog
            .count(attribute)
            .div_ceil(problem.constraints.class_size);

        let mut counts: Vec<(ClassroomIndex, usize)> = configuration
            .classrooms()
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.count(attribute)))
            .collect();
        counts.sort_by_key(|(_, n)| *n);
        let keep = needed.min(counts.len());
        counts.truncate(counts.len() - keep);
        counts
    }
}

impl Evaluate for GatherAttributes {
    fn entry_value(&self, configuration: &Configuration) -> f64 {
        self.attributes
            .iter()
            .map(|a| {
                self.excluded_classrooms(configuration, *a)
                    .iter()
                    .map(|(_, n)| *n)
                    .sum::<usize>()
            })
            .sum::<usize>() as f64
    }

    /// A student having the attribute is misplaced in an excluded classroom. The fewer fellows
    /// the student has there, the worse: being the lone holdout is rated with almost a full
    /// classroom. Excluded classrooms are unsuitable for such a student.
    ///
    /// A student without any of the attributes is rated with the number of occurrences in the
    /// own classroom if that is a gathering classroom, which are unsuitable in turn.
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        let class_size = configuration.problem().constraints.class_size;
        let origin = configuration.classroom_of(student.index);
        let holder = self.attributes.iter().any(|a| student.has_attribute(*a));

        let mut result = StudentValue::satisfied();
        for attribute in self.attributes.iter() {
            let excluded = self.excluded_classrooms(configuration, *attribute);
            if student.has_attribute(*attribute) {
                if let Some((_, n)) = excluded.iter().find(|(c, _)| *c == origin) {
                    result.value += class_size.saturating_sub(*n).max(1) as f64;
                }
                result.unsuitable.extend(excluded.iter().map(|(c, _)| *c));
            } else if !holder {
                let is_excluded = |c: ClassroomIndex| excluded.iter().any(|(e, _)| *e == c);
                if !is_excluded(origin) {
                    result.value += configuration.classroom(origin).count(*attribute) as f64;
                }
                result
                    .unsuitable
                    .extend(classrooms_where(configuration, |c| !is_excluded(c)));
            }
        }
        result
    }

    fn attributes(&self) -> &[AttributeId] {
        &self.attributes
    }
}
