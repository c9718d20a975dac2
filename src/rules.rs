//! The placement rules.
//!
//! Every rule is a cost function over configurations: `entry_value()` is zero iff the rule is fully
//! satisfied by the configuration, `student_value()` rates the placement of a single student and
//! names the classrooms the student should not be moved into. The optimizer works the rules off in
//! the order given by `Problem::rules`.
//!
//! The set of rule kinds is closed. `RULE_KINDS` maps the input keys to the kinds, their
//! structural tier (attribute grouping first, then constraint and relationship rules, then
//! balancing rules) and the inputs they require.

mod balance;
mod gather;
mod relationships;
mod size;

pub use balance::{BalanceClassCounts, BalanceCount, BalanceLevel};
pub use gather::GatherAttributes;
pub use relationships::{
    GroupStudents, NegativeRelationships, PositiveRelationships, SeparateStudents,
};
pub use size::{MaximizeClassSize, MaximizeClasses};

use crate::catalog::{AttributeId, AttributeKey, Catalog};
use crate::configuration::Configuration;
use crate::{ClassroomIndex, Student, StudentIndex};
use std::collections::BTreeSet;

/// Index of a Rule in the `Problem`'s ordered list of rules
pub type RuleIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    GatherAttributes,
    MaximizeClassSize,
    MaximizeClasses,
    PositiveRelationships,
    NegativeRelationships,
    GroupStudents,
    SeparateStudents,
    BalanceCount,
    BalanceLevel,
    BalanceClassCounts,
}

/// Whether a rule kind needs a certain input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The field is ignored
    Unused,
    Optional,
    /// The field must be given with at least this number of entries
    Required(usize),
}

/// Registry entry of a rule kind
#[derive(Debug)]
pub struct RuleKindInfo {
    /// Key of the rule kind in the input data
    pub key: &'static str,
    pub kind: RuleKind,
    /// Structural priority: rules of lower tiers are processed first
    pub tier: u8,
    pub attributes: Requirement,
    pub students: Requirement,
}

pub static RULE_KINDS: [RuleKindInfo; 10] = [
    RuleKindInfo {
        key: "gather_attributes",
        kind: RuleKind::GatherAttributes,
        tier: 0,
        attributes: Requirement::Required(1),
        students: Requirement::Unused,
    },
    RuleKindInfo {
        key: "maximize_class_size",
        kind: RuleKind::MaximizeClassSize,
        tier: 1,
        attributes: Requirement::Unused,
        students: Requirement::Unused,
    },
    RuleKindInfo {
        key: "maximize_classes",
        kind: RuleKind::MaximizeClasses,
        tier: 1,
        attributes: Requirement::Unused,
        students: Requirement::Unused,
    },
    RuleKindInfo {
        key: "positive_relationships",
        kind: RuleKind::PositiveRelationships,
        tier: 2,
        attributes: Requirement::Unused,
        students: Requirement::Optional,
    },
    RuleKindInfo {
        key: "negative_relationships",
        kind: RuleKind::NegativeRelationships,
        tier: 2,
        attributes: Requirement::Unused,
        students: Requirement::Optional,
    },
    RuleKindInfo {
        key: "group_students",
        kind: RuleKind::GroupStudents,
        tier: 2,
        attributes: Requirement::Unused,
        students: Requirement::Required(2),
    },
    RuleKindInfo {
        key: "separate_students",
        kind: RuleKind::SeparateStudents,
        tier: 2,
        attributes: Requirement::Unused,
        students: Requirement::Required(2),
    },
    RuleKindInfo {
        key: "balance_count",
        kind: RuleKind::BalanceCount,
        tier: 3,
        attributes: Requirement::Optional,
        students: Requirement::Unused,
    },
    RuleKindInfo {
        key: "balance_level",
        kind: RuleKind::BalanceLevel,
        tier: 3,
        attributes: Requirement::Required(1),
        students: Requirement::Unused,
    },
    RuleKindInfo {
        key: "balance_class_counts",
        kind: RuleKind::BalanceClassCounts,
        tier: 3,
        attributes: Requirement::Required(2),
        students: Requirement::Unused,
    },
];

impl RuleKind {
    /// Look up a rule kind by its key in the input data
    pub fn from_key(key: &str) -> Option<&'static RuleKindInfo> {
        RULE_KINDS.iter().find(|info| info.key == key)
    }

    pub fn info(self) -> &'static RuleKindInfo {
        RULE_KINDS
            .iter()
            .find(|info| info.kind == self)
            .expect("every rule kind is registered")
    }

    pub fn key(self) -> &'static str {
        self.info().key
    }

    pub fn tier(self) -> u8 {
        self.info().tier
    }

    /// Whether the rule evaluates the students' own relationship declarations
    pub fn uses_relationships(self) -> bool {
        matches!(
            self,
            RuleKind::PositiveRelationships | RuleKind::NegativeRelationships
        )
    }
}

/// Rating of a single student's placement with regard to one rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentValue {
    /// 0 if the student's current placement is optimal for the rule, positive otherwise
    pub value: f64,
    /// Classrooms the student should not be moved into
    pub unsuitable: BTreeSet<ClassroomIndex>,
}

impl StudentValue {
    pub fn new(value: f64, unsuitable: BTreeSet<ClassroomIndex>) -> Self {
        StudentValue { value, unsuitable }
    }

    /// A perfectly placed student without any restrictions
    pub fn satisfied() -> Self {
        Self::default()
    }
}

/// The evaluation contract of a rule
pub trait Evaluate {
    /// Configuration-level cost: zero iff the rule is fully satisfied
    fn entry_value(&self, configuration: &Configuration) -> f64;

    /// Cost of the student's current placement and the classrooms the student should avoid
    fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue;

    /// Catalog attributes whose presence decides a student's cost
    fn attributes(&self) -> &[AttributeId] {
        &[]
    }

    /// Whether the students' levels (not only the presence of attributes) decide their cost
    fn uses_levels(&self) -> bool {
        false
    }

    /// Whether the cost of the student depends on the placement of other individual students
    fn involves(&self, _student: &Student) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
enum RuleVariant {
    GatherAttributes(GatherAttributes),
    MaximizeClassSize(MaximizeClassSize),
    MaximizeClasses(MaximizeClasses),
    PositiveRelationships(PositiveRelationships),
    NegativeRelationships(NegativeRelationships),
    GroupStudents(GroupStudents),
    SeparateStudents(SeparateStudents),
    BalanceCount(BalanceCount),
    BalanceLevel(BalanceLevel),
    BalanceClassCounts(BalanceClassCounts),
}

/// A placement rule, as constructed from the input
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    priority: f64,
    variant: RuleVariant,
}

impl Rule {
    /// Create a rule of the given kind. The inputs are expected to be validated against the
    /// kind's requirements (see `Problem::new()`).
    pub(crate) fn new(
        kind: RuleKind,
        priority: f64,
        attributes: Vec<AttributeId>,
        students: Option<Vec<StudentIndex>>,
        catalog: &Catalog,
    ) -> Rule {
        let related = catalog.lookup(&AttributeKey::Relationship);
        let variant = match kind {
            RuleKind::GatherAttributes => {
                RuleVariant::GatherAttributes(GatherAttributes::new(attributes))
            }
            RuleKind::MaximizeClassSize => RuleVariant::MaximizeClassSize(MaximizeClassSize),
            RuleKind::MaximizeClasses => RuleVariant::MaximizeClasses(MaximizeClasses),
            RuleKind::PositiveRelationships => RuleVariant::PositiveRelationships(
                PositiveRelationships::new(related, students),
            ),
            RuleKind::NegativeRelationships => RuleVariant::NegativeRelationships(
                NegativeRelationships::new(related, students),
            ),
            RuleKind::GroupStudents => {
                RuleVariant::GroupStudents(GroupStudents::new(students.unwrap_or_default()))
            }
            RuleKind::SeparateStudents => {
                RuleVariant::SeparateStudents(SeparateStudents::new(students.unwrap_or_default()))
            }
            RuleKind::BalanceCount => RuleVariant::BalanceCount(BalanceCount::new(attributes)),
            RuleKind::BalanceLevel => RuleVariant::BalanceLevel(BalanceLevel::new(attributes)),
            RuleKind::BalanceClassCounts => {
                RuleVariant::BalanceClassCounts(BalanceClassCounts::new(attributes))
            }
        };
        Rule {
            kind,
            priority,
            variant,
        }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Dispatch to the rule's evaluation
    pub fn evaluate(&self) -> &dyn Evaluate {
        match &self.variant {
            RuleVariant::GatherAttributes(r) => r,
            RuleVariant::MaximizeClassSize(r) => r,
            RuleVariant::MaximizeClasses(r) => r,
            RuleVariant::PositiveRelationships(r) => r,
            RuleVariant::NegativeRelationships(r) => r,
            RuleVariant::GroupStudents(r) => r,
            RuleVariant::SeparateStudents(r) => r,
            RuleVariant::BalanceCount(r) => r,
            RuleVariant::BalanceLevel(r) => r,
            RuleVariant::BalanceClassCounts(r) => r,
        }
    }

    pub fn entry_value(&self, configuration: &Configuration) -> f64 {
        self.evaluate().entry_value(configuration)
    }

    pub fn student_value(&self, configuration: &Configuration, student: &Student) -> StudentValue {
        self.evaluate().student_value(configuration, student)
    }
}

/// Collect the indexes of all classrooms of the configuration matching a predicate.
pub(crate) fn classrooms_where<F>(
    configuration: &Configuration,
    mut f: F,
) -> BTreeSet<ClassroomIndex>
where
    F: FnMut(ClassroomIndex) -> bool,
{
    (0..configuration.len()).filter(|c| f(*c)).collect()
}
