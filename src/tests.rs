use crate::configuration::Configuration;
use crate::rules::RuleKind;
use crate::testing::{raw_student, ProblemBuilder};
use crate::{InputError, MAX_LEVEL};
use assert_float_eq::*;

#[test]
fn build_problem() {
    let problem = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F").level("german", 2).relationship("b", 2))
        .student(
            raw_student("b", "M")
                .level("latin", 4)
                .extra("bus", true)
                .relationship("b", 1)
                .relationship("c", 0),
        )
        .student(raw_student("c", "F").extra("bus", false))
        .rule("gather_attributes", |r| r.option("german").extra("bus"))
        .rule("positive_relationships", |r| r)
        .build();

    assert_eq!(problem.students.len(), 3);
    assert_eq!(problem.constraints.min_classes, 1);
    let german = problem.attribute_by_name("german");
    let bus = problem.attribute_by_name("+bus");
    let related = problem.attribute_by_name("related");

    let a = problem.student(problem.index_of("a"));
    assert_eq!(a.level(german), Some(2));
    assert!(!a.has_attribute(bus));
    assert!(a.has_attribute(related));
    assert_eq!(a.relationships().get(&2), Some(&vec![1]));

    let b = problem.student(problem.index_of("b"));
    assert_eq!(b.level(bus), Some(MAX_LEVEL));
    assert_eq!(b.level(german), None);
    // Relationships to oneself and with weight 0 are dropped
    assert!(b.relationships().is_empty());
    assert!(b.has_attribute(related));

    let c = problem.student(problem.index_of("c"));
    assert_eq!(c.attributes().count(), 0);
}

#[test]
fn rule_order() {
    let problem = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F").level("german", 2))
        .student(raw_student("b", "M"))
        .rule("balance_count", |r| r)
        .rule("balance_count", |r| r.gender("F").priority(5.0))
        .rule("negative_relationships", |r| r)
        .rule("gather_attributes", |r| r.option("german"))
        .rule("teleport_students", |r| r)
        .build();
    let kinds: Vec<(RuleKind, f64)> = problem
        .rules
        .iter()
        .map(|r| (r.kind(), r.priority()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (RuleKind::GatherAttributes, 1.0),
            (RuleKind::NegativeRelationships, 1.0),
            (RuleKind::BalanceCount, 5.0),
            (RuleKind::BalanceCount, 1.0),
        ]
    );
}

#[test]
fn duplicate_student() {
    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .student(raw_student("a", "M"))
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::DuplicateStudent("a".to_owned())
    );
}

#[test]
fn unknown_students() {
    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F").relationship("zoe", 1))
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::UnknownStudent {
            student: "a".to_owned(),
            reference: "zoe".to_owned()
        }
    );

    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .rule("separate_students", |r| r.students(&["a", "zoe"]))
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::UnknownStudent {
            student: "zoe".to_owned(),
            reference: "rule 'separate_students'".to_owned()
        }
    );
}

#[test]
fn incomplete_rules() {
    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .rule("gather_attributes", |r| r)
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::MissingAttributes("gather_attributes")
    );

    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .rule("balance_class_counts", |r| r.gender("F"))
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::MissingAttributes("balance_class_counts")
    );

    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .student(raw_student("b", "F"))
        .rule("group_students", |r| r.students(&["a", "a"]))
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::MissingStudents("group_students")
    );
}

#[test]
fn unknown_attribute() {
    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F").level("german", 3))
        .rule("balance_level", |r| r.level("german", 5))
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::UnknownAttribute("german=5".to_owned())
    );
}

#[test]
fn conflicting_rules() {
    let result = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .rule("maximize_classes", |r| r)
        .rule("maximize_class_size", |r| r)
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::ConflictingRules("maximize_class_size", "maximize_classes")
    );
}

#[test]
fn invalid_constraints() {
    let result = ProblemBuilder::new(2, 2)
        .anonymous_students("s", 5)
        .try_build();
    assert_eq!(
        result.unwrap_err(),
        InputError::Infeasible {
            students: 5,
            capacity: 4
        }
    );

    let result = ProblemBuilder::new(2, 2)
        .min_classes(3)
        .anonymous_students("s", 2)
        .try_build();
    assert!(matches!(
        result.unwrap_err(),
        InputError::InvalidConstraints(_)
    ));

    let result = ProblemBuilder::new(0, 2).try_build();
    assert!(matches!(
        result.unwrap_err(),
        InputError::InvalidConstraints(_)
    ));
}

#[test]
fn large_constraints() {
    let problem = ProblemBuilder::new(usize::MAX / 2 + 1, 2)
        .anonymous_students("s", 3)
        .try_build()
        .unwrap();
    assert_eq!(problem.constraints.initial_classes(3), 1);

    let problem = ProblemBuilder::new(usize::MAX, 2)
        .student(raw_student("a", "F").level("german", 2))
        .student(raw_student("b", "M"))
        .rule("gather_attributes", |r| r.option("german"))
        .rule("maximize_class_size", |r| r)
        .build();
    let config = Configuration::initial(problem.clone());
    assert_eq!(config.len(), 1);
    assert_f64_near!(config.value(0), 0.0);
    assert_f64_near!(config.value(1), 0.0);

    // One classroom too many: the smaller one is to be dissolved
    let config = Configuration::from_assignment(problem, vec![vec![0], vec![1]]);
    assert_f64_near!(config.value(0), 0.0);
    assert_f64_near!(config.value(1), 2.0);
    assert!(config.student_value(0, 1).value > 0.0);
    assert_f64_near!(config.student_value(1, 1).value, 0.0);
}

#[test]
fn unused_rule_inputs() {
    // Attributes and students are ignored for rule kinds which do not use them
    let problem = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F"))
        .rule("maximize_classes", |r| r.option("greek").students(&["z"]))
        .build();
    assert_eq!(problem.rules.len(), 1);
    assert!(problem.catalog.is_empty());
    assert!(problem.rules[0].evaluate().attributes().is_empty());

    let problem = ProblemBuilder::new(10, 3)
        .student(raw_student("a", "F").level("german", 2).level("latin", 1))
        .rule("gather_attributes", |r| r.option("german").option("latin").option("german"))
        .build();
    assert_eq!(problem.catalog.len(), 2);
    assert_eq!(problem.rules[0].evaluate().attributes().len(), 2);
}
