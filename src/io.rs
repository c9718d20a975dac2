//! File formats and human readable output of the classroom assignment.

pub mod simple;

use crate::configuration::Configuration;
use std::fmt::Write;

/// Format the classrooms of a configuration into a human readable String (e.g. to print it to
/// stdout).
///
/// Each classroom is listed with its size and the number of its members having each of the
/// catalog's attributes:
/// ```text
/// ===== Classroom 1 (3 students) =====
/// german: 2, F: 1, +bus: 0
/// anna
/// bert
/// carl
///
/// ===== Classroom 2 (2 students) =====
/// …
/// ```
pub fn format_configuration(configuration: &Configuration) -> String {
    let problem = configuration.problem();
    let mut result = String::new();
    for (i, classroom) in configuration.classrooms().iter().enumerate() {
        write!(
            result,
            "\n===== Classroom {} ({} students) =====\n",
            i + 1,
            classroom.len()
        )
        .unwrap();
        let counts: Vec<String> = problem
            .catalog
            .iter()
            .map(|(a, attribute)| format!("{}: {}", attribute.key, classroom.count(a)))
            .collect();
        if !counts.is_empty() {
            writeln!(result, "{}", counts.join(", ")).unwrap();
        }
        for s in classroom.students() {
            writeln!(result, "{}", problem.student(*s).id).unwrap();
        }
    }
    result
}
