//! The simple JSON file format: the input file is the canonical serde_json serialization of
//! `RawInput`, the result file lists the classrooms by student ids, together with a summary of the
//! optimization of each rule.

use crate::input::RawInput;
use crate::optimizer::{RuleOutcome, Solution};
use chrono::{SecondsFormat, Utc};
use log::info;
use serde_json::json;

const OUTPUT_FORMAT: &str = "X-classroster-result";
const OUTPUT_VERSION: &str = "1.0";

/// Read the constraints, rules and students from the simple JSON representation.
pub fn read<R: std::io::Read>(reader: R) -> Result<RawInput, String> {
    let input: RawInput = serde_json::from_reader(reader).map_err(|err| err.to_string())?;
    info!(
        "Read {} students and {} rules.",
        input.students.len(),
        input.rules.len()
    );
    Ok(input)
}

/// Write the classroom assignment and the per-rule results as JSON to a Writer (e.g. an output
/// file).
pub fn write<W: std::io::Write>(writer: W, solution: &Solution) -> Result<(), String> {
    let configuration = &solution.configuration;
    let problem = configuration.problem();

    let classrooms: Vec<Vec<&str>> = configuration
        .classrooms()
        .iter()
        .map(|c| {
            c.students()
                .iter()
                .map(|s| problem.student(*s).id.as_str())
                .collect()
        })
        .collect();
    let rules: Vec<serde_json::Value> = solution
        .rules
        .iter()
        .map(|r| {
            json!({
                "rule": r.key,
                "priority": r.priority,
                "value": r.value,
                "satisfaction": r.satisfaction,
                "moves": r.moves,
                "stalled": r.outcome != RuleOutcome::Satisfied,
            })
        })
        .collect();

    let data = json!({
        "format": OUTPUT_FORMAT,
        "version": OUTPUT_VERSION,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
        "duration": solution.duration.as_secs_f64(),
        "classrooms": classrooms,
        "rules": rules,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}
