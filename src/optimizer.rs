//! The priority-ordered local search.
//!
//! The rules are worked off one after another, in the order of `Problem::rules`. For each rule,
//! the students with the worst placement (w.r.t. this rule) are moved to better classrooms, as
//! long as the rule is not satisfied and a move improving it without worsening any earlier rule
//! can be found (see `Configuration::apply_rule_for_student()`).

use crate::configuration::Configuration;
use crate::rules::RuleIndex;
use crate::util::is_satisfied;
use crate::Problem;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Parameters of the optimization, which are not part of the problem definition
#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    /// Seed for the random choices of the optimizer. If None, the random generator is seeded from
    /// system entropy.
    pub seed: Option<u64>,
    /// Maximum number of committed moves per rule (0 = unlimited)
    pub max_moves_per_rule: usize,
    /// Maximum total run time, checked between two moves
    pub time_limit: Option<Duration>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        OptimizerOptions {
            seed: None,
            max_moves_per_rule: 10000,
            time_limit: None,
        }
    }
}

/// Reason for finishing the processing of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The rule's value reached zero
    Satisfied,
    /// No student could be moved to improve the rule
    Stalled,
    /// `max_moves_per_rule` was reached
    MoveLimit,
    /// The time limit was reached before or while processing the rule
    TimeLimit,
}

/// Optimization result of a single rule
#[derive(Debug, Clone)]
pub struct RuleReport {
    /// Index of the rule in `Problem::rules`
    pub rule: RuleIndex,
    pub key: &'static str,
    pub priority: f64,
    /// Entry value of the rule for the final configuration
    pub value: f64,
    /// Fraction of students optimally placed with regard to the rule, in the final configuration
    pub satisfaction: f64,
    /// Number of moves committed while processing the rule
    pub moves: usize,
    pub outcome: RuleOutcome,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub configuration: Configuration,
    pub duration: Duration,
    /// One report per rule, in processing order
    pub rules: Vec<RuleReport>,
}

/// Main method of the module: assign the problem's students to classrooms.
///
/// Starts with the initial configuration (see `Configuration::initial()`) and optimizes it for
/// each rule.
pub fn solve(problem: Arc<Problem>, options: &OptimizerOptions) -> Solution {
    let mut rng = match options.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    solve_with_rng(problem, options, &mut rng)
}

/// Like `solve()`, but with an explicitly passed random generator.
pub fn solve_with_rng<R: Rng + ?Sized>(
    problem: Arc<Problem>,
    options: &OptimizerOptions,
    rng: &mut R,
) -> Solution {
    let start = Instant::now();
    let mut configuration = Configuration::initial(problem.clone());
    info!(
        "Starting optimization of {} students with {} rules in {} classrooms.",
        problem.students.len(),
        problem.rules.len(),
        configuration.len()
    );

    let mut results = Vec::with_capacity(problem.rules.len());
    for rule in 0..problem.rules.len() {
        let (moves, outcome) = optimize_rule(&mut configuration, rule, options, start, rng);
        results.push((moves, outcome));
    }

    let duration = start.elapsed();
    let rules = results
        .into_iter()
        .enumerate()
        .map(|(r, (moves, outcome))| RuleReport {
            rule: r,
            key: problem.rules[r].kind().key(),
            priority: problem.rules[r].priority(),
            value: configuration.value(r),
            satisfaction: configuration.satisfaction(r),
            moves,
            outcome,
        })
        .collect();
    info!(
        "Optimization finished after {:.3}s with {} classrooms.",
        duration.as_secs_f64(),
        configuration.len()
    );

    Solution {
        configuration,
        duration,
        rules,
    }
}

/// Move students until the rule is satisfied, no improving move is left, or one of the limits is
/// reached. Returns the number of committed moves.
fn optimize_rule<R: Rng + ?Sized>(
    configuration: &mut Configuration,
    rule: RuleIndex,
    options: &OptimizerOptions,
    start: Instant,
    rng: &mut R,
) -> (usize, RuleOutcome) {
    let key = configuration.problem().rules[rule].kind().key();
    info!(
        "Processing rule {} ({}) with value {}.",
        rule,
        key,
        configuration.value(rule)
    );

    let mut moves = 0;
    let outcome = loop {
        if is_satisfied(configuration.value(rule)) {
            break RuleOutcome::Satisfied;
        }
        if options.max_moves_per_rule > 0 && moves >= options.max_moves_per_rule {
            warn!("Giving up rule {} ({}) after {} moves.", rule, key, moves);
            break RuleOutcome::MoveLimit;
        }
        if let Some(limit) = options.time_limit {
            if start.elapsed() >= limit {
                warn!("Time limit reached while processing rule {} ({}).", rule, key);
                break RuleOutcome::TimeLimit;
            }
        }

        // Rank students by descending value (stable: equally valued students in input order)
        let mut ranked: Vec<(usize, f64)> = (0..configuration.problem().students.len())
            .map(|s| (s, configuration.student_value(s, rule).value))
            .filter(|(_, v)| !is_satisfied(*v))
            .collect();
        ranked.sort_by_key(|(_, v)| std::cmp::Reverse(OrderedFloat(*v)));

        let mut moved = false;
        for (student, value) in ranked {
            if let Some(next) = configuration.apply_rule_for_student(student, rule, rng) {
                debug!(
                    "Moved student {} (value {}) from classroom {} to {}. Rule value: {} -> {}",
                    configuration.problem().student(student).id,
                    value,
                    configuration.classroom_of(student),
                    next.classroom_of(student),
                    configuration.value(rule),
                    next.value(rule)
                );
                if next.len() != configuration.len() {
                    debug!(
                        "Number of classrooms changed from {} to {}.",
                        configuration.len(),
                        next.len()
                    );
                }
                *configuration = next;
                moves += 1;
                moved = true;
                break;
            }
        }
        if !moved {
            debug!("No improving move left for rule {} ({}).", rule, key);
            break RuleOutcome::Stalled;
        }
    };

    info!(
        "Finished rule {} ({}) after {} moves: {:?}, value {}.",
        rule,
        key,
        moves,
        outcome,
        configuration.value(rule)
    );
    (moves, outcome)
}
