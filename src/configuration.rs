//! Candidate assignments of the students to classrooms and the move primitives of the optimizer.
//!
//! A `Configuration` holds the classrooms together with a reverse index `student -> classroom`.
//! Rule values and student values are memoized per configuration. Each mutation increments the
//! configuration's generation; cached values computed at an older generation are recomputed on
//! access.

use crate::catalog::AttributeId;
use crate::classroom::Classroom;
use crate::rules::{RuleIndex, StudentValue};
use crate::util::{is_satisfied, EPSILON};
use crate::{ClassroomIndex, Problem, StudentIndex};
use log::debug;
use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug)]
pub struct Configuration {
    problem: Arc<Problem>,
    classrooms: Vec<Classroom>,
    /// Classroom of each student, indexed by `StudentIndex`
    placement: Vec<ClassroomIndex>,
    generation: u64,
    /// Cached `value()` per rule, with the generation it was computed at
    values: RefCell<Vec<Option<(u64, f64)>>>,
    student_values: RefCell<HashMap<(StudentIndex, RuleIndex), (u64, StudentValue)>>,
}

impl Clone for Configuration {
    /// Copy the classroom memberships. The cached values stay valid for the copy and are
    /// duplicated, not shared.
    fn clone(&self) -> Self {
        Configuration {
            problem: self.problem.clone(),
            classrooms: self.classrooms.clone(),
            placement: self.placement.clone(),
            generation: self.generation,
            values: RefCell::new(self.values.borrow().clone()),
            student_values: RefCell::new(self.student_values.borrow().clone()),
        }
    }
}

impl Configuration {
    /// Create the initial configuration: the minimum number of classrooms allowed by the
    /// constraints, filled with the students in input order in contiguous blocks of (almost)
    /// equal size.
    pub fn initial(problem: Arc<Problem>) -> Configuration {
        let n = problem.students.len();
        let k = problem.constraints.initial_classes(n);
        let mut assignment = Vec::with_capacity(k);
        let mut next = 0;
        for c in 0..k {
            // The first `n % k` classrooms get one more student
            let size = n / k + if c < n % k { 1 } else { 0 };
            assignment.push((next..next + size).collect());
            next += size;
        }
        Self::from_assignment(problem, assignment)
    }

    /// Create a configuration from a list of classrooms, given as lists of student indexes.
    ///
    /// # Panics
    ///
    /// Panics if the lists do not contain every student of the problem exactly once.
    pub fn from_assignment(
        problem: Arc<Problem>,
        assignment: Vec<Vec<StudentIndex>>,
    ) -> Configuration {
        let mut placement = vec![usize::MAX; problem.students.len()];
        let mut classrooms = Vec::with_capacity(assignment.len());
        for (c, members) in assignment.into_iter().enumerate() {
            let mut classroom = Classroom::new();
            for s in members {
                assert_eq!(
                    placement[s],
                    usize::MAX,
                    "Student {} is assigned more than once",
                    s
                );
                placement[s] = c;
                classroom.add_student(problem.student(s));
            }
            classrooms.push(classroom);
        }
        assert!(
            placement.iter().all(|c| *c != usize::MAX),
            "Not every student is assigned to a classroom"
        );

        let num_rules = problem.rules.len();
        Configuration {
            problem,
            classrooms,
            placement,
            generation: 0,
            values: RefCell::new(vec![None; num_rules]),
            student_values: RefCell::new(HashMap::new()),
        }
    }

    /// Like `clone()`, but without copying the caches. Used for trial moves, which invalidate
    /// them anyway.
    fn fork(&self) -> Configuration {
        Configuration {
            problem: self.problem.clone(),
            classrooms: self.classrooms.clone(),
            placement: self.placement.clone(),
            generation: self.generation,
            values: RefCell::new(vec![None; self.problem.rules.len()]),
            student_values: RefCell::new(HashMap::new()),
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn classrooms(&self) -> &[Classroom] {
        &self.classrooms
    }

    pub fn classroom(&self, index: ClassroomIndex) -> &Classroom {
        &self.classrooms[index]
    }

    /// Number of classrooms
    pub fn len(&self) -> usize {
        self.classrooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classrooms.is_empty()
    }

    pub fn classroom_of(&self, student: StudentIndex) -> ClassroomIndex {
        self.placement[student]
    }

    /// The classrooms as lists of student indexes
    pub fn assignment(&self) -> Vec<Vec<StudentIndex>> {
        self.classrooms.iter().map(|c| c.students().to_vec()).collect()
    }

    fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Move a student into another classroom.
    pub fn move_student(&mut self, student: StudentIndex, to: ClassroomIndex) {
        let from = self.placement[student];
        if from == to {
            return;
        }
        let s = self.problem.student(student);
        self.classrooms[from].remove_student(s);
        self.classrooms[to].add_student(s);
        self.placement[student] = to;
        self.invalidate();
    }

    /// Swap the classrooms of two students.
    pub fn exchange_students(&mut self, a: StudentIndex, b: StudentIndex) {
        let (class_a, class_b) = (self.placement[a], self.placement[b]);
        self.move_student(a, class_b);
        self.move_student(b, class_a);
    }

    /// Append a new, empty classroom and return its index.
    pub fn add_classroom(&mut self) -> ClassroomIndex {
        self.classrooms.push(Classroom::new());
        self.invalidate();
        self.classrooms.len() - 1
    }

    /// Remove an empty classroom. The indexes of all subsequent classrooms are shifted by one.
    ///
    /// # Panics
    ///
    /// Panics if the classroom is not empty.
    pub fn delete_classroom(&mut self, index: ClassroomIndex) {
        assert!(
            self.classrooms[index].is_empty(),
            "Classroom {} is not empty",
            index
        );
        self.classrooms.remove(index);
        for c in self.placement.iter_mut() {
            if *c > index {
                *c -= 1;
            }
        }
        self.invalidate();
    }

    /// The entry value of a rule for this configuration (memoized)
    pub fn value(&self, rule: RuleIndex) -> f64 {
        if let Some((generation, value)) = self.values.borrow()[rule] {
            if generation == self.generation {
                return value;
            }
        }
        let value = self.problem.rules[rule].entry_value(self);
        self.values.borrow_mut()[rule] = Some((self.generation, value));
        value
    }

    /// The value of a student's placement with regard to a rule (memoized)
    pub fn student_value(&self, student: StudentIndex, rule: RuleIndex) -> StudentValue {
        if let Some((generation, value)) = self.student_values.borrow().get(&(student, rule)) {
            if *generation == self.generation {
                return value.clone();
            }
        }
        let value = self.problem.rules[rule].student_value(self, self.problem.student(student));
        self.student_values
            .borrow_mut()
            .insert((student, rule), (self.generation, value.clone()));
        value
    }

    /// Values of all rules up to (including) the given rule
    pub fn values_up_to(&self, rule: RuleIndex) -> Vec<f64> {
        (0..=rule).map(|r| self.value(r)).collect()
    }

    /// Fraction of students whose placement is optimal with regard to the rule
    pub fn satisfaction(&self, rule: RuleIndex) -> f64 {
        let n = self.problem.students.len();
        if n == 0 {
            return 1.0;
        }
        let satisfied = (0..n)
            .filter(|s| is_satisfied(self.student_value(*s, rule).value))
            .count();
        satisfied as f64 / n as f64
    }

    /// Reduce a list of students to a representative sample with regard to the rules up to (and
    /// including) `up_to_rule`.
    ///
    /// Students are considered equivalent if they have the same attributes relevant for the rules
    /// (and the same levels, for rules evaluating levels). Only the first student of each
    /// equivalence class is kept. Students involved in relationship rules are always kept.
    pub fn get_student_sample(
        &self,
        students: &[StudentIndex],
        up_to_rule: RuleIndex,
    ) -> Vec<StudentIndex> {
        let rules = &self.problem.rules[..=up_to_rule];
        let mut seen: HashSet<Vec<(AttributeId, Option<i32>)>> = HashSet::new();
        let mut result = Vec::new();
        for s in students.iter() {
            let student = self.problem.student(*s);
            if rules.iter().any(|r| r.evaluate().involves(student)) {
                result.push(*s);
                continue;
            }
            let mut key: Vec<(AttributeId, Option<i32>)> = rules
                .iter()
                .flat_map(|r| {
                    let evaluate = r.evaluate();
                    evaluate.attributes().iter().filter_map(move |a| {
                        student
                            .level(*a)
                            .map(|l| (*a, if evaluate.uses_levels() { Some(l) } else { None }))
                    })
                })
                .collect();
            key.sort_unstable();
            key.dedup();
            if seen.insert(key) {
                result.push(*s);
            }
        }
        result
    }

    /// Select the member of the (overfull) `destination` classroom to be moved back to `origin`
    /// in exchange for the `incoming` student.
    ///
    /// Every representative candidate is moved into `origin` on a copy of the configuration. The
    /// candidate leaving the best values for the rules up to `up_to_rule` (compared in rule order)
    /// is chosen. The classroom's members are shuffled before sampling, so equivalent candidates
    /// are picked randomly.
    pub fn find_best_student_for<R: Rng + ?Sized>(
        &self,
        destination: ClassroomIndex,
        origin: ClassroomIndex,
        incoming: StudentIndex,
        up_to_rule: RuleIndex,
        rng: &mut R,
    ) -> Option<StudentIndex> {
        let mut candidates: Vec<StudentIndex> = self.classrooms[destination]
            .students()
            .iter()
            .copied()
            .filter(|s| *s != incoming)
            .collect();
        candidates.shuffle(rng);
        let candidates = self.get_student_sample(&candidates, up_to_rule);

        let mut best: Option<(StudentIndex, Vec<OrderedFloat<f64>>)> = None;
        for candidate in candidates {
            let mut trial = self.fork();
            trial.move_student(candidate, origin);
            let values: Vec<OrderedFloat<f64>> = trial
                .values_up_to(up_to_rule)
                .into_iter()
                .map(OrderedFloat)
                .collect();
            if best.as_ref().map_or(true, |(_, v)| values < *v) {
                best = Some((candidate, values));
            }
        }
        best.map(|(s, _)| s)
    }

    /// Try to improve the value of a rule by moving one student.
    ///
    /// The destinations are all classrooms not marked unsuitable for the student by the rule or
    /// by any earlier rule. If that leaves no classroom, the earlier rules' hints are ignored. If
    /// there is still none, a new classroom is opened (if `max_classes` allows).
    ///
    /// For each destination, the move is tried on a copy of the configuration. An overfull
    /// destination sends one of its members back to the student's classroom (see
    /// `find_best_student_for()`); an emptied origin classroom is removed, unless that would
    /// violate `min_classes`. Moves which worsen any earlier rule are discarded.
    ///
    /// Returns the resulting configuration with the lowest value of the rule, if it is better
    /// than the current one.
    pub fn apply_rule_for_student<R: Rng + ?Sized>(
        &self,
        student: StudentIndex,
        rule: RuleIndex,
        rng: &mut R,
    ) -> Option<Configuration> {
        let constraints = &self.problem.constraints;
        let origin = self.classroom_of(student);
        let before = self.values_up_to(rule);

        let unsuitable = self.student_value(student, rule).unsuitable;
        let earlier_unsuitable: BTreeSet<ClassroomIndex> = (0..rule)
            .flat_map(|r| self.student_value(student, r).unsuitable)
            .collect();
        let mut destinations: Vec<Option<ClassroomIndex>> = (0..self.len())
            .filter(|c| *c != origin && !unsuitable.contains(c) && !earlier_unsuitable.contains(c))
            .map(Some)
            .collect();
        if destinations.is_empty() {
            destinations = (0..self.len())
                .filter(|c| *c != origin && !unsuitable.contains(c))
                .map(Some)
                .collect();
        }
        if destinations.is_empty() {
            if self.len() >= constraints.max_classes {
                debug!(
                    "No destination for student {} and no classroom may be added.",
                    student
                );
                return None;
            }
            // `None` stands for a new classroom
            destinations.push(None);
        }

        let mut best: Option<(f64, Configuration)> = None;
        for destination in destinations {
            let mut trial = self.fork();
            let destination = match destination {
                Some(d) => d,
                None => trial.add_classroom(),
            };
            trial.move_student(student, destination);
            if trial.classrooms[destination].len() > constraints.class_size {
                match trial.find_best_student_for(destination, origin, student, rule, rng) {
                    Some(evicted) => trial.move_student(evicted, origin),
                    None => continue,
                }
            }
            if trial.classrooms[origin].is_empty() && trial.len() > constraints.min_classes {
                trial.delete_classroom(origin);
            }

            if (0..rule).any(|r| trial.value(r) > before[r] + EPSILON) {
                continue;
            }
            let value = trial.value(rule);
            if best.as_ref().map_or(true, |(v, _)| value < *v) {
                best = Some((value, trial));
            }
        }

        match best {
            Some((value, trial)) if value < before[rule] - EPSILON => Some(trial),
            _ => None,
        }
    }
}
