//! Numeric helpers shared by the rules.

use crate::{MAX_LEVEL, MIN_LEVEL};

/// Tolerance for comparing rule values, which may be sums of fractional level deviations
pub const EPSILON: f64 = 1e-9;

/// Accepted deviation of an average level from the middle of the level range
pub const LEVEL_ACCURACY: f64 = 0.5;

/// Check if a rule value counts as fully satisfied.
pub fn is_satisfied(value: f64) -> bool {
    value <= EPSILON
}

/// Get the signed deviation of a count from a goal.
///
/// A decimal goal can not be met exactly, so both adjacent integers are accepted: the deviation is
/// measured from `ceil(goal)` for larger values and from `floor(goal)` for smaller ones.
pub fn difference_to_goal(value: f64, goal: f64) -> f64 {
    if (goal - goal.round()).abs() <= EPSILON {
        value - goal.round()
    } else if value > goal.ceil() {
        value - goal.ceil()
    } else if value < goal.floor() {
        value - goal.floor()
    } else {
        0.0
    }
}

/// Get the signed deviation of a level (or an average level) from the middle of the level range,
/// accepting `LEVEL_ACCURACY` in both directions.
pub fn level_difference(level: f64) -> f64 {
    let middle = (MIN_LEVEL + MAX_LEVEL) as f64 / 2.0;
    if level > middle + LEVEL_ACCURACY {
        level - (middle + LEVEL_ACCURACY)
    } else if level < middle - LEVEL_ACCURACY {
        level - (middle - LEVEL_ACCURACY)
    } else {
        0.0
    }
}

/// Check if two deviations point into the same direction (and none of them is zero).
pub fn same_direction(a: f64, b: f64) -> bool {
    (a > EPSILON && b > EPSILON) || (a < -EPSILON && b < -EPSILON)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn integer_goal() {
        assert_f64_near!(difference_to_goal(5.0, 5.0), 0.0);
        assert_f64_near!(difference_to_goal(7.0, 5.0), 2.0);
        assert_f64_near!(difference_to_goal(3.0, 5.0), -2.0);
    }

    #[test]
    fn decimal_goal() {
        // 7.5 accepts 7 and 8
        assert_f64_near!(difference_to_goal(7.0, 7.5), 0.0);
        assert_f64_near!(difference_to_goal(8.0, 7.5), 0.0);
        assert_f64_near!(difference_to_goal(10.0, 7.5), 2.0);
        assert_f64_near!(difference_to_goal(5.0, 7.5), -2.0);
    }

    #[test]
    fn levels() {
        assert_f64_near!(level_difference(2.5), 0.0);
        assert_f64_near!(level_difference(3.0), 0.0);
        assert_f64_near!(level_difference(2.0), 0.0);
        assert_f64_near!(level_difference(5.0), 2.0);
        assert_f64_near!(level_difference(0.0), -2.0);
    }

    #[test]
    fn directions() {
        assert!(same_direction(1.0, 0.5));
        assert!(same_direction(-1.0, -0.5));
        assert!(!same_direction(1.0, -0.5));
        assert!(!same_direction(0.0, 0.0));
        assert!(!same_direction(0.0, 1.0));
    }
}
