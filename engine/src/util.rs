//! Small helpers shared across modules.

use std::cmp::Ordering;

/// A float wrapper with a total order, used as a priority queue key.
/// Construction rejects NaN, so comparisons never fail.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct NonNan(f64);

impl NonNan {
    pub fn new(val: f64) -> Option<NonNan> {
        if val.is_nan() {
            None
        } else {
            Some(NonNan(val))
        }
    }

    /// Wraps a key which is known to be a number.
    /// Panics on NaN, which always points to a broken weighting or potential.
    pub fn key(val: f64) -> NonNan {
        Self::new(val).unwrap_or_else(|| panic!("NaN search key"))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for NonNan {}

impl Ord for NonNan {
    fn cmp(&self, other: &NonNan) -> Ordering {
        // NaN is excluded by construction
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// Compares two weights with an absolute tolerance.
pub fn weights_equal(a: f64, b: f64, epsilon: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        a == b
    } else {
        (a - b).abs() <= epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_like_floats() {
        let mut keys = vec![NonNan::key(3.5), NonNan::key(-1.0), NonNan::key(f64::INFINITY), NonNan::key(0.0)];
        keys.sort();
        let values: Vec<f64> = keys.into_iter().map(NonNan::value).collect();
        assert_eq!(values, vec![-1.0, 0.0, 3.5, f64::INFINITY]);
        assert!(NonNan::new(f64::NAN).is_none());
    }

    #[test]
    fn infinite_weights_only_equal_themselves() {
        assert!(weights_equal(f64::INFINITY, f64::INFINITY, 1e-3));
        assert!(!weights_equal(f64::INFINITY, 1e300, 1e-3));
        assert!(weights_equal(1.0, 1.0005, 1e-3));
    }
}
