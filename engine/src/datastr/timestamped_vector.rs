//! A fast resettable vector based on timestamps.

use std::ops::Index;

/// A vector which can be reset to its default value in amortized O(1).
/// Each entry carries the timestamp of its last write; entries written before the last reset
/// read as the default.
#[derive(Debug, Clone)]
pub struct TimestampedVector<T> {
    data: Vec<T>,
    timestamps: Vec<u32>,
    current: u32,
    default: T,
}

impl<T: Clone> TimestampedVector<T> {
    pub fn new(size: usize, default: T) -> TimestampedVector<T> {
        TimestampedVector {
            data: vec![default.clone(); size],
            timestamps: vec![0; size],
            current: 0,
            default,
        }
    }

    /// Resets all elements to the default.
    pub fn reset(&mut self) {
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            // old timestamps become valid again after wrapping around
            self.data.iter_mut().for_each(|element| *element = self.default.clone());
            self.timestamps.iter_mut().for_each(|ts| *ts = 0);
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
        self.timestamps[index] = self.current;
    }

    /// Was the element written since the last reset?
    pub fn is_set(&self, index: usize) -> bool {
        self.timestamps[index] == self.current
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T: Clone> Index<usize> for TimestampedVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        if self.is_set(index) {
            &self.data[index]
        } else {
            &self.default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_defaults() {
        let mut weights = TimestampedVector::new(4, f64::INFINITY);
        weights.set(2, 1.5);
        assert_eq!(weights[2], 1.5);
        assert!(weights.is_set(2));
        weights.reset();
        assert_eq!(weights[2], f64::INFINITY);
        assert!(!weights.is_set(2));
    }
}
