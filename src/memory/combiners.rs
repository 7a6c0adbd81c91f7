//! Common associative and commutative combiners, usable for memory keys and messages.

use std::ops::Add;

pub fn sum<V: Add<Output = V> + Clone>(left: &V, right: &V) -> V {
    left.clone() + right.clone()
}

pub fn min<V: PartialOrd + Clone>(left: &V, right: &V) -> V {
    if right < left {
        right.clone()
    } else {
        left.clone()
    }
}

pub fn max<V: PartialOrd + Clone>(left: &V, right: &V) -> V {
    if right > left {
        right.clone()
    } else {
        left.clone()
    }
}

pub fn and(left: &bool, right: &bool) -> bool {
    *left && *right
}

pub fn or(left: &bool, right: &bool) -> bool {
    *left || *right
}

#[cfg(test)]
mod tests {
    use crate::memory::combiners::{and, max, min, or, sum};

    #[test]
    fn fold_in_any_order() {
        let values = vec![4_i64, -2, 9, 0, 9, 3];
        let reversed = values.iter().rev().cloned().collect::<Vec<_>>();
        for input in &[&values, &reversed] {
            assert_eq!(input.iter().skip(1).fold(input[0], |a, b| sum(&a, b)), 23);
            assert_eq!(input.iter().skip(1).fold(input[0], |a, b| min(&a, b)), -2);
            assert_eq!(input.iter().skip(1).fold(input[0], |a, b| max(&a, b)), 9);
        }
        assert!((sum(&0.25_f64, &0.5) - 0.75).abs() < f64::EPSILON);
        assert!(!and(&true, &false));
        assert!(or(&false, &true));
    }
}
