//! Descriptive statistics over the numbers found in a message.
//!
//! Every function takes a non-empty slice; callers check emptiness first.

use std::collections::HashMap;

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most common value; ties go to the value seen first.
pub fn mode(values: &[f64]) -> f64 {
    // bits -> (count, index of first occurrence); `+ 0.0` folds -0.0 into 0.0.
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        counts.entry((value + 0.0).to_bits()).or_insert((0, i)).0 += 1;
    }
    counts
        .into_values()
        .max_by(|(a, first_a), (b, first_b)| a.cmp(b).then(first_b.cmp(first_a)))
        .map_or(f64::NAN, |(_, first)| values[first])
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn product(values: &[f64]) -> f64 {
    values.iter().product()
}

pub fn range(values: &[f64]) -> f64 {
    max(values) - min(values)
}

/// Sample standard deviation; `None` for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values);
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_tendency() {
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_mode_on_long_input() {
        let mut values: Vec<f64> = (0..200_000).map(f64::from).collect();
        values.push(123_456.0);
        assert_eq!(mode(&values), 123_456.0);
    }

    #[test]
    fn test_mode_prefers_first_on_tie() {
        assert_eq!(mode(&[1.0, 2.0, 2.0, 3.0]), 2.0);
        assert_eq!(mode(&[7.0, 3.0, 3.0, 7.0]), 7.0);
        assert_eq!(mode(&[9.0]), 9.0);
        assert_eq!(mode(&[-0.0, 5.0, 0.0]), 0.0);
    }

    #[test]
    fn test_extremes() {
        let values = [3.0, -1.5, 8.0];
        assert_eq!(min(&values), -1.5);
        assert_eq!(max(&values), 8.0);
        assert_eq!(range(&values), 9.5);
        assert_eq!(product(&values), -36.0);
        assert_eq!(sum(&values), 9.5);
    }

    #[test]
    fn test_sample_std_dev() {
        let std = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138089935299395).abs() < 1e-12);
        assert_eq!(sample_std_dev(&[1.0]), None);
    }
}
