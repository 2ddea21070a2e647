pub mod criterion;
pub mod decision_tree;
pub mod metrics;
pub mod node;
pub mod random_forest;
pub mod table;

/// Counts how many times each class index occurs in `labels`.
///
/// Labels outside `0..classes` are ignored; callers guarantee the range when
/// building a [`table::Table`].
pub fn histogram<T>(labels: T, classes: usize) -> Vec<usize>
    where
        T: Iterator<Item = usize>,
{
    let mut counts = vec![0; classes];
    for label in labels {
        if let Some(count) = counts.get_mut(label) {
            *count += 1;
        }
    }
    counts
}

/// Index of the largest value. Ties go to the lowest index.
pub fn argmax(xs: &[f64]) -> Option<usize> {
    xs.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| match best {
            Some((_, y)) if y >= x || x.is_nan() => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}

/// Normalizes class counts to probabilities.
pub fn proportions(counts: &[usize]) -> Vec<f64> {
    let total = counts.iter().sum::<usize>();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram() {
        assert_eq!(histogram([0, 2, 2, 1, 2].into_iter(), 3), vec![1, 1, 3]);
        assert_eq!(histogram([5].into_iter(), 2), vec![0, 0]);
    }

    #[test]
    fn test_argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.25, 0.5, 0.25]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_proportions() {
        assert_eq!(proportions(&[1, 3]), vec![0.25, 0.75]);
        assert_eq!(proportions(&[0, 0]), vec![0.0, 0.0]);
    }
}
