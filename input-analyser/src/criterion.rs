use serde::{Deserialize, Serialize};

/// Impurity measure over a class histogram.
pub trait Criterion: Send + Sync + Clone {
    fn calculate(&self, counts: &[usize]) -> f64;
}

#[derive(Debug, Clone)]
pub struct Gini;

impl Criterion for Gini {
    fn calculate(&self, counts: &[usize]) -> f64 {
        let n = counts.iter().sum::<usize>();
        if n == 0 {
            return 0.0;
        }
        1.0 - counts
            .iter()
            .map(|&count| (count as f64 / n as f64).powi(2))
            .sum::<f64>()
    }
}

#[derive(Debug, Clone)]
pub struct Entropy;

impl Criterion for Entropy {
    fn calculate(&self, counts: &[usize]) -> f64 {
        let n = counts.iter().sum::<usize>();
        if n == 0 {
            return 0.0;
        }
        counts
            .iter()
            .filter(|&&count| count > 0)
            .map(|&count| {
                let p = count as f64 / n as f64;
                -p * p.log2()
            })
            .sum()
    }
}

/// Criterion selector, as written in configuration files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    #[default]
    Gini,
    Entropy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini() {
        assert_eq!(Gini.calculate(&[3, 3]), 0.5);
        assert_eq!(Gini.calculate(&[6, 0]), 0.0);
        assert!((Gini.calculate(&[5, 1]) - 10.0 / 36.0).abs() < 1e-12);
        assert_eq!(Gini.calculate(&[]), 0.0);
    }

    #[test]
    fn test_entropy() {
        assert_eq!(Entropy.calculate(&[2, 2]), 1.0);
        assert_eq!(Entropy.calculate(&[4, 0]), 0.0);
        assert!((Entropy.calculate(&[3, 1]) - 0.8112781244591328).abs() < 1e-12);
    }
}
