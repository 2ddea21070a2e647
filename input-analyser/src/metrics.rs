/// Fraction of predictions equal to the expected class. NaN when empty.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return f64::NAN;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    correct as f64 / n as f64
}

/// Counts indexed as `[expected][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(classes: usize) -> Self {
        Self { counts: vec![vec![0; classes]; classes] }
    }

    pub fn record(&mut self, expected: usize, predicted: usize) {
        if let Some(count) = self.counts.get_mut(expected).and_then(|row| row.get_mut(predicted)) {
            *count += 1;
        }
    }

    pub fn get(&self, expected: usize, predicted: usize) -> usize {
        self.counts.get(expected).and_then(|row| row.get(predicted)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NAN;
        }
        let correct = (0..self.counts.len()).map(|i| self.counts[i][i]).sum::<usize>();
        correct as f64 / total as f64
    }

    /// Share of rows of `class` that were predicted as `class`. `None` when the
    /// class never occurred.
    pub fn recall(&self, class: usize) -> Option<f64> {
        let row = self.counts.get(class)?;
        let support = row.iter().sum::<usize>();
        (support > 0).then(|| row[class] as f64 / support as f64)
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }
}
