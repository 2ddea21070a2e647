use std::ops::Range;

use ordered_float::OrderedFloat;
use rand::prelude::SliceRandom;
use rand::Rng;

use crate::histogram;

/// Borrowed view over a column-major feature matrix and its class labels.
///
/// Rows are addressed through `row_index[row_range]`, so splitting and
/// sampling only shuffle indices and never copy feature data.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    pub row_index: Vec<usize>,
    pub row_range: Range<usize>,
    pub columns: &'a [Vec<f64>],
    pub labels: &'a [usize],
    pub classes: usize,
}

impl<'a> Table<'a> {
    pub fn rows<'b>(&'b self) -> impl 'b + Iterator<Item = (Vec<f64>, usize)> + Clone {
        self.row_indices().map(move |i| {
            let features = (0..self.columns.len()).map(|j| self.columns[j][i]).collect();
            (features, self.labels[i])
        })
    }

    pub fn train_test_split<R: Rng + ?Sized>(
        mut self,
        rng: &mut R,
        test_rate: f64,
    ) -> (Self, Self) {
        (&mut self.row_index[self.row_range.start..self.row_range.end]).shuffle(rng);
        let test_num = ((self.rows_len() as f64 * test_rate).ceil() as usize).min(self.rows_len());

        let mut train = self.clone();
        let mut test = self;
        test.row_range.end = test.row_range.start + test_num;
        train.row_range.start = test.row_range.end;

        (train, test)
    }

    pub fn labels<'b>(&'b self) -> impl 'b + Iterator<Item = usize> + Clone {
        self.row_indices().map(move |i| self.labels[i])
    }

    pub fn column<'b>(&'b self, column_index: usize) -> impl 'b + Iterator<Item = f64> + Clone {
        self.row_indices().map(move |i| self.columns[column_index][i])
    }

    pub fn class_histogram(&self) -> Vec<usize> {
        histogram(self.labels(), self.classes)
    }

    pub fn features_len(&self) -> usize {
        self.columns.len()
    }

    pub fn rows_len(&self) -> usize {
        self.row_range.end - self.row_range.start
    }

    pub fn classes_len(&self) -> usize {
        self.classes
    }

    fn row_indices<'b>(&'b self) -> impl 'b + Iterator<Item = usize> + Clone {
        self.row_index[self.row_range.start..self.row_range.end].iter().copied()
    }

    pub fn sort_rows_by_column(&mut self, column: usize) {
        let columns = &self.columns;
        (&mut self.row_index[self.row_range.start..self.row_range.end])
            .sort_by_key(|&x| OrderedFloat(columns[column][x]))
    }

    pub fn bootstrap_sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_samples: usize,
    ) -> Self {
        let samples = std::cmp::min(max_samples, self.rows_len());
        let row_index = (0..samples)
            .map(|_| self.row_index[rng.gen_range(self.row_range.start..self.row_range.end)])
            .collect::<Vec<_>>();
        let row_range = Range { start: 0, end: samples };

        Self {
            row_index,
            row_range,
            columns: self.columns,
            labels: self.labels,
            classes: self.classes,
        }
    }

    /// Runs `f` on the first `row` rows, then on the rest, restoring the
    /// original range afterwards.
    pub fn with_split<F, T>(&mut self, row: usize, mut f: F) -> (T, T)
        where
            F: FnMut(&mut Self) -> T,
    {
        let row = row + self.row_range.start;
        let original = self.row_range.clone();

        self.row_range.end = row;
        let left = f(self);
        self.row_range.end = original.end;

        self.row_range.start = row;
        let right = f(self);
        self.row_range.start = original.start;

        (left, right)
    }
}

#[derive(Debug, Default)]
pub struct TableBuilder {
    pub columns: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub classes: Option<usize>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the number of classes instead of inferring it from the largest
    /// label, so that classes absent from a sample still get a slot.
    pub fn with_classes(mut self, classes: usize) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn add_row(&mut self, features: &[f64], label: usize) -> Result<(), TableError> {
        if self.labels.is_empty() {
            self.columns = vec![Vec::new(); features.len()];
        }

        if self.columns.len() != features.len() {
            Err(TableError::ColumnSizeMismatch)?
        }

        if let Some(classes) = self.classes {
            if label >= classes {
                Err(TableError::LabelOutOfRange { label, classes })?
            }
        }

        for (column, &value) in self.columns.iter_mut().zip(features) {
            column.push(value);
        }
        self.labels.push(label);

        Ok(())
    }

    pub fn rows_len(&self) -> usize {
        self.labels.len()
    }

    pub fn build(&self) -> Result<Table, TableError> {
        if self.labels.is_empty() {
            Err(TableError::EmptyTable)?
        }

        let classes = match self.classes {
            Some(classes) => classes,
            None => self.labels.iter().max().map_or(0, |&max| max + 1),
        };
        if classes == 0 {
            Err(TableError::NoClasses)?
        }
        if let Some(&label) = self.labels.iter().find(|&&label| label >= classes) {
            Err(TableError::LabelOutOfRange { label, classes })?
        }

        let rows_len = self.labels.len();

        Ok(Table {
            row_index: (0..rows_len).collect(),
            row_range: Range { start: 0, end: rows_len },
            columns: &self.columns,
            labels: &self.labels,
            classes,
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Table must have at least one row")]
    EmptyTable,

    #[error("Some of rows have a different column count from others")]
    ColumnSizeMismatch,

    #[error("Label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("Table must have at least one class")]
    NoClasses,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_add_row() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        table_builder.add_row(&[1.0, 2.0], 0)?;
        table_builder.add_row(&[3.0, 4.0], 2)?;
        assert_eq!(
            table_builder.add_row(&[5.0], 1),
            Err(TableError::ColumnSizeMismatch)
        );

        let table = table_builder.build()?;
        assert_eq!(table.rows_len(), 2);
        assert_eq!(table.features_len(), 2);
        assert_eq!(table.classes_len(), 3);
        assert_eq!(table.column(1).collect::<Vec<_>>(), vec![2.0, 4.0]);
        assert_eq!(table.class_histogram(), vec![1, 0, 1]);

        Ok(())
    }

    #[test]
    fn test_label_out_of_range() {
        let mut table_builder = TableBuilder::new().with_classes(2);
        assert_eq!(
            table_builder.add_row(&[0.0], 2),
            Err(TableError::LabelOutOfRange { label: 2, classes: 2 })
        );
    }

    #[test]
    fn test_empty_table() {
        let table_builder = TableBuilder::new();
        assert_eq!(table_builder.build().err(), Some(TableError::EmptyTable));
    }

    #[test]
    fn test_train_test_split() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for i in 0..100 {
            table_builder.add_row(&[i as f64], i % 2)?;
        }
        let table = table_builder.build()?;
        assert_eq!(table.rows_len(), 100);

        let (train, test) = table.train_test_split(&mut StdRng::seed_from_u64(42), 0.25);
        assert_eq!(train.rows_len(), 75);
        assert_eq!(test.rows_len(), 25);

        let mut seen = train.column(0).chain(test.column(0)).collect::<Vec<_>>();
        seen.sort_by_key(|&x| OrderedFloat(x));
        assert_eq!(seen, (0..100).map(|i| i as f64).collect::<Vec<_>>());

        Ok(())
    }

    #[test]
    fn test_train_test_split_rounds_test_up() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for i in 0..11 {
            table_builder.add_row(&[i as f64], 0)?;
        }
        let table = table_builder.build()?;

        let (train, test) = table.train_test_split(&mut StdRng::seed_from_u64(42), 0.2);
        assert_eq!(test.rows_len(), 3);
        assert_eq!(train.rows_len(), 8);

        Ok(())
    }

    #[test]
    fn test_sort_and_split() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for (x, label) in [(3.0, 1), (1.0, 0), (2.0, 0), (4.0, 1)] {
            table_builder.add_row(&[x], label)?;
        }
        let mut table = table_builder.build()?;
        table.sort_rows_by_column(0);
        assert_eq!(table.labels().collect::<Vec<_>>(), vec![0, 0, 1, 1]);

        let (left, right) = table.with_split(2, |t| t.class_histogram());
        assert_eq!(left, vec![2, 0]);
        assert_eq!(right, vec![0, 2]);
        assert_eq!(table.rows_len(), 4);

        Ok(())
    }
}
