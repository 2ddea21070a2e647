use std::io::{self, Error, ErrorKind, Read, Write};
use std::num::NonZeroUsize;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::rngs::StdRng;
use rand::{random, Rng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::argmax;
use crate::criterion::Criterion;
use crate::decision_tree::{DecisionTree, DecisionTreeOptions};
use crate::table::Table;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("Expected {expected} features but got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Forest has no trees")]
    EmptyForest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub forest: Vec<DecisionTree>,
}

impl RandomForest {
    /// Averages the class probabilities of every tree.
    pub fn predict_proba(&self, xs: &[f64]) -> Result<Vec<f64>, ForestError> {
        self.check_input(xs)?;

        let mut probabilities = vec![0.0; self.n_classes];
        for tree in &self.forest {
            for (sum, p) in probabilities.iter_mut().zip(tree.predict_proba(xs)) {
                *sum += p;
            }
        }
        let trees = self.forest.len() as f64;
        probabilities.iter_mut().for_each(|p| *p /= trees);

        Ok(probabilities)
    }

    /// Most probable class index.
    pub fn predict(&self, xs: &[f64]) -> Result<usize, ForestError> {
        let probabilities = self.predict_proba(xs)?;
        argmax(&probabilities).ok_or(ForestError::EmptyForest)
    }

    /// The class each tree votes for on its own.
    pub fn predict_individuals<'a>(
        &'a self,
        xs: &'a [f64],
    ) -> Result<impl 'a + Iterator<Item = usize>, ForestError> {
        self.check_input(xs)?;

        Ok(self
            .forest
            .iter()
            .filter_map(move |tree| argmax(tree.predict_proba(xs))))
    }

    fn check_input(&self, xs: &[f64]) -> Result<(), ForestError> {
        if self.forest.is_empty() || self.n_classes == 0 {
            return Err(ForestError::EmptyForest);
        }
        if xs.len() != self.n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: self.n_features,
                actual: xs.len(),
            });
        }
        Ok(())
    }

    pub fn serialize<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u16::<BigEndian>(self.n_features as u16)?;
        writer.write_u16::<BigEndian>(self.n_classes as u16)?;
        writer.write_u16::<BigEndian>(self.forest.len() as u16)?;
        for tree in &self.forest {
            tree.serialize(&mut writer)?;
        }

        Ok(())
    }

    pub fn deserialize<R: Read>(mut reader: R) -> io::Result<Self> {
        let n_features = reader.read_u16::<BigEndian>()? as usize;
        let n_classes = reader.read_u16::<BigEndian>()? as usize;
        let forest_len = reader.read_u16::<BigEndian>()?;
        let forest = (0..forest_len)
            .map(|_| DecisionTree::deserialize(&mut reader))
            .collect::<io::Result<Vec<_>>>()?;

        if forest.is_empty() {
            return Err(Error::new(ErrorKind::InvalidData, "forest has no trees"));
        }
        for tree in &forest {
            tree.root().validate(n_features, n_classes)?;
        }

        Ok(Self {
            n_features,
            n_classes,
            forest,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RandomForestBuilder {
    pub trees: NonZeroUsize,
    pub max_features: Option<NonZeroUsize>,
    pub max_samples: Option<NonZeroUsize>,
    pub max_depth: Option<NonZeroUsize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: Option<u64>,
    pub parallel: bool,
}

impl RandomForestBuilder {
    pub fn fit<T: Criterion>(
        &self,
        criterion: T,
        table: Table,
    ) -> RandomForest {
        tracing::debug!(
            trees = self.trees.get(),
            rows = table.rows_len(),
            features = table.features_len(),
            classes = table.classes_len(),
            parallel = self.parallel,
            "fitting random forest"
        );

        let forest = if self.parallel {
            self.tree_rngs()
                .collect::<Vec<_>>()
                .into_par_iter()
                .map(|mut rng| self.tree_fit(&mut rng, criterion.clone(), &table))
                .collect::<Vec<_>>()
        } else {
            self.tree_rngs()
                .map(|mut rng| self.tree_fit(&mut rng, criterion.clone(), &table))
                .collect::<Vec<_>>()
        };

        RandomForest {
            n_features: table.features_len(),
            n_classes: table.classes_len(),
            forest,
        }
    }

    fn tree_fit<R: Rng + ?Sized, T: Criterion>(
        &self,
        rng: &mut R,
        criterion: T,
        table: &Table,
    ) -> DecisionTree {
        let max_features = self.decide_max_features(table);
        let max_samples = self.max_samples.map_or(table.rows_len(), |n| n.get());
        let table = table.bootstrap_sample(rng, max_samples);
        DecisionTree::fit(rng, criterion, table, DecisionTreeOptions {
            max_features: Some(max_features),
            max_depth: self.max_depth.map(|n| n.get()),
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        })
    }

    fn tree_rngs(&self) -> impl Iterator<Item = StdRng> {
        let seed_u64 = self.seed.unwrap_or_else(|| random());
        let mut seed = [0u8; 32];
        (&mut seed[0..8]).copy_from_slice(&seed_u64.to_be_bytes()[..]);
        let mut rng = StdRng::from_seed(seed);
        (0..self.trees.get()).map(move |_| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);
            StdRng::from_seed(seed)
        })
    }

    fn decide_max_features(&self, table: &Table) -> usize {
        if let Some(n) = self.max_features {
            n.get()
        } else {
            ((table.features_len() as f64).sqrt().floor() as usize).max(1)
        }
    }
}

impl Default for RandomForestBuilder {
    fn default() -> Self {
        Self {
            trees: NonZeroUsize::MIN.saturating_add(99),
            max_features: None,
            max_samples: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: None,
            parallel: false,
        }
    }
}
