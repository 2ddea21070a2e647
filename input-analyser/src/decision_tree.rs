use std::io::{self, Read, Write};

use rand::Rng;

use crate::criterion::Criterion;
use crate::node::{Node, NodeBuilder};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct DecisionTreeOptions {
    pub max_features: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for DecisionTreeOptions {
    fn default() -> Self {
        Self {
            max_features: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    pub fn fit<R: Rng + ?Sized, T: Criterion>(
        rng: &mut R,
        criterion: T,
        mut table: Table,
        options: DecisionTreeOptions,
    ) -> Self {
        let max_features = options.max_features.unwrap_or_else(|| table.features_len());
        let mut builder = NodeBuilder {
            rng,
            max_features,
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split.max(2),
            min_samples_leaf: options.min_samples_leaf.max(1),
            criterion,
        };
        let root = builder.build(&mut table, 1);

        Self { root }
    }

    pub fn predict_proba(&self, xs: &[f64]) -> &[f64] {
        self.root.predict(xs)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.root.serialize(writer)
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self { root: Node::deserialize(reader)? })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::argmax;
    use crate::criterion::{Entropy, Gini};
    use crate::table::TableBuilder;

    use super::*;

    fn quadrants() -> Result<TableBuilder, Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for i in 0..10 {
            for j in 0..10 {
                let label = match (i < 5, j < 5) {
                    (true, true) => 0,
                    (false, true) => 1,
                    (true, false) => 2,
                    (false, false) => 3,
                };
                table_builder.add_row(&[i as f64, j as f64], label)?;
            }
        }
        Ok(table_builder)
    }

    #[test]
    fn test_decision_tree_classification() -> Result<(), Box<dyn Error>> {
        let table_builder = quadrants()?;
        let table = table_builder.build()?;

        let classifier = DecisionTree::fit(
            &mut StdRng::seed_from_u64(0),
            Gini,
            table,
            Default::default(),
        );
        assert_eq!(argmax(classifier.predict_proba(&[1.0, 1.0])), Some(0));
        assert_eq!(argmax(classifier.predict_proba(&[8.0, 2.0])), Some(1));
        assert_eq!(argmax(classifier.predict_proba(&[3.0, 9.0])), Some(2));
        assert_eq!(argmax(classifier.predict_proba(&[7.0, 7.0])), Some(3));
        assert_eq!(classifier.root().leaves(), 4);

        Ok(())
    }

    #[test]
    fn test_decision_tree_serialize() -> Result<(), Box<dyn Error>> {
        let table_builder = quadrants()?;
        let table = table_builder.build()?;

        let classifier = DecisionTree::fit(
            &mut StdRng::seed_from_u64(0),
            Entropy,
            table,
            Default::default(),
        );

        let mut bytes = Vec::new();
        classifier.serialize(&mut bytes)?;
        let deserialized = DecisionTree::deserialize(&mut &bytes[..])?;
        assert_eq!(deserialized, classifier);

        Ok(())
    }
}
