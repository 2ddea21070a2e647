use std::io::{self, Error, ErrorKind, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::criterion::Criterion;
use crate::proportions;
use crate::table::Table;

/// Deepest tree, counting the root as level 1, that is grown or loaded.
pub const MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitPoint {
    pub column: usize,
    pub threshold: f64,
}

impl SplitPoint {
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<BigEndian>(self.column as u16)?;
        writer.write_f64::<BigEndian>(self.threshold)?;

        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        let column = reader.read_u16::<BigEndian>()? as usize;
        let threshold = reader.read_f64::<BigEndian>()?;

        Ok(Self { column, threshold })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Class probabilities of the training rows that reached this leaf.
    Leaf(Vec<f64>),
    Children {
        split: SplitPoint,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn predict(&self, xs: &[f64]) -> &[f64] {
        match self {
            Node::Leaf(probabilities) => probabilities.as_slice(),
            Node::Children { split, left, right } => {
                if xs[split.column] <= split.threshold {
                    left.predict(xs)
                } else {
                    right.predict(xs)
                }
            },
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Children { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaves(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Children { left, right, .. } => left.leaves() + right.leaves(),
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match &self {
            Node::Leaf(probabilities) => {
                writer.write_u8(0)?;
                writer.write_u16::<BigEndian>(probabilities.len() as u16)?;
                for &p in probabilities {
                    writer.write_f64::<BigEndian>(p)?;
                }
            },
            Node::Children { left, right, split } => {
                writer.write_u8(1)?;
                split.serialize(writer)?;
                left.serialize(writer)?;
                right.serialize(writer)?;
            },
        }

        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        Self::deserialize_at(reader, 1)
    }

    fn deserialize_at<R: Read>(reader: &mut R, depth: usize) -> io::Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("tree is deeper than {} levels", MAX_DEPTH),
            ));
        }

        match reader.read_u8()? {
            0 => {
                let classes = reader.read_u16::<BigEndian>()?;
                let probabilities = (0..classes)
                    .map(|_| reader.read_f64::<BigEndian>())
                    .collect::<io::Result<Vec<_>>>()?;

                Ok(Node::Leaf(probabilities))
            },
            1 => {
                let split = SplitPoint::deserialize(reader)?;
                let left = Box::new(Node::deserialize_at(reader, depth + 1)?);
                let right = Box::new(Node::deserialize_at(reader, depth + 1)?);

                Ok(Node::Children { split, left, right })
            },
            v => Err(Error::new(ErrorKind::InvalidData, format!("unknown node type {}", v))),
        }
    }

    /// Checks that every leaf has `classes` entries and every split refers to
    /// one of `features` columns.
    pub fn validate(&self, features: usize, classes: usize) -> io::Result<()> {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match node {
                Node::Leaf(probabilities) if probabilities.len() != classes => {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("leaf has {} classes, expected {}", probabilities.len(), classes),
                    ));
                },
                Node::Leaf(_) => {},
                Node::Children { split, .. } if split.column >= features => {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("split column {} is out of range for {} features", split.column, features),
                    ));
                },
                Node::Children { left, right, .. } => {
                    pending.push(right);
                    pending.push(left);
                },
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct NodeBuilder<R, T> {
    pub rng: R,
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub criterion: T,
}

impl<R: Rng, T: Criterion> NodeBuilder<R, T> {
    pub fn build(&mut self, table: &mut Table, depth: usize) -> Node {
        let counts = table.class_histogram();
        let rows = table.rows_len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure
            || rows < self.min_samples_split
            || rows < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |max| depth > max)
            || depth >= MAX_DEPTH
        {
            return Node::Leaf(proportions(&counts));
        }

        let impurity = self.criterion.calculate(&counts);
        let valid_columns = (0..table.features_len())
            .filter(|&i| !table.column(i).any(|f| f.is_nan()))
            .collect::<Vec<_>>();

        let mut best_split: Option<SplitPoint> = None;
        let mut best_information_gain = 0.0;
        let max_features = std::cmp::min(valid_columns.len(), self.max_features);
        for &column in valid_columns.choose_multiple(&mut self.rng, max_features) {
            table.sort_rows_by_column(column);
            let values = table.column(column).collect::<Vec<_>>();
            let labels = table.labels().collect::<Vec<_>>();

            let mut left = vec![0; counts.len()];
            let mut right = counts.clone();
            for i in 0..rows - 1 {
                left[labels[i]] += 1;
                right[labels[i]] -= 1;

                let (a, b) = (values[i], values[i + 1]);
                if b <= a {
                    continue;
                }

                let rows_l = i + 1;
                let rows_r = rows - rows_l;
                if rows_l < self.min_samples_leaf || rows_r < self.min_samples_leaf {
                    continue;
                }

                let ratio_l = rows_l as f64 / rows as f64;
                let ratio_r = 1.0 - ratio_l;
                let information_gain = impurity
                    - (ratio_l * self.criterion.calculate(&left)
                        + ratio_r * self.criterion.calculate(&right));

                if best_information_gain < information_gain {
                    best_information_gain = information_gain;
                    let mut threshold = (a + b) / 2.0;
                    if threshold >= b {
                        threshold = a;
                    }
                    best_split = Some(SplitPoint { column, threshold });
                }
            }
        }

        if let Some(split) = best_split {
            table.sort_rows_by_column(split.column);
            let split_row = table.column(split.column).take_while(|&f| f <= split.threshold).count();
            let (left, right) = table.with_split(split_row, |table| {
                Box::new(self.build(table, depth + 1))
            });

            Node::Children { split, left, right }
        } else {
            Node::Leaf(proportions(&counts))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::criterion::Gini;
    use crate::table::TableBuilder;

    use super::*;

    fn builder(max_depth: Option<usize>) -> NodeBuilder<StdRng, Gini> {
        NodeBuilder {
            rng: StdRng::seed_from_u64(7),
            max_features: 2,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Gini,
        }
    }

    #[test]
    fn test_build_separable() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for (x, label) in [(1.0, 0), (2.0, 0), (3.0, 1), (4.0, 1)] {
            table_builder.add_row(&[x, 0.0], label)?;
        }
        let mut table = table_builder.build()?;

        let node = builder(None).build(&mut table, 1);
        assert_eq!(
            node,
            Node::Children {
                split: SplitPoint { column: 0, threshold: 2.5 },
                left: Box::new(Node::Leaf(vec![1.0, 0.0])),
                right: Box::new(Node::Leaf(vec![0.0, 1.0])),
            }
        );
        assert_eq!(node.predict(&[2.5, 0.0]), &[1.0, 0.0]);
        assert_eq!(node.predict(&[2.6, 0.0]), &[0.0, 1.0]);

        Ok(())
    }

    #[test]
    fn test_max_depth_stops_growth() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for (x, label) in [(1.0, 0), (2.0, 1), (3.0, 0), (4.0, 1)] {
            table_builder.add_row(&[x], label)?;
        }
        let mut table = table_builder.build()?;

        let node = builder(Some(1)).build(&mut table, 1);
        assert!(node.depth() <= 2);

        Ok(())
    }

    #[test]
    fn test_nan_column_is_never_split() -> Result<(), Box<dyn Error>> {
        let mut table_builder = TableBuilder::new();
        for (x, label) in [(f64::NAN, 0), (2.0, 0), (3.0, 1), (4.0, 1)] {
            table_builder.add_row(&[x], label)?;
        }
        let mut table = table_builder.build()?;

        let node = builder(None).build(&mut table, 1);
        assert_eq!(node, Node::Leaf(vec![0.5, 0.5]));

        Ok(())
    }

    #[test]
    fn test_serialize_rejects_unknown_tag() {
        let bytes = [7u8];
        let err = Node::deserialize(&mut &bytes[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_deserialize_rejects_overly_deep_chain() {
        let mut bytes = Vec::new();
        for _ in 0..200_000 {
            bytes.push(1u8);
            bytes.extend_from_slice(&0u16.to_be_bytes());
            bytes.extend_from_slice(&0f64.to_be_bytes());
        }

        let err = Node::deserialize(&mut &bytes[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_deserialize_accepts_chain_at_max_depth() -> Result<(), Box<dyn Error>> {
        let mut node = Node::Leaf(vec![1.0]);
        for _ in 1..MAX_DEPTH {
            node = Node::Children {
                split: SplitPoint { column: 0, threshold: 0.0 },
                left: Box::new(Node::Leaf(vec![1.0])),
                right: Box::new(node),
            };
        }
        assert_eq!(node.depth(), MAX_DEPTH);

        let mut bytes = Vec::new();
        node.serialize(&mut bytes)?;
        let loaded = Node::deserialize(&mut &bytes[..])?;
        loaded.validate(1, 1)?;
        assert_eq!(loaded.predict(&[1.0]), &[1.0]);

        Ok(())
    }

    #[test]
    fn test_validate() {
        let node = Node::Children {
            split: SplitPoint { column: 3, threshold: 0.0 },
            left: Box::new(Node::Leaf(vec![1.0])),
            right: Box::new(Node::Leaf(vec![1.0])),
        };
        assert!(node.validate(4, 1).is_ok());
        assert!(node.validate(3, 1).is_err());
        assert!(node.validate(4, 2).is_err());
    }
}
