use std::collections::BTreeSet;

use crate::error::{PredictorError, Result};

/// Maps input names to dense class indices. Classes are kept sorted so the
/// same set of names always gets the same indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(labels: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: AsRef<str>,
    {
        let classes = labels
            .into_iter()
            .map(|label| label.as_ref().to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self { classes }
    }

    /// Rebuilds an encoder from classes stored in a model artifact.
    pub fn from_classes(classes: Vec<String>) -> Result<Self> {
        if classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PredictorError::invalid_model("labels are not sorted and unique"));
        }
        Ok(Self { classes })
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map_err(|_| PredictorError::UnknownLabel(label.to_owned()))
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_dedups() {
        let encoder = LabelEncoder::fit(["Move", "Jump", "Move", "Crouch"]);
        assert_eq!(encoder.classes(), &["Crouch", "Jump", "Move"]);
        assert_eq!(encoder.encode("Move").ok(), Some(2));
        assert_eq!(encoder.decode(0), Some("Crouch"));
        assert_eq!(encoder.decode(3), None);
    }

    #[test]
    fn test_unknown_label() {
        let encoder = LabelEncoder::fit(["Move"]);
        assert!(matches!(encoder.encode("Fly"), Err(PredictorError::UnknownLabel(l)) if l == "Fly"));
    }

    #[test]
    fn test_from_classes_rejects_unsorted() {
        assert!(LabelEncoder::from_classes(vec!["Move".into(), "Jump".into()]).is_err());
        assert!(LabelEncoder::from_classes(vec!["Jump".into(), "Move".into()]).is_ok());
    }
}
