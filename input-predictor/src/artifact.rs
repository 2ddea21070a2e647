use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use input_analyser::random_forest::RandomForest;

use crate::error::{PredictorError, Result};
use crate::labels::LabelEncoder;

const MAGIC: &[u8; 4] = b"IPRF";
const VERSION: u16 = 1;
const MAX_FIELD: usize = u16::MAX as usize;

/// Everything needed to turn five raw features back into an input name.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub labels: LabelEncoder,
    /// Test-split accuracy measured at training time, NaN if unknown.
    pub accuracy: f64,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.check_encodable()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;

        tracing::debug!("model artifact written to {}", path.display());

        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.check_encodable()?;

        writer.write_all(MAGIC)?;
        writer.write_u16::<BigEndian>(VERSION)?;
        write_strings(writer, &self.feature_names)?;
        write_strings(writer, self.labels.classes())?;
        writer.write_f64::<BigEndian>(self.accuracy)?;
        self.forest.serialize(&mut *writer)?;

        Ok(())
    }

    /// Rejects artifacts whose counts or lengths do not fit the u16 fields of
    /// the file format, before anything is written.
    fn check_encodable(&self) -> Result<()> {
        check_strings("feature names", &self.feature_names)?;
        check_strings("labels", self.labels.classes())?;
        if self.forest.forest.len() > MAX_FIELD {
            return Err(PredictorError::invalid_argument(format!(
                "{} trees exceed the limit of {}",
                self.forest.forest.len(),
                MAX_FIELD
            )));
        }

        if self.forest.n_classes != self.labels.len() {
            return Err(PredictorError::invalid_model(format!(
                "forest has {} classes but {} labels are known",
                self.forest.n_classes,
                self.labels.len()
            )));
        }
        if self.forest.n_features != self.feature_names.len() {
            return Err(PredictorError::invalid_model(format!(
                "forest expects {} features but {} are named",
                self.forest.n_features,
                self.feature_names.len()
            )));
        }

        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(invalid)?;
        if &magic != MAGIC {
            return Err(PredictorError::invalid_model("not an input predictor model"));
        }

        let version = reader.read_u16::<BigEndian>().map_err(invalid)?;
        if version != VERSION {
            return Err(PredictorError::invalid_model(format!("unsupported version {version}")));
        }

        let feature_names = read_strings(reader).map_err(invalid)?;
        let labels = LabelEncoder::from_classes(read_strings(reader).map_err(invalid)?)?;
        let accuracy = reader.read_f64::<BigEndian>().map_err(invalid)?;
        let forest = RandomForest::deserialize(&mut *reader).map_err(invalid)?;

        if forest.n_features != feature_names.len() {
            return Err(PredictorError::invalid_model(format!(
                "forest expects {} features but {} are named",
                forest.n_features,
                feature_names.len()
            )));
        }
        if forest.n_classes != labels.len() {
            return Err(PredictorError::invalid_model(format!(
                "forest has {} classes but {} labels are stored",
                forest.n_classes,
                labels.len()
            )));
        }

        Ok(Self { feature_names, labels, accuracy, forest })
    }
}

fn invalid(e: io::Error) -> PredictorError {
    match e.kind() {
        ErrorKind::UnexpectedEof => PredictorError::invalid_model("file is truncated"),
        _ => PredictorError::invalid_model(e.to_string()),
    }
}

fn check_strings<S: AsRef<str>>(what: &str, strings: &[S]) -> Result<()> {
    if strings.len() > MAX_FIELD {
        return Err(PredictorError::invalid_argument(format!(
            "{} {} exceed the limit of {}",
            strings.len(),
            what,
            MAX_FIELD
        )));
    }
    if let Some(s) = strings.iter().map(AsRef::as_ref).find(|s| s.len() > MAX_FIELD) {
        return Err(PredictorError::invalid_argument(format!(
            "{} entry of {} bytes exceeds the limit of {}",
            what,
            s.len(),
            MAX_FIELD
        )));
    }

    Ok(())
}

fn write_strings<W: Write, S: AsRef<str>>(writer: &mut W, strings: &[S]) -> io::Result<()> {
    writer.write_u16::<BigEndian>(strings.len() as u16)?;
    for s in strings {
        let bytes = s.as_ref().as_bytes();
        writer.write_u16::<BigEndian>(bytes.len() as u16)?;
        writer.write_all(bytes)?;
    }
    Ok(())
}

fn read_strings<R: Read>(reader: &mut R) -> io::Result<Vec<String>> {
    let count = reader.read_u16::<BigEndian>()?;
    (0..count)
        .map(|_| {
            let len = reader.read_u16::<BigEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            reader.read_exact(&mut bytes)?;
            String::from_utf8(bytes).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::num::NonZeroUsize;

    use input_analyser::criterion::Gini;
    use input_analyser::random_forest::RandomForestBuilder;
    use input_analyser::table::TableBuilder;

    use crate::record::FEATURE_NAMES;

    use super::*;

    fn artifact() -> Result<ModelArtifact, Box<dyn Error>> {
        let mut table_builder = TableBuilder::new().with_classes(2);
        for i in 0..20 {
            let t = i as f64;
            table_builder.add_row(&[t, 0.0, 0.0, 0.0, i as f64], usize::from(i >= 10))?;
        }
        let forest = RandomForestBuilder {
            trees: NonZeroUsize::new(5).unwrap(),
            seed: Some(3),
            ..Default::default()
        }
            .fit(Gini, table_builder.build()?);

        Ok(ModelArtifact {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            labels: LabelEncoder::fit(["Jump", "Move"]),
            accuracy: 0.9,
            forest,
        })
    }

    #[test]
    fn test_save_and_load() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("models").join("model.rf");

        let artifact = artifact()?;
        artifact.save(&path)?;
        let loaded = ModelArtifact::load(&path)?;
        assert_eq!(loaded, artifact);

        Ok(())
    }

    #[test]
    fn test_rejects_bad_magic() {
        let bytes = b"NOPE\x00\x01".to_vec();
        let err = ModelArtifact::read_from(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidModel(_)));
    }

    #[test]
    fn test_rejects_truncated_file() -> Result<(), Box<dyn Error>> {
        let mut bytes = Vec::new();
        artifact()?.write_to(&mut bytes)?;
        bytes.truncate(bytes.len() - 3);

        let err = ModelArtifact::read_from(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidModel(m) if m == "file is truncated"));

        Ok(())
    }

    #[test]
    fn test_rejects_oversized_label() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.rf");

        let mut artifact = artifact()?;
        artifact.labels = LabelEncoder::fit(["Jump".to_string(), "M".repeat(70_000)]);

        let err = artifact.save(&path).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidArgument(_)));
        assert!(!path.exists());

        Ok(())
    }

    #[test]
    fn test_rejects_too_many_labels() -> Result<(), Box<dyn Error>> {
        let mut artifact = artifact()?;
        artifact.labels = LabelEncoder::fit((0..=MAX_FIELD).map(|i| format!("{i:06}")));
        artifact.forest.n_classes = artifact.labels.len();

        let mut bytes = Vec::new();
        let err = artifact.write_to(&mut bytes).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidArgument(_)));
        assert!(bytes.is_empty());

        Ok(())
    }

    #[test]
    fn test_rejects_overly_deep_tree() -> Result<(), Box<dyn Error>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.write_u16::<BigEndian>(VERSION)?;
        write_strings(&mut bytes, &FEATURE_NAMES)?;
        write_strings(&mut bytes, &["Move"])?;
        bytes.write_f64::<BigEndian>(1.0)?;
        bytes.write_u16::<BigEndian>(FEATURE_NAMES.len() as u16)?;
        bytes.write_u16::<BigEndian>(1)?;
        bytes.write_u16::<BigEndian>(1)?;
        for _ in 0..200_000 {
            bytes.write_u8(1)?;
            bytes.write_u16::<BigEndian>(0)?;
            bytes.write_f64::<BigEndian>(0.0)?;
        }

        let err = ModelArtifact::read_from(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidModel(_)));

        Ok(())
    }

    #[test]
    fn test_rejects_label_count_mismatch() -> Result<(), Box<dyn Error>> {
        let mut artifact = artifact()?;
        artifact.labels = LabelEncoder::fit(["Jump", "Move", "Run"]);

        let mut bytes = Vec::new();
        assert!(artifact.write_to(&mut bytes).is_err());

        Ok(())
    }
}
