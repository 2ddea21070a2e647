use std::fs;
use std::io;
use std::path::Path;

use csv::{Reader, Writer};
use input_analyser::table::TableBuilder;

use crate::error::{PredictorError, Result};
use crate::labels::LabelEncoder;
use crate::record::InputLog;

/// Column order the game uses when saving its input log.
pub const HEADER: [&str; 6] = [
    "InputName",
    "TimeStamp",
    "LocationX",
    "LocationY",
    "LocationZ",
    "FrameNumber",
];

#[derive(Debug, Clone, Default)]
pub struct InputLogDataset {
    pub logs: Vec<InputLog>,
}

impl InputLogDataset {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self { logs: read_input_logs(path)? })
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn label_encoder(&self) -> LabelEncoder {
        LabelEncoder::fit(self.logs.iter().map(|log| log.input_name.as_str()))
    }

    pub fn encode(&self, encoder: &LabelEncoder) -> Result<TableBuilder> {
        let mut table_builder = TableBuilder::new().with_classes(encoder.len());
        for log in &self.logs {
            let label = encoder.encode(&log.input_name)?;
            table_builder.add_row(&log.features(), label)?;
        }
        Ok(table_builder)
    }
}

/// Reads an input log. Columns are matched by header name, so any column
/// order is accepted.
pub fn read_input_logs<P: AsRef<Path>>(path: P) -> Result<Vec<InputLog>> {
    let path = path.as_ref();
    let mut rdr = match Reader::from_path(path) {
        Ok(rdr) => rdr,
        Err(e) => {
            if let csv::ErrorKind::Io(io_err) = e.kind() {
                if io_err.kind() == io::ErrorKind::NotFound {
                    return Err(PredictorError::DatasetNotFound(path.to_path_buf()));
                }
            }
            return Err(e.into());
        },
    };

    let logs = rdr
        .deserialize::<InputLog>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tracing::debug!("read {} input logs from {}", logs.len(), path.display());

    if logs.is_empty() {
        Err(PredictorError::EmptyDataset)?
    }

    Ok(logs)
}

/// Writes logs the way the game saves them: two decimals for floats and an
/// integer frame number.
pub fn write_input_logs<P: AsRef<Path>>(path: P, logs: &[InputLog]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(HEADER)?;
    for log in logs {
        wtr.write_record([
            log.input_name.clone(),
            format!("{:.2}", log.timestamp),
            format!("{:.2}", log.x),
            format!("{:.2}", log.y),
            format!("{:.2}", log.z),
            log.frame.to_string(),
        ])?;
    }
    wtr.flush()?;

    Ok(())
}
