use serde::{Deserialize, Serialize};

/// Model feature columns, in the order the forest sees them.
pub const FEATURE_NAMES: [&str; 5] = [
    "TimeStamp",
    "LocationX",
    "LocationY",
    "LocationZ",
    "FrameNumber",
];

/// One player input as logged by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputLog {
    #[serde(rename = "InputName")]
    pub input_name: String,
    #[serde(rename = "TimeStamp")]
    pub timestamp: f64,
    #[serde(rename = "LocationX")]
    pub x: f64,
    #[serde(rename = "LocationY")]
    pub y: f64,
    #[serde(rename = "LocationZ")]
    pub z: f64,
    #[serde(rename = "FrameNumber")]
    pub frame: u64,
}

impl InputLog {
    pub fn new<S: Into<String>>(input_name: S, timestamp: f64, location: [f64; 3], frame: u64) -> Self {
        Self {
            input_name: input_name.into(),
            timestamp,
            x: location[0],
            y: location[1],
            z: location[2],
            frame,
        }
    }

    pub fn features(&self) -> [f64; 5] {
        features(self.timestamp, self.x, self.y, self.z, self.frame)
    }
}

pub fn features(timestamp: f64, x: f64, y: f64, z: f64, frame: u64) -> [f64; 5] {
    [timestamp, x, y, z, frame as f64]
}
