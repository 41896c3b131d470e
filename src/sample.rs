use chrono::Local;

/// Timestamp layout used on the chart axis and in the CSV log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted reading from the base station.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: String, // local wall-clock time of arrival
    pub node1: f64,        // radon activity, Bq/m³
    pub node2: f64,
}

impl Sample {
    pub fn new(timestamp: impl Into<String>, node1: f64, node2: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            node1,
            node2,
        }
    }

    /// Stamp a reading with the current local time.
    pub fn now(node1: f64, node2: f64) -> Self {
        Self::new(Local::now().format(TIMESTAMP_FORMAT).to_string(), node1, node2)
    }
}
