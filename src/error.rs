use thiserror::Error;

/// Errors raised while turning roster records into a participant pool.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("roster row {row} is missing required fields: {}", .fields.join(", "))]
    MissingFields { row: usize, fields: Vec<&'static str> },
    #[error("participant id {0} appears more than once in the roster")]
    DuplicateId(String),
    #[error("roster row {row} has an unrecognised gender value {value:?}")]
    InvalidGender { row: usize, value: String },
}

/// Errors raised while reading roster or attendance files.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("failed to read {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv in {what}: {source}")]
    Csv {
        what: String,
        #[source]
        source: csv::Error,
    },
}
