use thiserror::Error;

/// Failure to reach or validate the data source at startup.
///
/// Raised once by [`crate::gateway::Gateway::connect`]. The web layer shows it as a
/// banner and disables every data operation for the lifetime of the process.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The service-account key could not be read or parsed
    #[error("could not load credentials: {0}")]
    Credentials(String),

    /// The source rejected the credentials or could not be contacted
    #[error("data source unavailable: {0}")]
    Source(#[from] GatewayError),

    /// A table the portal cannot work without is absent from the document
    #[error("required table '{0}' not found")]
    MissingTable(String),

    /// The configuration does not describe a usable source
    #[error("invalid data source configuration: {0}")]
    Config(String),
}

/// Failure while reading a single table.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("source unreachable: {0}")]
    Unreachable(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("unexpected HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            GatewayError::Unreachable(err.to_string())
        }
    }
}

impl From<csv::Error> for GatewayError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => GatewayError::Io(io),
            other => GatewayError::Decode(format!("{:?}", other)),
        }
    }
}

/// A table was loaded but does not have the shape the portal expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column '{column}' not found in table '{table}'")]
    MissingColumn { table: String, column: String },
}
