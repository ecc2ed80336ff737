use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid cell reference: '{0}'")]
    InvalidReference(String),

    #[error("Invalid color: '{0}' (expected 6 hex digits, optionally prefixed with '#' or '0x')")]
    InvalidColor(String),

    #[error("Spreadsheet service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Partial data in '{sheet}': {detail}")]
    PartialData { sheet: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SheetError {
    /// Errors raised before any mutation reaches the service.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SheetError::Validation(_) | SheetError::InvalidReference(_) | SheetError::InvalidColor(_)
        )
    }

    /// Rate limits and server-side failures. Nothing in the crate retries these;
    /// the classification is for callers that want to.
    pub fn is_retryable(&self) -> bool {
        match self {
            SheetError::Service { status, .. } => *status == 429 || *status >= 500,
            SheetError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Maps an HTTP status and response body onto the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => SheetError::Authentication(message),
            404 => SheetError::NotFound(message),
            _ => SheetError::Service { status, message },
        }
    }
}
