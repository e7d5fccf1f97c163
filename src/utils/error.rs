use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Price lookup failed with status {status}: {url}")]
    LookupError { url: String, status: u16 },

    #[error("Malformed lookup payload from {url}: {message}")]
    PayloadError { url: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Field '{field}' is not inside a recognized row")]
    RowNotFoundError { field: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Config,
    System,
}

impl SyncError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單列查詢失敗不影響其他列
            SyncError::RowNotFoundError { .. } => ErrorSeverity::Low,
            SyncError::ApiError(_)
            | SyncError::LookupError { .. }
            | SyncError::PayloadError { .. } => ErrorSeverity::Medium,
            SyncError::ProcessingError { .. } | SyncError::SerializationError(_) => {
                ErrorSeverity::High
            }
            SyncError::ConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::TomlError(_) => ErrorSeverity::High,
            SyncError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::ApiError(_) | SyncError::LookupError { .. } => ErrorCategory::Network,
            SyncError::PayloadError { .. }
            | SyncError::SerializationError(_)
            | SyncError::RowNotFoundError { .. }
            | SyncError::ProcessingError { .. } => ErrorCategory::Data,
            SyncError::ConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::TomlError(_) => ErrorCategory::Config,
            SyncError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SyncError::ApiError(_) => {
                "Check that the price API is reachable and the base URL is correct".to_string()
            }
            SyncError::LookupError { url, .. } => {
                format!("Verify the entity id exists on the backend ({})", url)
            }
            SyncError::PayloadError { .. } => {
                "Check the configured price field names against the API response".to_string()
            }
            SyncError::IoError(_) => {
                "Check that the snapshot paths exist and are writable".to_string()
            }
            SyncError::SerializationError(_) => {
                "Check that the snapshot file is a flat JSON object of field values".to_string()
            }
            SyncError::TomlError(_) => "Check the profile TOML syntax".to_string(),
            SyncError::ConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => {
                "Review the CLI flags and profile file".to_string()
            }
            SyncError::RowNotFoundError { field } => {
                format!(
                    "Field '{}' does not match the form profile's naming convention",
                    field
                )
            }
            SyncError::ProcessingError { .. } => {
                "Re-run with --verbose for the full event trace".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::ApiError(_) | SyncError::LookupError { .. } => {
                "Could not reach the price lookup service".to_string()
            }
            SyncError::PayloadError { .. } => {
                "The price lookup service returned an unexpected response".to_string()
            }
            SyncError::IoError(_) => "Could not read or write the snapshot file".to_string(),
            SyncError::SerializationError(_) => "The snapshot file is not valid JSON".to_string(),
            SyncError::TomlError(_) => "The profile file is not valid TOML".to_string(),
            SyncError::ConfigError { message } => message.clone(),
            SyncError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid {}: {}", field, reason)
            }
            SyncError::MissingConfigError { field } => format!("Missing {}", field),
            SyncError::RowNotFoundError { field } => {
                format!("'{}' is not part of any line-item row", field)
            }
            SyncError::ProcessingError { message } => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
