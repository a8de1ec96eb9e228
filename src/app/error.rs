use filterpy::common::FilterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Filter error: {0}")]
    FilterError(#[from] FilterError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Numerical,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that failed with this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        AppError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::TomlError(_)
            | AppError::ConfigError { .. }
            | AppError::MissingConfigError { .. }
            | AppError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AppError::CsvError(_) | AppError::ProcessingError { .. } => ErrorCategory::Input,
            AppError::FilterError(_) => ErrorCategory::Numerical,
            AppError::IoError(_) | AppError::SerializationError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::FilterError(FilterError::SingularMatrix { .. })
            | AppError::FilterError(FilterError::NotPositiveDefinite { .. }) => {
                ErrorSeverity::Medium
            }
            AppError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("The run configuration is invalid: {}", self),
            ErrorCategory::Input => format!("The measurement file could not be used: {}", self),
            ErrorCategory::Numerical => format!("The filter could not continue: {}", self),
            ErrorCategory::Output => format!("The results could not be written: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AppError::FilterError(FilterError::SingularMatrix { .. })
            | AppError::FilterError(FilterError::NotPositiveDefinite { .. }) => {
                "Increase the measurement or process noise so the covariances stay invertible"
            }
            AppError::FilterError(_) => "Check the filter parameters in the [filter] section",
            AppError::TomlError(_) => "Make sure the config file is valid TOML",
            AppError::MissingConfigError { .. } | AppError::InvalidConfigValueError { .. } => {
                "Fix the named field in the config file or override it on the command line"
            }
            AppError::ConfigError { .. } => "Review the config file against configs/example.toml",
            AppError::CsvError(_) | AppError::ProcessingError { .. } => {
                "Check that the input CSV has a header row and numeric measurement cells"
            }
            AppError::IoError(_) => "Check that the paths exist and are writable",
            AppError::SerializationError(_) => "Try the csv output format instead",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
