use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    NotFound,
    ParentNotFound,
    NotAFolder,
    NotAFile,
    CyclicMove,
    AlreadyExists,
    InvalidName,
    NotPermitted,
    IOError,
    ConfigError,
    RenderError,
}

#[derive(Debug, Clone)]
pub struct PlaygroundError {
    pub error_type: ErrorType,
    pub message: String,
}

impl PlaygroundError {
    pub fn new(error_type: ErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
        }
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::new(ErrorType::NotFound, format!("{} {} does not exist", what, id))
    }
}

impl std::fmt::Display for PlaygroundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message)
    }
}

impl From<std::io::Error> for PlaygroundError {
    fn from(error: std::io::Error) -> Self {
        Self {
            error_type: ErrorType::IOError,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for PlaygroundError {
    fn from(error: serde_json::Error) -> Self {
        Self {
            error_type: ErrorType::ConfigError,
            message: error.to_string(),
        }
    }
}

impl From<std::string::FromUtf8Error> for PlaygroundError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self {
            error_type: ErrorType::RenderError,
            message: error.to_string(),
        }
    }
}

impl Error for PlaygroundError {}

pub type Result<T> = std::result::Result<T, PlaygroundError>;
