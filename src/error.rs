// Errors - failure taxonomy shared by the input model, providers and renderer

use std::fmt;

// =============================================================================
// VALIDATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// Field left blank
    Missing,
    /// Field present but not a finite number
    Invalid,
}

/// A form field that blocks submission. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ValidationKind::Missing,
        }
    }

    pub fn invalid(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ValidationKind::Invalid,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ValidationKind::Missing => write!(f, "Required field: {}", self.field),
            ValidationKind::Invalid => write!(f, "Invalid field: {}", self.field),
        }
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// CLIENT ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    Validation(ValidationError),
    /// Place search matched nothing
    NotFound(String),
    /// Network failure or non-success status from a provider
    Transport(String),
    /// Simulation endpoint answered with a failure
    Simulation(String),
    /// Map pick outside the continental-US bounds
    OutOfBounds { lat: f64, lon: f64 },
    /// Download requested before any successful run
    NoResult,
    /// Writing an artifact to disk failed
    Io(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Validation(e) => write!(f, "{}", e),
            ClientError::NotFound(msg) => write!(f, "{}", msg),
            ClientError::Transport(msg) => write!(f, "Request failed: {}", msg),
            ClientError::Simulation(msg) => write!(f, "{}", msg),
            ClientError::OutOfBounds { lat, lon } => write!(
                f,
                "Select a point inside the continental US ({:.4}, {:.4} is outside)",
                lat, lon
            ),
            ClientError::NoResult => write!(f, "No simulation result to download yet"),
            ClientError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        ClientError::Validation(e)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
