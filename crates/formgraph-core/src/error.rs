//! Structured error records collected by every graph operation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the boundary a fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Caller-supplied data failed structural validation.
    ParamError,
    /// Well-formed data that violates a domain rule.
    BusinessError,
    /// Internal invariant or schema fault.
    SystemError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ParamError => "param_error",
            ErrorType::BusinessError => "business_error",
            ErrorType::SystemError => "system_error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error record: `{error_type, location, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error_type} at {}: {message}", location.as_deref().unwrap_or("<graph>"))]
pub struct Error {
    pub error_type: ErrorType,
    /// Field path, node id, or `None` when the whole input is at fault.
    pub location: Option<String>,
    pub message: String,
}

impl Error {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Error {
            error_type,
            location: None,
            message: message.into(),
        }
    }

    pub fn param(message: impl Into<String>) -> Self {
        Self::new(ErrorType::ParamError, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::new(ErrorType::BusinessError, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorType::SystemError, message)
    }

    /// Attach a location to the record.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Ordered error collection produced by one operation.
///
/// A fresh value is built for every call, so a failed call never leaks
/// records into the next one. `Ok` results guarantee an empty collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn new() -> Self {
        Errors(Vec::new())
    }

    pub fn push(&mut self, error: Error) {
        self.0.push(error);
    }

    pub fn append(&mut self, other: Errors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }

    /// True when at least one record carries the given type.
    pub fn contains_type(&self, error_type: ErrorType) -> bool {
        self.0.iter().any(|e| e.error_type == error_type)
    }

    pub fn into_vec(self) -> Vec<Error> {
        self.0
    }

    /// `Ok(value)` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, Errors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Errors(vec![error])
    }
}

impl FromIterator<Error> for Errors {
    fn from_iter<I: IntoIterator<Item = Error>>(iter: I) -> Self {
        Errors(iter.into_iter().collect())
    }
}

impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

/// Result alias for graph operations.
pub type Outcome<T> = Result<T, Errors>;
