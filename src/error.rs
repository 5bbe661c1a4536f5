use std::fmt;

use thiserror::Error;

use crate::data::Data;
use crate::json::Json;
use crate::ty::Ty;

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The value or node does not have the shape the descriptor asks for.
    #[error("at {path}: expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: Ty, found: Offending },

    /// Shape-correct but semantically invalid: bad literal, arity, duplicate, missing field.
    #[error("at {path}: invalid {ty}: {reason} (found {found})")]
    Value { path: String, ty: Ty, found: Offending, reason: String },

    #[error("at {path}: nesting exceeds the maximum depth of {limit}")]
    DepthExceeded { path: String, limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid schema document: {0}")]
    Schema(String),
}

/// The value (encode) or node (decode) an error is about.
#[derive(Debug, Clone, PartialEq)]
pub enum Offending {
    Json(Json),
    Data(Data),
}

impl CodecError {
    /// Errors a union trial may recover from by moving to the next member.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, CodecError::TypeMismatch { .. } | CodecError::Value { .. })
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            CodecError::TypeMismatch { path, .. }
            | CodecError::Value { path, .. }
            | CodecError::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }
}

const MAX_SHOWN: usize = 80;

impl fmt::Display for Offending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = match self {
            Offending::Json(v) => v.to_string(),
            Offending::Data(d) => d.to_string(),
        };
        if shown.chars().count() > MAX_SHOWN {
            let cut: String = shown.chars().take(MAX_SHOWN).collect();
            write!(f, "{cut}…")
        } else {
            f.write_str(&shown)
        }
    }
}

impl From<Json> for Offending {
    fn from(v: Json) -> Self { Offending::Json(v) }
}

impl From<Data> for Offending {
    fn from(d: Data) -> Self { Offending::Data(d) }
}
