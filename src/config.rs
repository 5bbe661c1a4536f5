//! Engine configuration.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::case::FieldCase;
use crate::error::{CodecError, Result};

pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Recursion guard; exceeding it fails with `DepthExceeded`.
    pub max_depth: usize,
    /// Skip record fields whose value equals their declared default on encode.
    pub omit_defaults: bool,
    /// Reject object keys that name no declared record field.
    pub strict_fields: bool,
    pub field_case: FieldCase,
    /// Spaces per level when rendering text; compact when `None`.
    pub indent: Option<usize>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            omit_defaults: false,
            strict_fields: false,
            field_case: FieldCase::AsDeclared,
            indent: None,
        }
    }
}

impl CodecConfig {
    pub fn from_json_str(src: &str) -> Result<Self> {
        let config: Self = from_json_with_path(src.as_bytes()).map_err(CodecError::Config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(CodecError::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Deserializes a settings-style document, naming the JSON path that failed.
pub(crate) fn from_json_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_defaults() {
        let config = CodecConfig::from_json_str(r#"{"field_case": "camel_case", "indent": 2}"#).unwrap();
        assert_eq!(config.field_case, FieldCase::CamelCase);
        assert_eq!(config.indent, Some(2));
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.strict_fields);
    }

    #[test]
    fn bad_documents_are_config_errors() {
        let err = CodecConfig::from_json_str(r#"{"max_depth": "deep"}"#).unwrap_err();
        assert!(matches!(&err, CodecError::Config(msg) if msg.contains("max_depth")), "{err}");
        assert!(CodecConfig::from_json_str(r#"{"colour": true}"#).is_err());
        assert!(CodecConfig::from_json_str(r#"{"max_depth": 0}"#).is_err());
    }
}
