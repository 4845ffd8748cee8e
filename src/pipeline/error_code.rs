//! Stable error codes shared by build-time and runtime pipeline errors.
//!
//! Codes serialize as `snake_case` strings and never change meaning, so
//! callers can match on them instead of parsing messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable classification of a pipeline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A component name is not present in the component registry.
    UnknownComponent,
    /// A component declares a required package that is not available.
    MissingPackage,
    /// A component requires a key no earlier component provides.
    MissingRequirement,
    /// The same component appears more than once in the pipeline.
    DuplicateComponent,
    /// A configuration key is not part of the recognised schema.
    UnknownField,
    /// A configuration value is not acceptable for a component.
    InvalidValue,
    /// A component needs a context handle no earlier component provided.
    MissingContext,
    /// A component could not write its artifact.
    PersistFailed,
    /// A component could not restore its artifact.
    LoadFailed,
}

impl ErrorCode {
    /// The serialized `snake_case` form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownComponent => "unknown_component",
            Self::MissingPackage => "missing_package",
            Self::MissingRequirement => "missing_requirement",
            Self::DuplicateComponent => "duplicate_component",
            Self::UnknownField => "unknown_field",
            Self::InvalidValue => "invalid_value",
            Self::MissingContext => "missing_context",
            Self::PersistFailed => "persist_failed",
            Self::LoadFailed => "load_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for code in [
            ErrorCode::UnknownComponent,
            ErrorCode::MissingPackage,
            ErrorCode::MissingRequirement,
            ErrorCode::DuplicateComponent,
            ErrorCode::UnknownField,
            ErrorCode::InvalidValue,
            ErrorCode::MissingContext,
            ErrorCode::PersistFailed,
            ErrorCode::LoadFailed,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
            assert_eq!(code.to_string(), code.as_str());
        }
    }
}
