//! Error types.
//!
//! Only the edges of the core are fallible: decoding wire messages and
//! loading configuration. Entity, registry, reconciliation and simulation
//! operations are total and never return errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to decode or encode a wire message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The text is not valid JSON.
    #[error("message is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The JSON object has no string `type` field.
    #[error("message has no `type` field")]
    MissingType,

    /// The `type` field names a message kind this client does not know.
    #[error("unknown message type `{0}`")]
    UnknownType(String),

    /// The message kind is known but its payload does not match.
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        /// The message `type`.
        kind: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// An outbound message could not be serialized.
    #[error("failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failure to load a [`GameConfig`](crate::config::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config document is not valid JSON for the config schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A policy value is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_display() {
        let err = ProtocolError::UnknownType("teleport".to_owned());
        assert_eq!(err.to_string(), "unknown message type `teleport`");
    }

    #[test]
    fn invalid_config_display() {
        let err = ConfigError::Invalid {
            field: "entity.radius",
            reason: "must be positive".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value `entity.radius`: must be positive"
        );
    }
}
