/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Errors that can occur when redacting or formatting an HTTP exchange.

use thiserror::Error;

/// Message used when the pattern engine fails without describing why.
pub(crate) const UNKNOWN_ERROR: &str = "Unknown error";

/// The error type for every fallible operation in this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Serialization was handed a message that is neither a request nor a response.
    #[error("Unknown message type")]
    UnknownMessageType,

    /// A path pattern was invalid or its substitution failed.
    #[error("Failed to replace path segment. {message}")]
    PathRedaction {
        /// Description reported by the pattern engine.
        message: String,
    },

    /// The compression primitive failed.
    #[error("Failed to compress message: {0}")]
    Compression(#[source] std::io::Error),

    /// A redaction rule was malformed. Raised while configuring, never while formatting.
    #[error("invalid redaction rule: {0}")]
    InvalidRuleDefinition(String),

    /// A body declared as JSON could not be decoded, or the redacted tree could not be encoded.
    #[error("error processing JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or repositioning a body stream failed.
    #[error("error reading message body: {0}")]
    Body(#[source] std::io::Error),

    /// A redacted URI could not be reassembled.
    #[error("error rebuilding redacted URI: {0}")]
    InvalidUri(#[from] http::Error),

    /// An obfuscator produced text that is not a legal header value.
    #[error("obfuscated value for header `{name}` is not a valid header value")]
    InvalidHeaderValue {
        /// The header being redacted.
        name: String,
    },
}

impl Error {
    pub(crate) fn path_redaction(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::PathRedaction {
            message: if message.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            },
        }
    }

    pub(crate) fn invalid_rule(message: impl Into<String>) -> Self {
        Self::InvalidRuleDefinition(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_path_redaction_message_defaults_to_unknown_error() {
        let error = Error::path_redaction("");
        assert_eq!("Failed to replace path segment. Unknown error", error.to_string());
    }

    #[test]
    fn path_redaction_keeps_engine_message() {
        let error = Error::path_redaction("unclosed group");
        assert_eq!("Failed to replace path segment. unclosed group", error.to_string());
    }
}
