/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Declarative formatter configuration.
//!
//! ```
//! use obfuscated_http_log::config::FormatterConfig;
//! use obfuscated_http_log::formatter::ObfuscatedMessageFormatter;
//!
//! let config: FormatterConfig = serde_json::from_str(r##"{
//!     "template": "{method} {uri}",
//!     "query_parameters": ["token"],
//!     "request_headers": { "Authorization": { "fill": "#", "repeat": 3 } }
//! }"##).unwrap();
//! let formatter = ObfuscatedMessageFormatter::try_from(config).unwrap();
//! assert_eq!("{method} {uri}", formatter.template());
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;
use crate::formatter::{ObfuscatedMessageFormatter, Rule};
use crate::obfuscator::{SharedObfuscator, StringObfuscator, TokenObfuscator};

/// An obfuscator as configuration: `fill` repeated `repeat` times, after `prefix` when one is given.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ObfuscatorConfig {
    /// Text to repeat.
    pub fill: String,
    /// Number of repetitions.
    pub repeat: usize,
    /// Literal kept in front of the repeated fill.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl From<ObfuscatorConfig> for SharedObfuscator {
    fn from(config: ObfuscatorConfig) -> Self {
        let obfuscator = StringObfuscator::new(config.fill, config.repeat);
        match config.prefix {
            Some(prefix) => TokenObfuscator::new(prefix, obfuscator).into(),
            None => obfuscator.into(),
        }
    }
}

/// Formatter settings. Every field is optional.
///
/// Each rule set is either a list of keys, redacted with the default obfuscator, or an object mapping keys to
/// their own [`ObfuscatorConfig`]. Rule sets are kept loosely typed until conversion so that a malformed entry is
/// reported as [`Error::InvalidRuleDefinition`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    /// Template; [`CLF`](crate::formatter::CLF) when absent.
    pub template: Option<String>,
    /// Default obfuscator.
    pub obfuscator: Option<ObfuscatorConfig>,
    /// Value of the `hostname` placeholder; the local host name when absent.
    pub hostname: Option<String>,
    /// Regex patterns matched against the request path.
    pub uri_patterns: Option<Value>,
    /// Request query parameters.
    pub query_parameters: Option<Value>,
    /// Request headers.
    pub request_headers: Option<Value>,
    /// JSON request body members.
    pub request_body_fields: Option<Value>,
    /// Response headers.
    pub response_headers: Option<Value>,
    /// JSON response body members.
    pub response_body_fields: Option<Value>,
}

impl FormatterConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

fn rules(name: &str, value: Option<Value>) -> Result<Vec<Rule>, Error> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::String(key) => Ok(Rule::new(key)),
                other => Err(Error::invalid_rule(format!(
                    "`{name}` list entries must be strings, got `{other}`"
                ))),
            })
            .collect(),
        Some(Value::Object(entries)) => entries
            .into_iter()
            .map(|(key, obfuscator)| {
                serde_json::from_value::<ObfuscatorConfig>(obfuscator)
                    .map(|obfuscator| Rule::with_obfuscator(key.clone(), obfuscator))
                    .map_err(|err| Error::invalid_rule(format!("`{name}.{key}` is not an obfuscator: {err}")))
            })
            .collect(),
        Some(other) => Err(Error::invalid_rule(format!(
            "`{name}` must be a list or an object, got `{other}`"
        ))),
    }
}

impl TryFrom<FormatterConfig> for ObfuscatedMessageFormatter {
    type Error = Error;

    fn try_from(config: FormatterConfig) -> Result<Self, Self::Error> {
        let mut formatter = match config.template {
            Some(template) => ObfuscatedMessageFormatter::new(template),
            None => ObfuscatedMessageFormatter::default(),
        };
        if let Some(obfuscator) = config.obfuscator {
            formatter = formatter.default_obfuscator(obfuscator);
        }
        if let Some(hostname) = config.hostname {
            formatter = formatter.hostname(hostname);
        }
        let formatter = formatter
            .uri_patterns(rules("uri_patterns", config.uri_patterns)?)?
            .query_parameters(rules("query_parameters", config.query_parameters)?)?
            .request_headers(rules("request_headers", config.request_headers)?)?
            .request_body_fields(rules("request_body_fields", config.request_body_fields)?)?
            .response_headers(rules("response_headers", config.response_headers)?)?
            .response_body_fields(rules("response_body_fields", config.response_body_fields)?)?;
        tracing::debug!(template = formatter.template(), "built formatter from configuration");
        Ok(formatter)
    }
}
