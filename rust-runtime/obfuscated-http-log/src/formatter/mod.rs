/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Template driven formatting of a request/response exchange with sensitive data redacted.
//!
//! A template is free text containing `{name}` placeholders. Before any placeholder is resolved the request and
//! the response are redacted according to the configured rules:
//!
//! * the password of the request URI's user-info is always replaced, using the default obfuscator,
//! * URI path segments matching a pattern and configured query parameters are replaced,
//! * configured request and response headers have every value replaced,
//! * configured JSON body fields are replaced at any depth.
//!
//! | Placeholder | Value |
//! |---|---|
//! | `request` | the full request, body compressed when large |
//! | `response` | the full response, or only its head when the body isn't loggable, or empty |
//! | `req_headers`, `res_headers` | start line and headers |
//! | `req_body`, `res_body` | the body, compressed when large |
//! | `ts`, `date_iso_8601` | the current time in ISO 8601, UTC |
//! | `date_common_log` | the current time in Apache common log format |
//! | `method`, `target`, `uri`, `url`, `version`, `req_version` | parts of the request |
//! | `res_version`, `code`, `phrase` | parts of the response |
//! | `host` | the request `Host` header, or the host and non-default port of the URI |
//! | `hostname` | the local host name |
//! | `error` | the error message |
//! | `req_header_<name>`, `res_header_<name>` | the values of a header |
//!
//! Response values resolve to `NULL` when there is no response, and `error` resolves to `NULL` when there is no
//! error. Unknown placeholders resolve to an empty string.
//!
//! ```
//! use http::Request;
//! use obfuscated_http_log::body::Body;
//! use obfuscated_http_log::formatter::ObfuscatedMessageFormatter;
//!
//! # fn main() -> Result<(), obfuscated_http_log::Error> {
//! let formatter = ObfuscatedMessageFormatter::new("{method} {uri}").query_parameters(["token"])?;
//! let mut request = Request::get("https://api.example/getMe?token=abc").body(Body::empty()).unwrap();
//! assert_eq!(
//!     "GET https://api.example/getMe?token=**********",
//!     formatter.format(&mut request, None, None)?
//! );
//! # Ok(())
//! # }
//! ```

use std::borrow::{BorrowMut, Cow};
use std::error::Error as StdError;

use http::{Request, Response};

use crate::body::Body;
use crate::error::Error;
use crate::obfuscator::SharedObfuscator;
use crate::time::SharedTimeSource;

mod placeholder;
mod redact;
mod rules;

pub use rules::Rule;

use placeholder::FormatCall;
use redact::{request_view, response_view, Rules};
use rules::RuleSet;

/// Apache common log format: `{hostname} {req_header_User-Agent} - [{date_common_log}] "{method} {target} HTTP/{version}" {code} {res_header_Content-Length}`
pub const CLF: &str =
    "{hostname} {req_header_User-Agent} - [{date_common_log}] \"{method} {target} HTTP/{version}\" {code} {res_header_Content-Length}";

/// Both messages in full, followed by the error.
pub const DEBUG: &str = ">>>>>>>>\n{request}\n<<<<<<<<\n{response}\n--------\n{error}";

/// Time, request line and status code.
pub const SHORT: &str = "[{ts}] \"{method} {target} HTTP/{version}\" {code}";

/// Formats HTTP exchanges for logging with sensitive values redacted.
///
/// Configuration is builder style and validated as it is given. Once built the formatter is read-only and can be
/// shared between threads.
#[derive(Debug, Clone)]
pub struct ObfuscatedMessageFormatter {
    template: Cow<'static, str>,
    default_obfuscator: SharedObfuscator,
    time_source: SharedTimeSource,
    hostname: Option<String>,
    rules: Rules,
}

impl Default for ObfuscatedMessageFormatter {
    fn default() -> Self {
        Self::new(CLF)
    }
}

impl ObfuscatedMessageFormatter {
    /// Creates a formatter for `template` with no redaction rules besides the user-info password.
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
            default_obfuscator: SharedObfuscator::default(),
            time_source: SharedTimeSource::default(),
            hostname: None,
            rules: Rules::default(),
        }
    }

    /// The template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Sets the obfuscator used by rules that don't have their own and for the user-info password.
    pub fn default_obfuscator(mut self, obfuscator: impl Into<SharedObfuscator>) -> Self {
        self.default_obfuscator = obfuscator.into();
        self
    }

    /// Sets the clock used by the timestamp placeholders.
    pub fn time_source(mut self, time_source: impl Into<SharedTimeSource>) -> Self {
        self.time_source = time_source.into();
        self
    }

    /// Overrides the value of the `hostname` placeholder.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Replaces every match of these [`regex`] patterns in the request URI path.
    pub fn uri_patterns<I, R>(mut self, patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.rules.uri_patterns = RuleSet::patterns(patterns)?;
        Ok(self)
    }

    /// Replaces every value of these request query parameters.
    pub fn query_parameters<I, R>(mut self, parameters: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.rules.query_parameters = RuleSet::keys(parameters)?;
        Ok(self)
    }

    /// Replaces every value of these request headers.
    pub fn request_headers<I, R>(mut self, headers: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.rules.request_headers = RuleSet::headers(headers)?;
        Ok(self)
    }

    /// Replaces these members of a JSON request body.
    pub fn request_body_fields<I, R>(mut self, fields: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.rules.request_body_fields = RuleSet::keys(fields)?;
        Ok(self)
    }

    /// Replaces every value of these response headers.
    pub fn response_headers<I, R>(mut self, headers: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.rules.response_headers = RuleSet::headers(headers)?;
        Ok(self)
    }

    /// Replaces these members of a JSON response body.
    pub fn response_body_fields<I, R>(mut self, fields: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.rules.response_body_fields = RuleSet::keys(fields)?;
        Ok(self)
    }

    /// Renders the template for an exchange.
    ///
    /// Neither message is modified. Bodies are read, so both are taken mutably; the read position of a seekable
    /// body is restored before returning, while a streaming body is consumed. The same message must not be
    /// formatted from two threads at once.
    pub fn format<B>(
        &self,
        request: &mut Request<B>,
        response: Option<&mut Response<B>>,
        error: Option<&(dyn StdError + 'static)>,
    ) -> Result<String, Error>
    where
        B: BorrowMut<Body>,
    {
        let request = request_view(request, &self.rules, &self.default_obfuscator)?;
        let response = response
            .map(|response| response_view(response, &self.rules, &self.default_obfuscator))
            .transpose()?;
        tracing::trace!(
            has_response = response.is_some(),
            has_error = error.is_some(),
            "formatting exchange"
        );
        FormatCall::new(self, request, response, error).render(&self.template)
    }

    fn resolve_hostname(&self) -> String {
        match &self.hostname {
            Some(hostname) => hostname.clone(),
            None => hostname::get()
                .ok()
                .and_then(|hostname| hostname.into_string().ok())
                .unwrap_or_default(),
        }
    }
}
