/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Placeholder resolution for a single `format` call.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::LazyLock;

use http::{Request, Response};
use regex::Regex;

use super::redact::is_loggable;
use super::ObfuscatedMessageFormatter;
use crate::body::{capture_body, BodyRef};
use crate::error::Error;
use crate::message::{
    compress, header_line, message_header_lines, reason_phrase, request_target, serialize_full, serialize_head,
    start_line, uri_host, version_str, HttpMessage,
};
use crate::time::{common_log, iso_8601, TimeSource};

/// Stands in for a value of a response or an error that isn't there.
pub(crate) const NULL: &str = "NULL";

/// Stands in for a response body that must not be logged.
pub(crate) const RESPONSE_NOT_LOGGEABLE: &str = "RESPONSE_NOT_LOGGEABLE";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*([A-Za-z_\-.0-9]+)\s*\}").unwrap());

type Resolve = fn(&mut FormatCall<'_>) -> Result<String, Error>;

type ResolvePrefixed = fn(&mut FormatCall<'_>, &str) -> Result<String, Error>;

static EXACT: LazyLock<HashMap<&'static str, Resolve>> = LazyLock::new(|| {
    let mut table: HashMap<&'static str, Resolve> = HashMap::new();
    table.insert("request", request);
    table.insert("response", response);
    table.insert("req_headers", req_headers);
    table.insert("res_headers", res_headers);
    table.insert("req_body", req_body);
    table.insert("res_body", res_body);
    table.insert("ts", timestamp);
    table.insert("date_iso_8601", timestamp);
    table.insert("date_common_log", common_log_date);
    table.insert("method", method);
    table.insert("version", req_version);
    table.insert("req_version", req_version);
    table.insert("res_version", res_version);
    table.insert("uri", uri);
    table.insert("url", uri);
    table.insert("target", target);
    table.insert("host", host);
    table.insert("hostname", hostname);
    table.insert("code", code);
    table.insert("phrase", phrase);
    table.insert("error", error);
    table
});

/// Tried in order when a name isn't in the exact table.
const PREFIXED: &[(&str, ResolvePrefixed)] = &[
    ("req_header_", req_header),
    ("res_header_", res_header),
];

/// State of one `format` call: the redacted views and the values already resolved.
pub(crate) struct FormatCall<'a> {
    formatter: &'a ObfuscatedMessageFormatter,
    request: Request<BodyRef<'a>>,
    response: Option<Response<BodyRef<'a>>>,
    error: Option<&'a (dyn StdError + 'static)>,
    cache: HashMap<String, String>,
}

impl<'a> FormatCall<'a> {
    pub(crate) fn new(
        formatter: &'a ObfuscatedMessageFormatter,
        request: Request<BodyRef<'a>>,
        response: Option<Response<BodyRef<'a>>>,
        error: Option<&'a (dyn StdError + 'static)>,
    ) -> Self {
        Self {
            formatter,
            request,
            response,
            error,
            cache: HashMap::new(),
        }
    }

    /// Substitutes every placeholder of `template`.
    pub(crate) fn render(mut self, template: &str) -> Result<String, Error> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            out.push_str(&self.resolve(name.as_str())?);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn resolve(&mut self, name: &str) -> Result<String, Error> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }

        let value = if let Some(resolve) = EXACT.get(name) {
            resolve(self)?
        } else if let Some((prefix, resolve)) = PREFIXED.iter().find(|(prefix, _)| name.starts_with(prefix)) {
            resolve(self, &name[prefix.len()..])?
        } else {
            String::new()
        };

        self.cache.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

fn request(call: &mut FormatCall<'_>) -> Result<String, Error> {
    serialize_full(&mut call.request)
}

fn response(call: &mut FormatCall<'_>) -> Result<String, Error> {
    match &mut call.response {
        None => Ok(String::new()),
        Some(response) if is_loggable(response.headers()) => serialize_full(response),
        Some(response) => serialize_head(response),
    }
}

fn req_headers(call: &mut FormatCall<'_>) -> Result<String, Error> {
    head_lines(&call.request)
}

fn res_headers(call: &mut FormatCall<'_>) -> Result<String, Error> {
    match &call.response {
        Some(response) => head_lines(response),
        None => Ok(NULL.to_string()),
    }
}

fn req_body(call: &mut FormatCall<'_>) -> Result<String, Error> {
    let body = capture_body(HttpMessage::body_mut(&mut call.request))?;
    Ok(compress(&body)?.into_owned())
}

fn res_body(call: &mut FormatCall<'_>) -> Result<String, Error> {
    let Some(response) = &mut call.response else {
        return Ok(NULL.to_string());
    };
    if !is_loggable(response.headers()) || !HttpMessage::body_mut(response).is_seekable() {
        return Ok(RESPONSE_NOT_LOGGEABLE.to_string());
    }
    let body = capture_body(HttpMessage::body_mut(response))?;
    Ok(compress(&body)?.into_owned())
}

fn timestamp(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(iso_8601(call.formatter.time_source.now()))
}

fn common_log_date(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(common_log(call.formatter.time_source.now()))
}

fn method(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call.request.method().to_string())
}

fn req_version(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(version_str(call.request.version()).to_string())
}

fn res_version(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call
        .response
        .as_ref()
        .map_or(NULL, |response| version_str(response.version()))
        .to_string())
}

fn uri(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call.request.uri().to_string())
}

fn target(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(request_target(call.request.uri()))
}

fn host(call: &mut FormatCall<'_>) -> Result<String, Error> {
    let host = header_line(call.request.headers(), "host");
    if !host.is_empty() {
        return Ok(host);
    }
    Ok(uri_host(call.request.uri()).unwrap_or_default())
}

fn hostname(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call.formatter.resolve_hostname())
}

fn code(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call
        .response
        .as_ref()
        .map_or_else(|| NULL.to_string(), |response| response.status().as_u16().to_string()))
}

fn phrase(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call
        .response
        .as_ref()
        .map_or(NULL, |response| reason_phrase(response))
        .to_string())
}

fn error(call: &mut FormatCall<'_>) -> Result<String, Error> {
    Ok(call.error.map_or_else(|| NULL.to_string(), |error| error.to_string()))
}

fn req_header(call: &mut FormatCall<'_>, name: &str) -> Result<String, Error> {
    Ok(header_line(call.request.headers(), name))
}

fn res_header(call: &mut FormatCall<'_>, name: &str) -> Result<String, Error> {
    Ok(call
        .response
        .as_ref()
        .map_or_else(|| NULL.to_string(), |response| header_line(response.headers(), name)))
}

/// Start line and header lines, as in the full message, without the trailing blank line or the body.
fn head_lines<M>(message: &M) -> Result<String, Error>
where
    M: HttpMessage,
{
    let mut lines = start_line(message)?;
    lines.push_str("\r\n");
    lines.push_str(&message_header_lines(message).join("\r\n"));
    Ok(lines)
}
