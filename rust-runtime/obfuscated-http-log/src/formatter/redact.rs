/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Builds the redacted views of a request and a response.
//!
//! A view owns copies of the method, URI, status, headers and extensions of the caller's message and borrows its
//! body. Redaction only ever rewrites the copies, or swaps the borrowed body for a rewritten one, so the caller's
//! message is left as it was.

use std::borrow::BorrowMut;
use std::io::{Seek, SeekFrom};

use http::header::{Entry as HeaderEntry, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use regex::Regex;
use serde_json::{Map, Value};

use super::rules::RuleSet;
use crate::body::{capture_body, Body, BodyRef};
use crate::error::Error;
use crate::obfuscator::{Obfuscate, SharedObfuscator};
use crate::uri::{redact_path_with, redact_query_parameter, redact_user_info_password};

/// Redaction rules applied to one exchange.
#[derive(Debug, Clone, Default)]
pub(crate) struct Rules {
    pub(crate) uri_patterns: RuleSet<Regex>,
    pub(crate) query_parameters: RuleSet<String>,
    pub(crate) request_headers: RuleSet<HeaderName>,
    pub(crate) request_body_fields: RuleSet<String>,
    pub(crate) response_headers: RuleSet<HeaderName>,
    pub(crate) response_body_fields: RuleSet<String>,
}

pub(crate) fn request_view<'a, B>(
    request: &'a mut Request<B>,
    rules: &Rules,
    default: &SharedObfuscator,
) -> Result<Request<BodyRef<'a>>, Error>
where
    B: BorrowMut<Body>,
{
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let mut headers = request.headers().clone();
    let extensions = request.extensions().clone();

    redact_headers(&mut headers, &rules.request_headers, default)?;

    let mut uri = redact_user_info_password(uri, default)?;
    for entry in rules.uri_patterns.iter() {
        uri = redact_path_with(uri, &entry.key, entry.obfuscator_or(default))?;
    }
    for entry in rules.query_parameters.iter() {
        uri = redact_query_parameter(uri, &entry.key, entry.obfuscator_or(default))?;
    }

    let mut body = BodyRef::Borrowed(request.body_mut().borrow_mut());
    redact_json_body(&headers, &mut body, &rules.request_body_fields, default)?;

    let mut view = Request::new(body);
    *view.method_mut() = method;
    *view.uri_mut() = uri;
    *view.version_mut() = version;
    *view.headers_mut() = headers;
    *view.extensions_mut() = extensions;
    Ok(view)
}

pub(crate) fn response_view<'a, B>(
    response: &'a mut Response<B>,
    rules: &Rules,
    default: &SharedObfuscator,
) -> Result<Response<BodyRef<'a>>, Error>
where
    B: BorrowMut<Body>,
{
    let status = response.status();
    let version = response.version();
    let mut headers = response.headers().clone();
    let extensions = response.extensions().clone();

    redact_headers(&mut headers, &rules.response_headers, default)?;

    let mut body = BodyRef::Borrowed(response.body_mut().borrow_mut());
    redact_json_body(&headers, &mut body, &rules.response_body_fields, default)?;

    let mut view = Response::new(body);
    *view.status_mut() = status;
    *view.version_mut() = version;
    *view.headers_mut() = headers;
    *view.extensions_mut() = extensions;
    Ok(view)
}

/// Replaces every value of every configured header, keeping the header's position.
fn redact_headers(
    headers: &mut HeaderMap,
    rules: &RuleSet<HeaderName>,
    default: &SharedObfuscator,
) -> Result<(), Error> {
    for entry in rules.iter() {
        let HeaderEntry::Occupied(mut occupied) = headers.entry(&entry.key) else {
            continue;
        };
        let obfuscator = entry.obfuscator_or(default);
        let values = occupied
            .iter()
            .map(|value| {
                let redacted = obfuscator.obfuscate(&String::from_utf8_lossy(value.as_bytes()));
                HeaderValue::try_from(redacted)
                    .map(|mut redacted| {
                        redacted.set_sensitive(true);
                        redacted
                    })
                    .map_err(|_| Error::InvalidHeaderValue {
                        name: entry.key.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let mut values = values.into_iter();
        if let Some(first) = values.next() {
            occupied.insert(first);
        }
        for value in values {
            occupied.append(value);
        }
        tracing::trace!(header = %entry.key, "redacted header");
    }
    Ok(())
}

/// Returns `true` when the last `Content-Type` value names a JSON media type.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_TYPE)
        .iter()
        .last()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).to_ascii_lowercase())
        .is_some_and(|content_type| content_type.contains("/json") || content_type.contains("+json"))
}

/// Returns `true` when a response body with these headers may be written to a log.
///
/// Bodies without a `Content-Type` are loggable; otherwise the media type, stripped of its parameters, must be
/// JSON or textual.
pub(crate) fn is_loggable(headers: &HeaderMap) -> bool {
    let content_type = crate::message::header_line(headers, CONTENT_TYPE.as_str()).to_ascii_lowercase();
    if content_type.is_empty() {
        return true;
    }
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    media_type.contains("/json") || media_type.contains("+json") || media_type.starts_with("text/")
}

fn redact_json_body(
    headers: &HeaderMap,
    body: &mut BodyRef<'_>,
    fields: &RuleSet<String>,
    default: &SharedObfuscator,
) -> Result<(), Error> {
    if fields.is_empty() || !is_json(headers) {
        return Ok(());
    }

    let current: &mut Body = body.borrow_mut();
    let position = if current.is_seekable() {
        Some(current.stream_position().map_err(Error::Body)?)
    } else {
        None
    };
    let captured = capture_body(current)?;

    let (redacted, changed) = redact_json(serde_json::from_str(&captured)?, fields, default);
    if !changed {
        if position.is_none() {
            // the caller's stream is spent; keep what was read so the view can still render it
            *body = BodyRef::Owned(Body::from(captured));
        }
        return Ok(());
    }

    let encoded = serde_json::to_string_pretty(&redacted)?;
    let size = encoded.len() as u64;
    let mut rewritten = Body::from(encoded);
    if let Some(position) = position {
        rewritten
            .seek(SeekFrom::Start(position.min(size)))
            .map_err(Error::Body)?;
    }
    tracing::debug!(original = captured.len(), rewritten = size, "redacted JSON body fields");
    *body = BodyRef::Owned(rewritten);
    Ok(())
}

/// Replaces the value of every object member whose key is in `fields`, at any depth.
///
/// Matched values are not descended into. The returned flag tells whether anything was replaced.
pub(crate) fn redact_json(value: Value, fields: &RuleSet<String>, default: &SharedObfuscator) -> (Value, bool) {
    match value {
        Value::Object(members) => {
            let mut changed = false;
            let members = members
                .into_iter()
                .map(|(key, value)| match fields.find(&key) {
                    Some(entry) => {
                        changed = true;
                        let obfuscator = entry.obfuscator_or(default);
                        let replacement = match &value {
                            Value::String(text) => obfuscator.obfuscate(text),
                            other => obfuscator.obfuscate(&other.to_string()),
                        };
                        (key, Value::String(replacement))
                    }
                    None => {
                        let (value, nested) = redact_json(value, fields, default);
                        changed |= nested;
                        (key, value)
                    }
                })
                .collect::<Map<String, Value>>();
            (Value::Object(members), changed)
        }
        Value::Array(items) => {
            let mut changed = false;
            let items = items
                .into_iter()
                .map(|item| {
                    let (item, nested) = redact_json(item, fields, default);
                    changed |= nested;
                    item
                })
                .collect();
            (Value::Array(items), changed)
        }
        scalar => (scalar, false),
    }
}
