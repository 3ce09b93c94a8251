/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Wire-like text rendering of HTTP messages.

use std::borrow::{BorrowMut, Cow};
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{HeaderName, HOST, SET_COOKIE};
use http::{HeaderMap, Method, StatusCode, Uri, Version};

use crate::body::{capture_body, Body};
use crate::error::Error;

/// Payloads at least this long are compressed by [`compress`].
pub const COMPRESSION_THRESHOLD: usize = 10 * 1024;

const COMPRESSION_LEVEL: u32 = 9;

const LINE_WIDTH: usize = 76;

const CRLF: &str = "\r\n";

/// A reason phrase overriding the canonical one of a response's status code.
///
/// Insert it into the response [`Extensions`](http::Extensions) to log the phrase the server actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(Cow<'static, str>);

impl ReasonPhrase {
    /// Creates a reason phrase.
    pub fn new(phrase: impl Into<Cow<'static, str>>) -> Self {
        Self(phrase.into())
    }

    /// The phrase.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What the first line of a message is made of.
#[derive(Debug)]
pub enum Head<'a> {
    /// `<METHOD> <target> HTTP/<version>`
    Request {
        /// The request method.
        method: &'a Method,
        /// The request URI.
        uri: &'a Uri,
    },
    /// `HTTP/<version> <status> <reason>`
    Response {
        /// The status code.
        status: StatusCode,
        /// The reason phrase.
        reason: &'a str,
    },
    /// Neither a request nor a response.
    Unknown,
}

/// An HTTP message that can be rendered as text.
pub trait HttpMessage {
    /// The parts of the start line.
    fn head(&self) -> Head<'_>;

    /// The message headers.
    fn headers(&self) -> &HeaderMap;

    /// The protocol version.
    fn version(&self) -> Version;

    /// The message body.
    fn body_mut(&mut self) -> &mut Body;
}

impl<B> HttpMessage for http::Request<B>
where
    B: BorrowMut<Body>,
{
    fn head(&self) -> Head<'_> {
        Head::Request {
            method: self.method(),
            uri: self.uri(),
        }
    }

    fn headers(&self) -> &HeaderMap {
        self.headers()
    }

    fn version(&self) -> Version {
        self.version()
    }

    fn body_mut(&mut self) -> &mut Body {
        http::Request::body_mut(self).borrow_mut()
    }
}

impl<B> HttpMessage for http::Response<B>
where
    B: BorrowMut<Body>,
{
    fn head(&self) -> Head<'_> {
        Head::Response {
            status: self.status(),
            reason: reason_phrase(self),
        }
    }

    fn headers(&self) -> &HeaderMap {
        self.headers()
    }

    fn version(&self) -> Version {
        self.version()
    }

    fn body_mut(&mut self) -> &mut Body {
        http::Response::body_mut(self).borrow_mut()
    }
}

/// The reason phrase of `response`: a [`ReasonPhrase`] extension, else the canonical phrase, else empty.
pub fn reason_phrase<B>(response: &http::Response<B>) -> &str {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .map(ReasonPhrase::as_str)
        .or_else(|| response.status().canonical_reason())
        .unwrap_or_default()
}

/// The protocol version without the `HTTP/` prefix.
pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

/// The origin-form request target: the path (`/` when empty) and the query, if any.
pub fn request_target(uri: &Uri) -> String {
    let path = match uri.path() {
        "" => "/",
        path => path,
    };
    match uri.query() {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}

/// The first line of `message`.
pub fn start_line<M>(message: &M) -> Result<String, Error>
where
    M: HttpMessage + ?Sized,
{
    let version = version_str(message.version());
    match message.head() {
        Head::Request { method, uri } => {
            let line = format!("{method} {}", request_target(uri));
            Ok(format!("{} HTTP/{version}", line.trim()))
        }
        Head::Response { status, reason } => Ok(format!("HTTP/{version} {} {reason}", status.as_u16())),
        Head::Unknown => Err(Error::UnknownMessageType),
    }
}

fn value_str(value: &http::HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

/// Renders `headers` as `Name: value` lines.
///
/// Values of a repeated header are joined by `, ` except for `Set-Cookie`, which gets one line per value.
pub fn header_lines(headers: &HeaderMap) -> Vec<String> {
    let mut lines = Vec::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let values = headers.get_all(name).iter().map(value_str);
        if *name == SET_COOKIE {
            lines.extend(values.map(|value| format!("{name}: {value}")));
        } else {
            lines.push(format!("{name}: {}", values.collect::<Vec<_>>().join(", ")));
        }
    }
    lines
}

/// All values of the header `name` joined by `, `; empty when absent or when `name` isn't a header name.
pub fn header_line(headers: &HeaderMap, name: &str) -> String {
    let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
        return String::new();
    };
    headers
        .get_all(&name)
        .iter()
        .map(value_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The `Host` a request addresses: the host of `uri`, followed by its port unless that is the scheme's default.
///
/// `None` when `uri` has no host.
pub fn uri_host(uri: &Uri) -> Option<String> {
    let host = uri.host().filter(|host| !host.is_empty())?;
    let default_port = match uri.scheme_str() {
        Some("http") => Some(80),
        Some("https") => Some(443),
        _ => None,
    };
    Some(match uri.port_u16() {
        Some(port) if Some(port) != default_port => format!("{host}:{port}"),
        _ => host.to_string(),
    })
}

/// The header lines of `message` as [`header_lines`] renders them.
///
/// A request without a `Host` header gets one synthesized from its URI, placed before the other headers.
pub fn message_header_lines<M>(message: &M) -> Vec<String>
where
    M: HttpMessage + ?Sized,
{
    let mut lines = Vec::new();
    if let Head::Request { uri, .. } = message.head() {
        if !message.headers().contains_key(HOST) {
            lines.extend(uri_host(uri).map(|host| format!("Host: {host}")));
        }
    }
    lines.extend(header_lines(message.headers()));
    lines
}

/// The start line and headers of `message` followed by the blank line that separates them from the body.
///
/// Headers are those of [`message_header_lines`].
pub fn serialize_head<M>(message: &M) -> Result<String, Error>
where
    M: HttpMessage + ?Sized,
{
    let mut msg = start_line(message)?;
    for line in message_header_lines(message) {
        msg.push_str(CRLF);
        msg.push_str(&line);
    }
    msg.push_str(CRLF);
    msg.push_str(CRLF);
    Ok(msg)
}

/// The full text of `message`: [`serialize_head`] followed by the captured, possibly compressed, body.
///
/// The body's read position is left where it was.
pub fn serialize_full<M>(message: &mut M) -> Result<String, Error>
where
    M: HttpMessage + ?Sized,
{
    let mut msg = serialize_head(message)?;
    let body = capture_body(message.body_mut())?;
    msg.push_str(&compress(&body)?);
    Ok(msg)
}

/// [`compress_with_threshold`] using [`COMPRESSION_THRESHOLD`].
pub fn compress(payload: &str) -> Result<Cow<'_, str>, Error> {
    compress_with_threshold(payload, COMPRESSION_THRESHOLD)
}

/// Gzips `payload` at the highest level and base64-encodes it in lines of 76 characters, when it is at
/// least `threshold` bytes long. Shorter payloads are returned as they are.
pub fn compress_with_threshold(payload: &str, threshold: usize) -> Result<Cow<'_, str>, Error> {
    if payload.len() < threshold {
        return Ok(Cow::Borrowed(payload));
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    encoder.write_all(payload.as_bytes()).map_err(Error::Compression)?;
    let compressed = encoder.finish().map_err(Error::Compression)?;
    let encoded = base64_simd::STANDARD.encode_to_string(&compressed);

    let lines: Vec<&str> = encoded
        .as_bytes()
        .chunks(LINE_WIDTH)
        // base64 output is ASCII, so every chunk boundary is a char boundary
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect();
    let wrapped = lines.join(CRLF).trim_end().to_string();

    tracing::trace!(
        original = payload.len(),
        compressed = compressed.len(),
        "compressed message body for logging"
    );
    Ok(Cow::Owned(wrapped))
}
