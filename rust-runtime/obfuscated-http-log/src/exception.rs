/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Errors describing a failed exchange without leaking the bot token of the request URI.

use std::borrow::BorrowMut;
use std::error::Error as StdError;
use std::fmt;

use http::{Request, Response, StatusCode};

use crate::body::{capture_body, Body};
use crate::error::Error;
use crate::message::reason_phrase;
use crate::obfuscator::{TokenObfuscator, TELEGRAM_BOT_TOKEN_PATTERN};
use crate::uri::redact_path_segment;

type BoxError = Box<dyn StdError + Send + Sync>;

const SUMMARY_LENGTH: usize = 120;

/// What went wrong.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// The server answered with a 4xx status.
    Client,
    /// The server answered with a 5xx status.
    Server,
    /// The server answered with a status that isn't an error status.
    Unsuccessful,
    /// No response was received.
    Transfer,
}

/// A failed exchange, described with the bot token removed from the request URI.
#[derive(Debug)]
pub struct RequestError {
    kind: RequestErrorKind,
    status: Option<StatusCode>,
    message: String,
    source: Option<BoxError>,
}

impl RequestError {
    /// Describes the exchange of `request` and `response`, or the failure to get a response.
    ///
    /// With a response the message reads ``Client error: `GET https://…/bot**********/getMe` resulted in a `404
    /// Not Found` response``, followed by a short summary of a printable response body. The response body's read
    /// position is left where it was.
    pub fn new<B>(
        request: &Request<B>,
        response: Option<&mut Response<B>>,
        source: Option<BoxError>,
    ) -> Result<Self, Error>
    where
        B: BorrowMut<Body>,
    {
        let Some(response) = response else {
            return Ok(Self {
                kind: RequestErrorKind::Transfer,
                status: None,
                message: "Error completing request".to_string(),
                source,
            });
        };

        let status = response.status();
        let (kind, label) = match status.as_u16() / 100 {
            4 => (RequestErrorKind::Client, "Client error"),
            5 => (RequestErrorKind::Server, "Server error"),
            _ => (RequestErrorKind::Unsuccessful, "Unsuccessful request"),
        };
        let uri = redact_path_segment(
            request.uri().clone(),
            TELEGRAM_BOT_TOKEN_PATTERN,
            &TokenObfuscator::telegram_bot_token(),
        )?;

        let mut message = format!(
            "{label}: `{} {uri}` resulted in a `{} {}` response",
            request.method(),
            status.as_u16(),
            reason_phrase(response),
        );
        if let Some(summary) = summarize(response.body_mut().borrow_mut())? {
            message.push_str(":\n");
            message.push_str(&summary);
            message.push('\n');
        }

        Ok(Self {
            kind,
            status: Some(status),
            message,
            source,
        })
    }

    /// What went wrong.
    pub fn kind(&self) -> RequestErrorKind {
        self.kind
    }

    /// The status of the response, if there was one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

/// The first characters of a seekable, non-empty, printable body.
fn summarize(body: &mut Body) -> Result<Option<String>, Error> {
    if !body.is_seekable() || body.size() == Some(0) {
        return Ok(None);
    }

    let text = capture_body(body)?;
    if text
        .chars()
        .any(|c| (c.is_control() && !matches!(c, '\n' | '\r' | '\t')) || c == char::REPLACEMENT_CHARACTER)
    {
        return Ok(None);
    }

    let mut summary: String = text.chars().take(SUMMARY_LENGTH).collect();
    if text.chars().nth(SUMMARY_LENGTH).is_some() {
        summary.push_str(" (truncated...)");
    }
    Ok(Some(summary))
}
