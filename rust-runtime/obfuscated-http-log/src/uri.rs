/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Redaction of the sensitive parts of a [`Uri`]: the user-info password, query string values and path
//! segments matched by a pattern.
//!
//! Every function takes the [`Uri`] by value and hands back either the very same value (nothing matched) or a
//! freshly assembled one. Obfuscator output is percent-encoded where the URI grammar requires it, so a
//! redacted URI is always a valid [`Uri`].

use std::borrow::Cow;

use http::uri::PathAndQuery;
use http::Uri;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};

use crate::error::Error;
use crate::obfuscator::Obfuscate;

/// Everything except unreserved characters and sub-delimiters.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'%');

const PATH: &AsciiSet = &USERINFO.remove(b':').remove(b'@').remove(b'/');

const QUERY: &AsciiSet = &PATH.remove(b'?');

/// The value(s) bound to one key of a parsed query string.
///
/// `None` means the key appeared without any `=`, which is distinct from an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// The key appeared once.
    Single(Option<String>),
    /// The key appeared several times; values are in encounter order.
    Multiple(Vec<Option<String>>),
}

impl QueryValue {
    fn push(&mut self, value: Option<String>) {
        match self {
            QueryValue::Single(first) => *self = QueryValue::Multiple(vec![first.take(), value]),
            QueryValue::Multiple(values) => values.push(value),
        }
    }

    /// Iterates over every value bound to the key.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        let values: &[Option<String>] = match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Multiple(values) => values,
        };
        values.iter().map(Option::as_deref)
    }
}

/// A decoded query string. Keys keep the order of their first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParameters {
    /// Returns `true` when `key` appeared in the query string, with or without a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value(s) bound to `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates over the keys and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no key was parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, value: Option<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((key, QueryValue::Single(value))),
        }
    }
}

fn decode_query_component(component: &str) -> String {
    let component = component.replace('+', " ");
    percent_decode_str(&component).decode_utf8_lossy().into_owned()
}

/// Parses a query string, keeping duplicate keys.
///
/// The string is split on `&`, every piece is split on its first `=`, and both halves are percent-decoded
/// with `+` read as a space. A piece without `=` yields a `None` value.
pub fn parse_query_string(query: &str) -> QueryParameters {
    let mut parameters = QueryParameters::default();
    if query.is_empty() {
        return parameters;
    }

    for piece in query.split('&') {
        let (key, value) = match piece.split_once('=') {
            Some((key, value)) => (key, Some(decode_query_component(value))),
            None => (piece, None),
        };
        parameters.insert(decode_query_component(key), value);
    }

    parameters
}

/// Percent-encodes everything outside `set`, leaving well-formed `%XX` escapes alone and escaping stray `%`.
fn encode_component(input: &str, set: &'static AsciiSet) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..idx], set));
        let tail = &rest[idx + 1..];
        let well_formed = tail.len() >= 2 && tail.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit);
        out.push_str(if well_formed { "%" } else { "%25" });
        rest = tail;
    }
    out.extend(utf8_percent_encode(rest, set));
    out
}

/// Escapes `%`, `+` and the query separators so a decoded component reads back the same after reassembly.
fn escape_query_component(input: &str) -> Cow<'_, str> {
    if !input.contains(['%', '+', '=', '&']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '%' => out.push_str("%25"),
            '+' => out.push_str("%2B"),
            '=' => out.push_str("%3D"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn with_path_and_query(uri: Uri, path: &str, query: Option<&str>) -> Result<Uri, Error> {
    let path_and_query = match query {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).map_err(http::Error::from)?);
    Ok(Uri::from_parts(parts).map_err(http::Error::from)?)
}

/// Replaces the password in the user-info of `uri`. The user name is kept verbatim.
///
/// Returns `uri` untouched when the user-info has no `:` separator.
pub fn redact_user_info_password<O>(uri: Uri, obfuscator: &O) -> Result<Uri, Error>
where
    O: Obfuscate + ?Sized,
{
    let Some(authority) = uri.authority() else {
        return Ok(uri);
    };
    let Some((user_info, host_port)) = authority.as_str().rsplit_once('@') else {
        return Ok(uri);
    };
    let Some((user, password)) = user_info.split_once(':') else {
        return Ok(uri);
    };

    let authority = format!(
        "{user}:{}@{host_port}",
        encode_component(&obfuscator.obfuscate(password), USERINFO)
    );
    let mut parts = uri.into_parts();
    parts.authority = Some(authority.parse().map_err(http::Error::from)?);
    Ok(Uri::from_parts(parts).map_err(http::Error::from)?)
}

/// Replaces every value of the query parameter `parameter`.
///
/// Returns `uri` untouched when its query is empty or the parameter is absent. Otherwise the query is
/// reassembled key by key: `%`, `+`, `=` and `&` inside keys and values are escaped, other values pass through
/// as decoded, and whatever still needs percent-encoding is encoded when the URI is rebuilt. Every other
/// parameter therefore decodes to the same value as before.
pub fn redact_query_parameter<O>(uri: Uri, parameter: &str, obfuscator: &O) -> Result<Uri, Error>
where
    O: Obfuscate + ?Sized,
{
    let query = uri.query().unwrap_or_default();
    if query.is_empty() {
        return Ok(uri);
    }

    let parameters = parse_query_string(query);
    if !parameters.contains_key(parameter) {
        return Ok(uri);
    }

    let mut pairs = Vec::new();
    for (key, values) in parameters.iter() {
        let final_key = escape_query_component(key);
        for value in values.iter() {
            let value = value.unwrap_or_default();
            let value = if key == parameter {
                Cow::Owned(obfuscator.obfuscate(value))
            } else {
                Cow::Borrowed(value)
            };
            pairs.push(format!("{final_key}={}", escape_query_component(&value)));
        }
    }

    let query = encode_component(&pairs.join("&"), QUERY);
    let path = uri.path().to_string();
    with_path_and_query(uri, &path, Some(&query))
}

/// Replaces every match of `pattern` in the path of `uri` with the obfuscated match.
///
/// `pattern` uses [`regex`] syntax. An invalid pattern fails with [`Error::PathRedaction`]. When nothing
/// matched, `uri` is returned as is.
pub fn redact_path_segment<O>(uri: Uri, pattern: &str, obfuscator: &O) -> Result<Uri, Error>
where
    O: Obfuscate + ?Sized,
{
    let regex = Regex::new(pattern).map_err(|err| Error::path_redaction(err.to_string()))?;
    redact_path_with(uri, &regex, obfuscator)
}

pub(crate) fn redact_path_with<O>(uri: Uri, regex: &Regex, obfuscator: &O) -> Result<Uri, Error>
where
    O: Obfuscate + ?Sized,
{
    let replaced = match regex.replace_all(uri.path(), |captures: &Captures<'_>| obfuscator.obfuscate(&captures[0])) {
        Cow::Borrowed(_) => None,
        Cow::Owned(replaced) => Some(replaced),
    };
    let Some(replaced) = replaced.filter(|replaced| replaced != uri.path()) else {
        return Ok(uri);
    };

    let path = encode_component(&replaced, PATH);
    let query = uri.query().map(str::to_string);
    with_path_and_query(uri, &path, query.as_deref())
}
