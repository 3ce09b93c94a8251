/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Message bodies and position-preserving capture.

use std::borrow::{Borrow, BorrowMut};
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use bytes::Bytes;

use crate::error::Error;

/// The body of a request or response.
///
/// A body is either buffered in memory, in which case it can be sought and its size is known, or a
/// forward-only stream over any [`Read`] implementation.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Buffered(Cursor<Bytes>),
    Streaming(Box<dyn Read + Send>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Buffered(cursor) => f
                .debug_struct("Body")
                .field("size", &cursor.get_ref().len())
                .field("position", &cursor.position())
                .finish(),
            Inner::Streaming(_) => f.debug_struct("Body").field("streaming", &true).finish(),
        }
    }
}

impl Body {
    /// An empty, seekable body.
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// A forward-only body reading from `reader`. It can't be rewound, so capturing it consumes it.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Inner::Streaming(Box::new(reader)),
        }
    }

    /// Returns `true` when the read position can be queried and moved.
    pub fn is_seekable(&self) -> bool {
        matches!(self.inner, Inner::Buffered(_))
    }

    /// The total size in bytes, when known.
    pub fn size(&self) -> Option<u64> {
        match &self.inner {
            Inner::Buffered(cursor) => Some(cursor.get_ref().len() as u64),
            Inner::Streaming(_) => None,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Buffered(cursor) => cursor.read(buf),
            Inner::Streaming(reader) => reader.read(buf),
        }
    }
}

impl Seek for Body {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Inner::Buffered(cursor) => cursor.seek(pos),
            Inner::Streaming(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "streaming body is not seekable",
            )),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            inner: Inner::Buffered(Cursor::new(bytes)),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Self::from(Bytes::from(data))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::from(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::from(Bytes::from_static(s.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(data: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(data))
    }
}

/// The body carried by a redacted view of a message.
///
/// Until the body is rewritten the view shares the caller's stream, so positions moved while capturing are
/// the caller's positions and must be restored.
#[derive(Debug)]
pub enum BodyRef<'a> {
    /// The caller's own body.
    Borrowed(&'a mut Body),
    /// A body produced by redaction.
    Owned(Body),
}

impl Borrow<Body> for BodyRef<'_> {
    fn borrow(&self) -> &Body {
        match self {
            BodyRef::Borrowed(body) => body,
            BodyRef::Owned(body) => body,
        }
    }
}

impl BorrowMut<Body> for BodyRef<'_> {
    fn borrow_mut(&mut self) -> &mut Body {
        match self {
            BodyRef::Borrowed(body) => body,
            BodyRef::Owned(body) => body,
        }
    }
}

/// Reads the whole body into a string without disturbing its read position.
///
/// For a seekable body the position is recorded, the body is rewound and read, and the position is restored
/// whether or not reading succeeded. A streaming body is read from wherever it currently is, which consumes
/// it. Invalid UTF-8 is replaced.
pub fn capture_body(body: &mut Body) -> Result<String, Error> {
    let mut buf = Vec::new();
    if !body.is_seekable() {
        body.read_to_end(&mut buf).map_err(Error::Body)?;
        return Ok(String::from_utf8_lossy(&buf).into_owned());
    }

    let position = body.stream_position().map_err(Error::Body)?;
    let read = body.rewind().and_then(|()| body.read_to_end(&mut buf));
    let restored = body.seek(SeekFrom::Start(position));
    read.map_err(Error::Body)?;
    restored.map_err(Error::Body)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn capture_restores_position() {
        let mut body = Body::from("hello world");
        let mut prefix = [0u8; 6];
        body.read_exact(&mut prefix).unwrap();
        assert_eq!(6, body.stream_position().unwrap());

        assert_eq!("hello world", capture_body(&mut body).unwrap());
        assert_eq!(6, body.stream_position().unwrap());

        let mut rest = String::new();
        body.read_to_string(&mut rest).unwrap();
        assert_eq!("world", rest);
    }

    #[test]
    fn capture_at_end_restores_end() {
        let mut body = Body::from(b"abc".to_vec());
        body.seek(SeekFrom::End(0)).unwrap();
        assert_eq!("abc", capture_body(&mut body).unwrap());
        assert_eq!(3, body.stream_position().unwrap());
    }

    #[test]
    fn capture_streaming_reads_remaining() {
        let mut body = Body::from_reader(Cursor::new(b"stream-body".to_vec()));
        assert!(!body.is_seekable());
        assert_eq!(None, body.size());
        let mut first = [0u8; 7];
        body.read_exact(&mut first).unwrap();
        assert_eq!("body", capture_body(&mut body).unwrap());
        assert_eq!("", capture_body(&mut body).unwrap());
    }

    #[test]
    fn streaming_body_refuses_seek() {
        let mut body = Body::from_reader(io::empty());
        let err = body.seek(SeekFrom::Start(0)).unwrap_err();
        assert_eq!(io::ErrorKind::Unsupported, err.kind());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut body = Body::from(vec![b'a', 0xff, b'b']);
        assert_eq!("a\u{fffd}b", capture_body(&mut body).unwrap());
    }

    #[test]
    fn body_ref_shares_the_borrowed_stream() {
        let mut body = Body::from("0123456789");
        {
            let mut view = BodyRef::Borrowed(&mut body);
            let inner: &mut Body = view.borrow_mut();
            inner.seek(SeekFrom::Start(4)).unwrap();
        }
        assert_eq!(4, body.stream_position().unwrap());
    }
}
