/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Obfuscators turn a sensitive value into a fixed-shape redaction marker.
//!
//! The built-in obfuscators never look at the value they replace: the output of [`StringObfuscator`] is always
//! `fill` repeated `repeat` times, so the length of a secret can't be recovered from a log line.

use std::fmt;
use std::sync::Arc;

/// Default fill used by [`StringObfuscator::default`].
pub const DEFAULT_FILL: &str = "*";

/// Default repeat count used by [`StringObfuscator::default`].
pub const DEFAULT_REPEAT: usize = 10;

/// Matches `/bot<digits>:<token>` inside a Telegram Bot API path.
pub const TELEGRAM_BOT_TOKEN_PATTERN: &str = r"/bot\d+:[A-Za-z0-9_\-]+";

/// Prefix kept in front of an obfuscated Telegram bot token.
pub const TELEGRAM_BOT_TOKEN_PREFIX: &str = "/bot";

/// A redaction strategy.
pub trait Obfuscate: fmt::Debug + Send + Sync {
    /// Returns the text that replaces `value` in the log output.
    fn obfuscate(&self, value: &str) -> String;
}

/// Replaces any value with `fill` repeated `repeat` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringObfuscator {
    fill: String,
    repeat: usize,
}

impl StringObfuscator {
    /// Creates an obfuscator producing `fill` repeated `repeat` times.
    pub fn new(fill: impl Into<String>, repeat: usize) -> Self {
        Self {
            fill: fill.into(),
            repeat,
        }
    }

    /// The text that gets repeated.
    pub fn fill(&self) -> &str {
        &self.fill
    }

    /// How many times [`fill`](Self::fill) is repeated.
    pub fn repeat(&self) -> usize {
        self.repeat
    }
}

impl Default for StringObfuscator {
    fn default() -> Self {
        Self::new(DEFAULT_FILL, DEFAULT_REPEAT)
    }
}

impl Obfuscate for StringObfuscator {
    fn obfuscate(&self, _value: &str) -> String {
        self.fill.repeat(self.repeat)
    }
}

/// Wraps another obfuscator and keeps a literal prefix in front of its output.
///
/// Useful when the redacted span was matched together with some context that should stay readable,
/// e.g. the `/bot` in `/bot123:SECRET`.
#[derive(Debug, Clone)]
pub struct TokenObfuscator {
    prefix: String,
    inner: SharedObfuscator,
}

impl TokenObfuscator {
    /// Creates a token obfuscator emitting `prefix` followed by `inner`'s output.
    pub fn new(prefix: impl Into<String>, inner: impl Into<SharedObfuscator>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: inner.into(),
        }
    }

    /// The obfuscator pairing with [`TELEGRAM_BOT_TOKEN_PATTERN`].
    pub fn telegram_bot_token() -> Self {
        Self::new(TELEGRAM_BOT_TOKEN_PREFIX, StringObfuscator::default())
    }

    /// The literal prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Obfuscate for TokenObfuscator {
    fn obfuscate(&self, value: &str) -> String {
        let mut out = self.prefix.clone();
        out.push_str(&self.inner.obfuscate(value));
        out
    }
}

/// Adapts a closure into an [`Obfuscate`] implementation.
#[derive(Clone)]
pub struct ObfuscateFn<F>(F);

impl<F> fmt::Debug for ObfuscateFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObfuscateFn").field(&"...").finish()
    }
}

impl<F> Obfuscate for ObfuscateFn<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn obfuscate(&self, value: &str) -> String {
        (self.0)(value)
    }
}

/// Builds an obfuscator from a closure.
///
/// ```
/// use obfuscated_http_log::obfuscator::{obfuscate_fn, Obfuscate};
///
/// let last_four = obfuscate_fn(|value: &str| format!("...{}", &value[value.len().saturating_sub(4)..]));
/// assert_eq!("...7890", last_four.obfuscate("1234567890"));
/// ```
pub fn obfuscate_fn<F>(f: F) -> ObfuscateFn<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    ObfuscateFn(f)
}

/// A cheaply cloneable, type-erased obfuscator.
#[derive(Clone, Debug)]
pub struct SharedObfuscator(Arc<dyn Obfuscate>);

impl SharedObfuscator {
    /// Wraps `obfuscator`.
    pub fn new(obfuscator: impl Obfuscate + 'static) -> Self {
        Self(Arc::new(obfuscator))
    }
}

impl Default for SharedObfuscator {
    fn default() -> Self {
        Self::new(StringObfuscator::default())
    }
}

impl Obfuscate for SharedObfuscator {
    fn obfuscate(&self, value: &str) -> String {
        self.0.obfuscate(value)
    }
}

impl From<StringObfuscator> for SharedObfuscator {
    fn from(obfuscator: StringObfuscator) -> Self {
        Self::new(obfuscator)
    }
}

impl From<TokenObfuscator> for SharedObfuscator {
    fn from(obfuscator: TokenObfuscator) -> Self {
        Self::new(obfuscator)
    }
}

impl<F> From<ObfuscateFn<F>> for SharedObfuscator
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    fn from(obfuscator: ObfuscateFn<F>) -> Self {
        Self::new(obfuscator)
    }
}

impl From<Arc<dyn Obfuscate>> for SharedObfuscator {
    fn from(obfuscator: Arc<dyn Obfuscate>) -> Self {
        Self(obfuscator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_ten_stars() {
        assert_eq!("**********", StringObfuscator::default().obfuscate("secret"));
    }

    #[test]
    fn output_ignores_input() {
        let obfuscator = StringObfuscator::new("#", 3);
        assert_eq!("###", obfuscator.obfuscate(""));
        assert_eq!("###", obfuscator.obfuscate("ünïcödé"));
        assert_eq!("###", obfuscator.obfuscate(&"x".repeat(100_000)));
    }

    #[test]
    fn multi_char_fill() {
        let obfuscator = StringObfuscator::new("ab", 2);
        assert_eq!("abab", obfuscator.obfuscate("whatever"));
    }

    #[test]
    fn zero_repeat_is_empty() {
        assert_eq!("", StringObfuscator::new("*", 0).obfuscate("secret"));
    }

    #[test]
    fn telegram_token_keeps_prefix() {
        let obfuscator = TokenObfuscator::telegram_bot_token();
        assert_eq!("/bot**********", obfuscator.obfuscate("/bot123:SECRET"));
    }

    #[test]
    fn shared_delegates() {
        let shared = SharedObfuscator::from(obfuscate_fn(|value: &str| value.to_uppercase()));
        assert_eq!("ABC", shared.obfuscate("abc"));
        assert_eq!("ABC", shared.clone().obfuscate("abc"));
    }

    proptest::proptest! {
        #[test]
        fn length_is_fill_times_repeat(fill in ".{0,4}", repeat in 0usize..64, input in ".*") {
            let obfuscator = StringObfuscator::new(fill.clone(), repeat);
            proptest::prop_assert_eq!(obfuscator.obfuscate(&input).len(), fill.len() * repeat);
        }
    }
}
