/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use http::HeaderName;
use regex::Regex;

use crate::error::Error;
use crate::obfuscator::SharedObfuscator;

/// A redaction rule: a key and, optionally, the obfuscator to use for it.
///
/// Rules without an obfuscator use the formatter's default obfuscator, as it is when the message is formatted.
///
/// ```
/// use obfuscated_http_log::formatter::Rule;
/// use obfuscated_http_log::obfuscator::StringObfuscator;
///
/// let rules: Vec<Rule> = vec![
///     "token".into(),
///     ("secret", StringObfuscator::new("#", 3)).into(),
/// ];
/// assert_eq!("secret", rules[1].key());
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    key: String,
    obfuscator: Option<SharedObfuscator>,
}

impl Rule {
    /// A rule using the default obfuscator.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            obfuscator: None,
        }
    }

    /// A rule with its own obfuscator.
    pub fn with_obfuscator(key: impl Into<String>, obfuscator: impl Into<SharedObfuscator>) -> Self {
        Self {
            key: key.into(),
            obfuscator: Some(obfuscator.into()),
        }
    }

    /// The key the rule matches.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The rule's own obfuscator, if it has one.
    pub fn obfuscator(&self) -> Option<&SharedObfuscator> {
        self.obfuscator.as_ref()
    }
}

impl From<&str> for Rule {
    fn from(key: &str) -> Self {
        Rule::new(key)
    }
}

impl From<String> for Rule {
    fn from(key: String) -> Self {
        Rule::new(key)
    }
}

impl<K, O> From<(K, O)> for Rule
where
    K: Into<String>,
    O: Into<SharedObfuscator>,
{
    fn from((key, obfuscator): (K, O)) -> Self {
        Rule::with_obfuscator(key, obfuscator)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Entry<K> {
    pub(crate) key: K,
    source: String,
    obfuscator: Option<SharedObfuscator>,
}

impl<K> Entry<K> {
    pub(crate) fn obfuscator_or<'a>(&'a self, default: &'a SharedObfuscator) -> &'a SharedObfuscator {
        self.obfuscator.as_ref().unwrap_or(default)
    }
}

/// An ordered set of validated rules. A key given twice keeps its first position and its last obfuscator.
#[derive(Debug, Clone)]
pub(crate) struct RuleSet<K> {
    entries: Vec<Entry<K>>,
}

impl<K> Default for RuleSet<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K> RuleSet<K> {
    fn build<I, R>(rules: I, parse: impl Fn(&str) -> Result<K, Error>) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        let mut entries: Vec<Entry<K>> = Vec::new();
        for rule in rules {
            let Rule { key, obfuscator } = rule.into();
            if key.is_empty() {
                return Err(Error::invalid_rule("rule key must not be empty"));
            }
            let parsed = parse(&key)?;
            match entries.iter_mut().find(|entry| entry.source == key) {
                Some(existing) => {
                    existing.key = parsed;
                    existing.obfuscator = obfuscator;
                }
                None => entries.push(Entry {
                    key: parsed,
                    source: key,
                    obfuscator,
                }),
            }
        }
        Ok(Self { entries })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry<K>> {
        self.entries.iter()
    }

    /// The entry whose key was spelled exactly `key`.
    pub(crate) fn find(&self, key: &str) -> Option<&Entry<K>> {
        self.entries.iter().find(|entry| entry.source == key)
    }
}

impl RuleSet<String> {
    pub(crate) fn keys<I, R>(rules: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self::build(rules, |key| Ok(key.to_string()))
    }
}

impl RuleSet<HeaderName> {
    pub(crate) fn headers<I, R>(rules: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self::build(rules, |key| {
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| Error::invalid_rule(format!("`{key}` is not a valid header name")))
        })
    }
}

impl RuleSet<Regex> {
    pub(crate) fn patterns<I, R>(rules: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self::build(rules, |key| {
            Regex::new(key).map_err(|err| Error::path_redaction(err.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscator::{Obfuscate, StringObfuscator};

    #[test]
    fn empty_key_is_rejected() {
        let err = RuleSet::keys(["token", ""]).unwrap_err();
        assert!(matches!(err, Error::InvalidRuleDefinition(_)), "{err:?}");
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let err = RuleSet::headers(["Authorization", "Bad Header"]).unwrap_err();
        assert!(matches!(err, Error::InvalidRuleDefinition(_)), "{err:?}");
    }

    #[test]
    fn header_names_are_normalized() {
        let rules = RuleSet::headers(["X-Api-Key"]).unwrap();
        assert_eq!("x-api-key", rules.iter().next().unwrap().key.as_str());
    }

    #[test]
    fn invalid_pattern_is_a_path_redaction_error() {
        let err = RuleSet::patterns(["(oops"]).unwrap_err();
        assert!(matches!(err, Error::PathRedaction { .. }), "{err:?}");
    }

    #[test]
    fn repeated_key_keeps_position_and_last_obfuscator() {
        let rules = RuleSet::keys([
            Rule::new("a"),
            Rule::new("b"),
            Rule::with_obfuscator("a", StringObfuscator::new("#", 2)),
        ])
        .unwrap();
        assert_eq!(2, rules.iter().count());
        let default = SharedObfuscator::default();
        let first = rules.iter().next().unwrap();
        assert_eq!("a", first.key);
        assert_eq!("##", first.obfuscator_or(&default).obfuscate("x"));
        assert_eq!("**********", rules.find("b").unwrap().obfuscator_or(&default).obfuscate("x"));
        assert!(rules.find("c").is_none());
    }
}
