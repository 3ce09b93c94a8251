/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Clock abstraction and the timestamp formats used by the `ts`, `date_iso_8601` and `date_common_log`
//! placeholders.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::SystemTime;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Trait with a `now()` function returning the current time
pub trait TimeSource: Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// Time source delegating to `SystemTime::now()`
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Creates a new SystemTimeSource
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Time source that always returns the same time.
#[derive(Debug, Clone, Copy)]
pub struct StaticTimeSource {
    time: SystemTime,
}

impl StaticTimeSource {
    /// Creates a time source pinned to `time`.
    pub fn new(time: SystemTime) -> Self {
        Self { time }
    }
}

impl TimeSource for StaticTimeSource {
    fn now(&self) -> SystemTime {
        self.time
    }
}

/// A cheaply cloneable, type-erased [`TimeSource`].
#[derive(Debug, Clone)]
pub struct SharedTimeSource(Arc<dyn TimeSource>);

impl SharedTimeSource {
    /// Wraps `source`.
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self(Arc::new(source))
    }
}

impl Default for SharedTimeSource {
    fn default() -> Self {
        Self::new(SystemTimeSource::new())
    }
}

impl TimeSource for SharedTimeSource {
    fn now(&self) -> SystemTime {
        self.0.now()
    }
}

impl From<StaticTimeSource> for SharedTimeSource {
    fn from(source: StaticTimeSource) -> Self {
        Self::new(source)
    }
}

impl From<SystemTimeSource> for SharedTimeSource {
    fn from(source: SystemTimeSource) -> Self {
        Self::new(source)
    }
}

/// `2024-01-02T03:04:05+00:00`, always in UTC.
pub fn iso_8601(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ))
        .unwrap_or_default()
}

/// `02/Jan/2024:03:04:05 +0000`, in the local offset when it can be determined and UTC otherwise.
pub fn common_log(time: SystemTime) -> String {
    let utc = OffsetDateTime::from(time);
    let offset = UtcOffset::local_offset_at(utc).unwrap_or(UtcOffset::UTC);
    common_log_at(time, offset)
}

pub(crate) fn common_log_at(time: SystemTime, offset: UtcOffset) -> String {
    OffsetDateTime::from(time)
        .to_offset(offset)
        .format(format_description!(
            "[day]/[month repr:short]/[year]:[hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
        ))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, UNIX_EPOCH};

    // 2024-01-02T03:04:05Z
    fn fixed() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_704_164_645)
    }

    #[test]
    fn iso_8601_is_utc() {
        assert_eq!("2024-01-02T03:04:05+00:00", iso_8601(fixed()));
    }

    #[test]
    fn common_log_utc() {
        assert_eq!("02/Jan/2024:03:04:05 +0000", common_log_at(fixed(), UtcOffset::UTC));
    }

    #[test]
    fn common_log_with_offset() {
        let offset = UtcOffset::from_hms(-5, -30, 0).unwrap();
        assert_eq!("01/Jan/2024:21:34:05 -0530", common_log_at(fixed(), offset));
    }

    #[test]
    fn static_source_is_stable() {
        let source = SharedTimeSource::from(StaticTimeSource::new(fixed()));
        assert_eq!(fixed(), source.now());
        assert_eq!(source.now(), source.clone().now());
    }
}
