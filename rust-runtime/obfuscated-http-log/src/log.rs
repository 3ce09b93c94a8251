/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Emits formatted exchanges as [`tracing`] events.
//!
//! The installed subscriber decides where the lines end up.

use std::borrow::BorrowMut;
use std::error::Error as StdError;

use http::{Request, Response};
use tracing::Level;

use crate::body::Body;
use crate::error::Error;
use crate::formatter::ObfuscatedMessageFormatter;

/// Formats an exchange with `formatter` and emits the result at `level`.
///
/// The event is emitted under the `obfuscated_http_log::log` target with the formatted text as its message.
/// A formatting failure is returned and nothing is emitted.
pub fn log_exchange<B>(
    formatter: &ObfuscatedMessageFormatter,
    level: Level,
    request: &mut Request<B>,
    response: Option<&mut Response<B>>,
    error: Option<&(dyn StdError + 'static)>,
) -> Result<(), Error>
where
    B: BorrowMut<Body>,
{
    let line = formatter.format(request, response, error)?;
    match level {
        Level::TRACE => tracing::trace!("{line}"),
        Level::DEBUG => tracing::debug!("{line}"),
        Level::INFO => tracing::info!("{line}"),
        Level::WARN => tracing::warn!("{line}"),
        _ => tracing::error!("{line}"),
    }
    Ok(())
}
