/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Log formatting for HTTP exchanges that never lets a secret through.
//!
//! [`ObfuscatedMessageFormatter`] renders a request, an optional response and an optional error through a
//! template of `{placeholder}`s. Before rendering, the user-info password, matching URI path segments, query
//! parameters, headers and JSON body fields are replaced by an [`Obfuscate`](obfuscator::Obfuscate)
//! implementation, `**********` unless configured otherwise. The building blocks are public too: the URI
//! redactors live in [`uri`], message serialization and body compression in [`message`].

pub mod body;
pub mod config;
pub mod error;
pub mod exception;
pub mod formatter;
pub mod log;
pub mod message;
pub mod obfuscator;
pub mod time;
pub mod uri;

pub use error::Error;
pub use formatter::ObfuscatedMessageFormatter;
