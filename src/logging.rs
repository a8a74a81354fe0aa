//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Diagnostic verbosity control.
//!
//! There is no embedded C library log level to bridge anymore: every
//! diagnostic in this crate goes through the `log` crate directly (see
//! `error::push`, which both appends to the thread-local error list and
//! emits a `log::warn!`). These helpers just adjust the global max level,
//! for applications that want `yang_ctx` to be quieter or louder than the
//! rest of their logging setup.

/// Only log errors.
pub fn set_log_level_error() {
    log::set_max_level(log::LevelFilter::Error);
}

/// Log errors and warnings.
pub fn set_log_level_warn() {
    log::set_max_level(log::LevelFilter::Warn);
}

/// Log errors, warnings and informational messages.
pub fn set_log_level_debug() {
    log::set_max_level(log::LevelFilter::Debug);
}

/// Log everything, including per-node trace output from the LYB codec.
pub fn set_log_level_trace() {
    log::set_max_level(log::LevelFilter::Trace);
}
