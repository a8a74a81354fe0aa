//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Error taxonomy and per-thread diagnostic trail.
//!
//! The variants below are a direct rendition of the taxonomy a YANG context
//! has to report: a failed filesystem/OS call, a request that is
//! inconsistent with the context's current state, an allocation failure, a
//! data-tree validation failure reported by an external collaborator, and an
//! internal invariant violation that should never occur on well-formed input.

use std::cell::RefCell;

/// A convenience wrapper around `Result` for `yang_ctx::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the context registry and the LYB codec.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A filesystem or OS call failed (e.g. an unreadable search directory).
    #[error("system error: {message}")]
    Sys {
        message: String,
        path: Option<String>,
    },

    /// The request is inconsistent with the context (missing module, not
    /// implemented, internal module targeted for removal, malformed LYB
    /// magic, unknown schema hash in strict mode, etc).
    #[error("invalid request: {message}")]
    Invalid {
        message: String,
        schema_path: Option<String>,
        data_path: Option<String>,
    },

    /// Allocation failed. Rust's global allocator aborts the process on
    /// exhaustion in the common case, so this variant exists for API parity
    /// with the taxonomy and for collaborators that perform their own
    /// fallible allocation (e.g. pre-sized buffers).
    #[error("allocation failed: {message}")]
    Alloc { message: String },

    /// Data-tree validation failed. Reported by collaborators outside this
    /// crate (the validator is not part of the core); this crate only
    /// propagates it.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        data_path: Option<String>,
    },

    /// Internal invariant violation (assertion-grade; should never occur on
    /// well-formed input).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn sys(message: impl Into<String>) -> Error {
        Error::Sys {
            message: message.into(),
            path: None,
        }
    }

    pub fn sys_path(message: impl Into<String>, path: impl Into<String>) -> Error {
        Error::Sys {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Error {
        Error::Invalid {
            message: message.into(),
            schema_path: None,
            data_path: None,
        }
    }

    pub fn invalid_schema_path(
        message: impl Into<String>,
        schema_path: impl Into<String>,
    ) -> Error {
        Error::Invalid {
            message: message.into(),
            schema_path: Some(schema_path.into()),
            data_path: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Error {
        Error::Internal {
            message: message.into(),
        }
    }

    /// The message component common to every variant, ignoring the
    /// structured path/tag fields.
    pub fn message(&self) -> &str {
        match self {
            Error::Sys { message, .. }
            | Error::Invalid { message, .. }
            | Error::Alloc { message }
            | Error::Validation { message, .. }
            | Error::Internal { message } => message,
        }
    }
}

thread_local!(
    static ERROR_LIST: RefCell<Vec<Error>> = const { RefCell::new(Vec::new()) }
);

/// Appends an error to the calling thread's diagnostic trail without
/// returning it. Used for secondary warnings that accompany a successful
/// operation (e.g. a search-dir filename/content mismatch during module
/// loading), per the per-thread error-list model.
pub fn push(err: Error) {
    log::warn!(target: "yang_ctx", "{err}");
    ERROR_LIST.with(|list| list.borrow_mut().push(err));
}

/// Returns and clears the calling thread's accumulated diagnostic trail.
pub fn drain() -> Vec<Error> {
    ERROR_LIST.with(|list| std::mem::take(&mut *list.borrow_mut()))
}

/// Returns a clone of the calling thread's accumulated diagnostic trail
/// without clearing it.
pub fn peek() -> Vec<Error> {
    ERROR_LIST.with(|list| list.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_local_list_is_independent_per_thread() {
        push(Error::invalid("main thread error"));
        assert_eq!(peek().len(), 1);

        let handle = std::thread::spawn(|| {
            assert!(peek().is_empty());
            push(Error::internal("other thread error"));
            drain().len()
        });
        assert_eq!(handle.join().unwrap(), 1);

        // The main thread's list is untouched by the other thread.
        assert_eq!(drain().len(), 1);
        assert!(drain().is_empty());
    }
}
