//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! A pure-Rust YANG context: a module registry, its cross-reference index,
//! and a codec for the compact LYB binary data-tree wire format.
//!
//! The central type is [`context::Context`]: it owns every loaded
//! [`schema::Module`] and [`schema::SchemaNode`] in arenas keyed by
//! [`schema::ModuleKey`]/[`schema::NodeKey`], tracks cross-module
//! references (identity bases, feature dependencies, leafref targets)
//! through [`xref::XrefIndex`], and resolves modules not yet loaded through
//! a pluggable [`context::SchemaSource`].
//!
//! Instance data lives in [`data::DataTree`], built up through
//! [`data::DataTree::new_inner`]/[`data::DataTree::new_term`]/
//! [`data::DataTree::new_any`] and serialized through
//! [`data::DataTree::to_lyb`]/[`data::DataTree::from_lyb`].
//!
//! Parsing YANG/YIN source text and evaluating XPath expressions are
//! outside this crate's scope; [`context::SchemaSource`] is the seam where
//! a textual parser would plug in.

mod builtins;
mod xref;

pub mod context;
pub mod data;
pub mod error;
pub mod iter;
pub mod logging;
pub mod lyb;
pub mod schema;
pub mod utils;
pub mod value;

pub use crate::error::{Error, Result};
