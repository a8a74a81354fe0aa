//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The LYB compact binary codec for YANG data trees.
//!
//! Organized the way the wire format itself is layered: [`framing`] handles
//! the chunked outer envelope every other layer is written inside of,
//! [`hash`] computes the 8-bit schema digest used instead of writing full
//! schema node names on the wire, [`value`] encodes/decodes typed leaf
//! values, and [`codec`] ties them together into the full tree codec.

pub mod codec;
pub mod framing;
pub mod hash;
pub mod value;
