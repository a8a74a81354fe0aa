//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Chunked outer framing.
//!
//! A logical block of bytes (a subtree's encoded content) is split into
//! physical chunks of at most [`SIZE_MAX`] bytes each. Every chunk is
//! preceded by a 2-byte header `[size, inner_chunk_count]`: `size` is the
//! number of payload bytes that follow (`0..=SIZE_MAX`), and
//! `inner_chunk_count` is how many full `SIZE_MAX`-sized chunks have
//! already been emitted for the current logical block. A chunk whose `size`
//! is less than `SIZE_MAX` ends the block; `inner_chunk_count` lets a
//! reader sanity-check it consumed the expected number of full chunks
//! before that terminator.

use crate::error::{Error, Result};

/// The largest payload a single physical chunk may carry.
pub const SIZE_MAX: u8 = 255;

/// Writes `payload` as a chunked logical block into `out`.
pub fn write_block(out: &mut Vec<u8>, payload: &[u8]) {
    let mut inner_chunk_count: u8 = 0;
    let mut offset = 0usize;
    loop {
        let remaining = payload.len() - offset;
        let take = remaining.min(SIZE_MAX as usize);
        out.push(take as u8);
        out.push(inner_chunk_count);
        out.extend_from_slice(&payload[offset..offset + take]);
        offset += take;
        if take == SIZE_MAX as usize {
            inner_chunk_count = inner_chunk_count.wrapping_add(1);
            // A payload that is an exact multiple of SIZE_MAX still needs a
            // terminating zero-size chunk so the reader knows where to stop.
            if offset == payload.len() {
                out.push(0);
                out.push(inner_chunk_count);
                break;
            }
        } else {
            break;
        }
    }
}

/// Reads one chunked logical block starting at `*pos` in `data`, advancing
/// `*pos` past it.
pub fn read_block(data: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    let mut expected_inner_count: u8 = 0;
    loop {
        if *pos + 2 > data.len() {
            return Err(Error::invalid("truncated LYB chunk header"));
        }
        let size = data[*pos];
        let inner_chunk_count = data[*pos + 1];
        *pos += 2;

        if inner_chunk_count != expected_inner_count {
            return Err(Error::invalid(format!(
                "LYB chunk framing mismatch: expected inner_chunk_count {expected_inner_count}, got {inner_chunk_count}"
            )));
        }

        let size = size as usize;
        if *pos + size > data.len() {
            return Err(Error::invalid("truncated LYB chunk payload"));
        }
        payload.extend_from_slice(&data[*pos..*pos + size]);
        *pos += size;

        if size == SIZE_MAX as usize {
            expected_inner_count = expected_inner_count.wrapping_add(1);
        } else {
            break;
        }
    }
    Ok(payload)
}
