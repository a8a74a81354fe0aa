//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema node hashing.
//!
//! Rather than writing a node's full `module:name` path on the wire, LYB
//! writes a cheap 7-bit digest of it. Collisions are disambiguated by the
//! collision ID, encoded unary-zero in the high bits of the first hash
//! byte itself: collision 0 is `1xxxxxxx`, collision 1 is `01xxxxxx`, and
//! so on, so a reader can tell from that one byte how many follow-on hash
//! bytes belong to this node — it counts the leading zero bits to get the
//! collision level `k`, then consumes `k` more bytes, the first of which
//! carries the digest when `k > 0`.

use crate::error::{Error, Result};

/// A cheap order-independent 7-bit digest of `module:name`.
pub fn schema_hash(module: &str, name: &str) -> u8 {
    let mut h: u32 = 0x811c9dc5; // FNV-1a offset basis
    for byte in module.bytes().chain(std::iter::once(b':')).chain(name.bytes()) {
        h ^= byte as u32;
        h = h.wrapping_mul(0x01000193);
    }
    // Fold down to 7 bits so the high bit stays free for collision framing.
    ((h ^ (h >> 16)) & 0x7f) as u8
}

/// Encodes `digest` (expected to already be a 7-bit value) with
/// `collision_id` unary-zero-framed in the first byte's high bits: `k`
/// leading zero bits, a terminating `1` bit, then `7 - k` bits of `digest`
/// in the remainder, followed by `k` more bytes carrying the rest of the
/// digest (only the first of which is used, the rest pad with zero).
pub fn encode(digest: u8, collision_id: u8) -> Vec<u8> {
    let digest = digest & 0x7f;
    let k = collision_id;
    if k == 0 {
        return vec![0x80 | digest];
    }
    // k leading zero bits followed by a terminating 1 bit; valid for k <= 7.
    let first = if k < 8 { 0x80u16 >> k } else { 0 } as u8;
    let mut out = Vec::with_capacity(k as usize + 1);
    out.push(first);
    out.push(digest);
    out.extend(std::iter::repeat(0u8).take(k as usize - 1));
    out
}

/// Reads one encoded hash starting at `*pos`, returning `(digest,
/// collision_id)` and advancing `*pos` past it.
pub fn decode(data: &[u8], pos: &mut usize) -> Result<(u8, u8)> {
    let first = *data
        .get(*pos)
        .ok_or_else(|| Error::invalid("truncated LYB schema hash"))?;
    *pos += 1;
    let k = first.leading_zeros() as u8;
    if k == 0 {
        return Ok((first & 0x7f, 0));
    }
    if k > 7 {
        return Err(Error::invalid("LYB schema hash collision run too long"));
    }
    let rest = data
        .get(*pos..*pos + k as usize)
        .ok_or_else(|| Error::invalid("truncated LYB schema hash"))?;
    *pos += k as usize;
    Ok((rest[0] & 0x7f, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_hash_is_deterministic_and_module_sensitive() {
        let a = schema_hash("ietf-interfaces", "interfaces");
        let b = schema_hash("ietf-interfaces", "interfaces");
        let c = schema_hash("ietf-ip", "interfaces");
        assert_eq!(a, b);
        assert!(a <= 0x7f);
        assert!(c <= 0x7f);
    }

    #[test]
    fn collision_round_trip_at_several_depths() {
        for collision_id in [0u8, 1, 3, 6] {
            let encoded = encode(0x2a, collision_id);
            let mut pos = 0;
            let (digest, decoded_collision) = decode(&encoded, &mut pos).unwrap();
            assert_eq!(digest, 0x2a);
            assert_eq!(decoded_collision, collision_id);
            assert_eq!(pos, encoded.len());
        }
    }

    #[test]
    fn collision_zero_matches_the_spec_unary_pattern() {
        // collision 0 -> `1xxxxxxx`: top bit set, low 7 bits the digest.
        let encoded = encode(0x2a, 0);
        assert_eq!(encoded, vec![0x80 | 0x2a]);
    }

    #[test]
    fn collision_one_matches_the_spec_unary_pattern() {
        // collision 1 -> `01xxxxxx`: one leading zero bit, then the
        // terminator, then a follow-on byte carrying the digest.
        let encoded = encode(0x2a, 1);
        assert_eq!(encoded[0] & 0xc0, 0x40);
        assert_eq!(encoded.len(), 2);
    }

    #[test]
    fn truncated_collision_run_is_an_error() {
        // First byte claims a collision level of 3 (3 leading zero bits)
        // but no follow-on bytes are present.
        let data = vec![0x10];
        let mut pos = 0;
        assert!(decode(&data, &mut pos).is_err());
    }
}
